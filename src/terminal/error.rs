//! # Terminal API errors
//!
//! Typed error for every Terminal API call, carrying the HTTP status and the
//! machine-readable error code when the service provides one. Classification
//! into permanent/transient happens in the reconciler's error taxonomy; this
//! type only preserves the facts needed to classify.

use thiserror::Error;

/// Error returned by a Terminal API operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success HTTP status.
    #[error("terminal api returned {status}: {message}")]
    Status {
        status: u16,
        /// Machine-readable error code from the response body, e.g.
        /// `already_exists`.
        code: Option<String>,
        message: String,
    },
    /// A success response that does not match the documented schema. Retrying
    /// will not change the service's contract, so this is classified as
    /// permanent.
    #[error("terminal api response did not match schema: {0}")]
    Decode(String),
    /// The request never produced an HTTP response (DNS, TLS, connection).
    #[error("terminal api transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status code, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Decode(_) => None,
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// Machine-readable error code from the response body, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Request was rejected by the service (4xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The `already_exists` special case used by card registration.
    pub fn is_already_exists(&self) -> bool {
        self.code() == Some("already_exists")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, code: Option<&str>) -> ApiError {
        ApiError::Status {
            status,
            code: code.map(str::to_string),
            message: "test".to_string(),
        }
    }

    #[test]
    fn four_hundreds_are_client_errors() {
        assert!(status_error(400, None).is_client_error());
        assert!(status_error(422, None).is_client_error());
        assert!(!status_error(500, None).is_client_error());
        assert!(!status_error(503, None).is_client_error());
    }

    #[test]
    fn not_found_is_404_only() {
        assert!(status_error(404, None).is_not_found());
        assert!(!status_error(400, None).is_not_found());
    }

    #[test]
    fn already_exists_requires_the_code() {
        assert!(status_error(400, Some("already_exists")).is_already_exists());
        assert!(!status_error(400, Some("validation")).is_already_exists());
        assert!(!status_error(400, None).is_already_exists());
    }

    #[test]
    fn decode_errors_carry_no_status() {
        assert_eq!(ApiError::Decode("bad".to_string()).status(), None);
        assert!(!ApiError::Decode("bad".to_string()).is_client_error());
    }
}
