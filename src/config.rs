//! # Runtime configuration
//!
//! Environment-driven configuration for the operator process. A `.env` file
//! is honored for local development; in-cluster the same variables come from
//! the Deployment env/secret wiring.

use anyhow::{Context, Result};
use std::time::Duration;

/// Default interval for the order drift poller.
const DEFAULT_ORDER_POLL_INTERVAL_SECS: u64 = 60;

/// Which Terminal API environment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEnvironment {
    Dev,
    Production,
}

impl TerminalEnvironment {
    /// Parse the `TERMINAL_ENVIRONMENT` value.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow::anyhow!(
                "unsupported TERMINAL_ENVIRONMENT '{other}' (expected 'dev' or 'production')"
            )),
        }
    }

    /// API base URL for the environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Dev => "https://api.dev.terminal.shop",
            Self::Production => "https://api.terminal.shop",
        }
    }
}

/// Process-wide configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bearer token for the Terminal API.
    pub bearer_token: String,
    /// Target Terminal environment.
    pub environment: TerminalEnvironment,
    /// Port for the metrics/probe HTTP server.
    pub metrics_port: u16,
    /// Fixed interval at which non-terminal orders are re-read from the
    /// service.
    pub order_poll_interval: Duration,
}

impl RuntimeConfig {
    /// Load configuration, reading a `.env` file first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bearer_token = std::env::var("TERMINAL_BEARER_TOKEN")
            .context("TERMINAL_BEARER_TOKEN is required to reach the Terminal API")?;

        let environment = std::env::var("TERMINAL_ENVIRONMENT")
            .map(|v| TerminalEnvironment::parse(&v))
            .unwrap_or(Ok(TerminalEnvironment::Dev))?;

        let metrics_port = std::env::var("METRICS_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("METRICS_PORT must be a port number")?;

        let order_poll_interval = std::env::var("ORDER_POLL_INTERVAL_SECONDS")
            .map(|v| v.parse::<u64>())
            .unwrap_or(Ok(DEFAULT_ORDER_POLL_INTERVAL_SECS))
            .map(Duration::from_secs)
            .context("ORDER_POLL_INTERVAL_SECONDS must be a number of seconds")?;

        Ok(Self {
            bearer_token,
            environment,
            metrics_port,
            order_poll_interval,
        })
    }

    /// API base URL for the configured environment.
    pub fn base_url(&self) -> &'static str {
        self.environment.base_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_accepts_known_values() {
        assert_eq!(
            TerminalEnvironment::parse("dev").unwrap(),
            TerminalEnvironment::Dev
        );
        assert_eq!(
            TerminalEnvironment::parse("Production").unwrap(),
            TerminalEnvironment::Production
        );
        assert_eq!(
            TerminalEnvironment::parse(" prod ").unwrap(),
            TerminalEnvironment::Production
        );
        assert!(TerminalEnvironment::parse("staging").is_err());
    }

    #[test]
    fn base_urls_differ_per_environment() {
        assert_eq!(
            TerminalEnvironment::Dev.base_url(),
            "https://api.dev.terminal.shop"
        );
        assert_eq!(
            TerminalEnvironment::Production.base_url(),
            "https://api.terminal.shop"
        );
    }
}
