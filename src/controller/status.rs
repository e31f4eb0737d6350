//! # Status patching
//!
//! Every status mutation the engine makes goes through a single merge patch
//! so subsequent reads observe the whole transition atomically; there is no
//! partial-field visibility.

use kube::api::{Patch, PatchParams};
use kube::Api;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Field manager recorded on status patches.
pub const MANAGER: &str = "terminal-operator";

/// Apply a full status object as one merge patch.
pub async fn patch_status<K, S>(api: &Api<K>, name: &str, status: &S) -> Result<(), kube::Error>
where
    K: Clone + DeserializeOwned + Debug,
    S: Serialize,
{
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(MANAGER), &Patch::Merge(patch))
        .await?;
    Ok(())
}

/// True when the recorded observed generation matches the current spec
/// generation. A resource that has never been reconciled (no observed
/// generation) is never up to date.
pub fn up_to_date(observed: Option<i64>, generation: Option<i64>) -> bool {
    observed.is_some() && observed == generation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobserved_resources_are_never_up_to_date() {
        assert!(!up_to_date(None, Some(1)));
        assert!(!up_to_date(None, None));
    }

    #[test]
    fn matching_generations_are_up_to_date() {
        assert!(up_to_date(Some(3), Some(3)));
    }

    #[test]
    fn stale_observations_are_not_up_to_date() {
        assert!(!up_to_date(Some(2), Some(3)));
    }
}
