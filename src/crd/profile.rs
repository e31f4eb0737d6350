//! # Profile resource
//!
//! Mirrors the account profile on the Terminal API. Syncing a Profile issues
//! a profile update; there is no external identifier to track, only the
//! synced/failed state and the time of the last successful sync.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired account profile.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Profile",
    namespaced,
    status = "ProfileStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSpec {
    /// Display name pushed to the account profile.
    pub name: String,
    /// Contact email pushed to the account profile.
    pub email: String,
}

/// Provisioning state of a Profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ProfilePhase {
    Pending,
    Synced,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    #[serde(default)]
    pub phase: Option<ProfilePhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// RFC3339 timestamp of the last successful profile sync.
    #[serde(default)]
    pub last_sync_time: Option<String>,
}
