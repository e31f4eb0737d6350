//! # App resource
//!
//! An OAuth application registered with the Terminal API.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired OAuth application.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "App",
    namespaced,
    status = "AppStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"AppId", "type":"string", "jsonPath":".status.appId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Application display name.
    pub name: String,
    /// OAuth redirect URI.
    pub redirect_uri: String,
}

/// Provisioning state of an App.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AppPhase {
    Pending,
    Active,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    #[serde(default)]
    pub phase: Option<AppPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier assigned by the Terminal API once the app is registered.
    #[serde(default)]
    pub app_id: Option<String>,
}
