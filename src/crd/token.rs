//! # Token resource
//!
//! A personal access token minted on the Terminal API. The token value is
//! returned exactly once by the service and is deliberately not persisted in
//! status; only the token identifier is tracked for lifecycle management.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired personal access token. Creation takes no parameters; the resource
/// exists to own the token's lifecycle.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Token",
    namespaced,
    status = "TokenStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"TokenId", "type":"string", "jsonPath":".status.tokenId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TokenSpec {
    /// Free-form note for operators; not sent to the API.
    #[serde(default)]
    pub description: Option<String>,
}

/// Provisioning state of a Token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum TokenPhase {
    Pending,
    Active,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    #[serde(default)]
    pub phase: Option<TokenPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier assigned by the Terminal API; the secret value is not stored.
    #[serde(default)]
    pub token_id: Option<String>,
}
