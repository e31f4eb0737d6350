//! # Card resource
//!
//! A payment card registered with the Terminal API from a tokenized card
//! (e.g. a Stripe token). The raw card number never appears in the spec.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired payment card.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Card",
    namespaced,
    status = "CardStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"CardId", "type":"string", "jsonPath":".status.cardId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CardSpec {
    /// Tokenized card obtained from the payment processor (e.g. `tok_visa`).
    pub token: String,
}

/// Provisioning state of a Card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CardPhase {
    Pending,
    Processing,
    Registered,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardStatus {
    #[serde(default)]
    pub phase: Option<CardPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier assigned by the Terminal API once the card is registered.
    #[serde(default)]
    pub card_id: Option<String>,
}
