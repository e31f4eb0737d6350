//! # Cart resource
//!
//! A cart assembled step by step on the Terminal API and converted into an
//! order. The phase records how far assembly has progressed so a reconcile
//! interrupted mid-flight resumes at the next step instead of starting over.
//! Item placement uses the API's set-quantity semantics, so replaying a step
//! is safe.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

/// Desired cart contents and checkout inputs.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Cart",
    namespaced,
    status = "CartStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"OrderId", "type":"string", "jsonPath":".status.orderId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CartSpec {
    /// Items to place in the cart before conversion.
    pub items: Vec<CartItem>,
    /// Shipping address; must be Verified before assembly starts.
    pub address_ref: Reference,
    /// Payment card; must be Registered before assembly starts.
    pub card_ref: Reference,
}

/// A single cart line item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product variant to add.
    pub product_variant_id: String,
    /// Quantity to set for the variant.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Assembly state of a Cart. Phases follow the checkout sequence; `Converted`
/// is success-terminal, `Failed` is failure-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum CartPhase {
    Empty,
    ItemsAdded,
    AddressSet,
    CardSet,
    Converting,
    Converted,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartStatus {
    #[serde(default)]
    pub phase: Option<CartPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Per-dependency readiness, keyed by dependency name (`address`, `card`).
    #[serde(default)]
    pub ready_flags: BTreeMap<String, bool>,
    /// Identifier of the order produced by cart conversion.
    #[serde(default)]
    pub order_id: Option<String>,
}
