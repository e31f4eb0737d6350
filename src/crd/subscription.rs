//! # Subscription resource
//!
//! A recurring product subscription on the Terminal API. Like an Order it
//! depends on a Verified Address and a Registered Card; unlike an Order it
//! can be cancelled, so deleting the resource cancels the subscription.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

/// Desired subscription.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Subscription",
    namespaced,
    status = "SubscriptionStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"SubscriptionId", "type":"string", "jsonPath":".status.subscriptionId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Product variant to subscribe to.
    pub product_variant_id: String,
    /// Number of units per delivery.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Delivery cadence. Defaults to the product's fixed schedule.
    #[serde(default)]
    pub schedule: Option<SubscriptionSchedule>,
    /// Shipping address; must be Verified before the subscription starts.
    pub address_ref: Reference,
    /// Payment card; must be Registered before the subscription starts.
    pub card_ref: Reference,
}

fn default_quantity() -> i64 {
    1
}

/// Delivery cadence for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SubscriptionSchedule {
    /// Deliver on the product's fixed schedule.
    Fixed,
    /// Deliver every `interval` weeks.
    Weekly { interval: u32 },
}

/// Provisioning state of a Subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum SubscriptionPhase {
    Pending,
    Active,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub phase: Option<SubscriptionPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Per-dependency readiness, keyed by dependency name (`address`, `card`).
    #[serde(default)]
    pub ready_flags: BTreeMap<String, bool>,
    /// Identifier assigned by the Terminal API once the subscription starts.
    #[serde(default)]
    pub subscription_id: Option<String>,
}
