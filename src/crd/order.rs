//! # Order resource
//!
//! A one-shot product order. Placing the order requires a Verified Address,
//! a Registered Card, and (when referenced) a Synced Profile. After the
//! order is placed the drift poller watches the external record and advances
//! the phase when shipment tracking appears. Orders cannot be cancelled
//! through the Terminal API; deleting the resource leaves the order in place.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

/// Desired product order.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Order",
    namespaced,
    status = "OrderStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"OrderId", "type":"string", "jsonPath":".status.orderId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    /// Product variant to order.
    pub product_variant_id: String,
    /// Number of units.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Shipping address; must be Verified before the order is placed.
    pub address_ref: Reference,
    /// Payment card; must be Registered before the order is placed.
    pub card_ref: Reference,
    /// Optional profile that must be Synced before the order is placed.
    #[serde(default)]
    pub profile_ref: Option<Reference>,
}

fn default_quantity() -> i64 {
    1
}

impl OrderSpec {
    /// Variant map in the shape the order-create call expects.
    pub fn variants(&self) -> BTreeMap<String, i64> {
        BTreeMap::from([(self.product_variant_id.clone(), self.quantity)])
    }
}

/// Provisioning state of an Order.
///
/// `Delivered` and `Cancelled` exist in the vocabulary but are never set by
/// the drift poller: the only positive evidence the Terminal API exposes is
/// shipment tracking, so `Shipped` is the last phase polling can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum OrderPhase {
    Processing,
    Ordered,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderPhase {
    /// Position in the happy-path ordering. Terminal phases rank above every
    /// observable phase so drift inference can never move a settled order.
    pub fn rank(self) -> u8 {
        match self {
            OrderPhase::Processing => 0,
            OrderPhase::Ordered => 1,
            OrderPhase::Shipped => 2,
            OrderPhase::Delivered => 3,
            OrderPhase::Cancelled | OrderPhase::Failed => u8::MAX,
        }
    }

    /// Phases the drift poller keeps re-reading external state for.
    pub fn pollable(self) -> bool {
        matches!(self, OrderPhase::Ordered | OrderPhase::Shipped)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatus {
    #[serde(default)]
    pub phase: Option<OrderPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Per-dependency readiness, keyed by dependency name
    /// (`address`, `card`, `profile`).
    #[serde(default)]
    pub ready_flags: BTreeMap<String, bool>,
    /// Identifier assigned by the Terminal API once the order is placed.
    #[serde(default)]
    pub order_id: Option<String>,
    /// RFC3339 timestamp of the drift poller's last external read.
    #[serde(default)]
    pub last_checked_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_phases_are_ordered() {
        assert!(OrderPhase::Processing.rank() < OrderPhase::Ordered.rank());
        assert!(OrderPhase::Ordered.rank() < OrderPhase::Shipped.rank());
        assert!(OrderPhase::Shipped.rank() < OrderPhase::Delivered.rank());
    }

    #[test]
    fn settled_phases_outrank_observable_ones() {
        assert!(OrderPhase::Failed.rank() > OrderPhase::Delivered.rank());
        assert!(OrderPhase::Cancelled.rank() > OrderPhase::Shipped.rank());
    }

    #[test]
    fn only_ordered_and_shipped_are_pollable() {
        assert!(OrderPhase::Ordered.pollable());
        assert!(OrderPhase::Shipped.pollable());
        assert!(!OrderPhase::Processing.pollable());
        assert!(!OrderPhase::Delivered.pollable());
        assert!(!OrderPhase::Failed.pollable());
    }

    #[test]
    fn variants_map_carries_quantity() {
        let spec = OrderSpec {
            product_variant_id: "var_123".to_string(),
            quantity: 3,
            address_ref: Reference {
                kind: None,
                name: "home".to_string(),
                namespace: None,
            },
            card_ref: Reference {
                kind: None,
                name: "visa".to_string(),
                namespace: None,
            },
            profile_ref: None,
        };
        assert_eq!(spec.variants().get("var_123"), Some(&3));
    }
}
