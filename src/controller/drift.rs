//! # Drift polling
//!
//! Orders are the one kind whose external state keeps evolving after the
//! provisioning action: the service ships them out of band. For orders in
//! an externally observable, non-settled phase the controller re-reads the
//! external record on a fixed interval and advances the phase on positive
//! evidence only.
//!
//! The service exposes exactly one such signal: a shipment tracking number.
//! Its presence implies Shipped; its absence implies nothing, so the phase
//! is left untouched rather than regressed. Delivered and Cancelled have no
//! observable signal on this API and are never inferred; this is a known
//! coverage gap, not something the poller papers over.

use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::{info, warn};

use super::error::ReconcileError;
use super::status::patch_status;
use crate::crd::{Order, OrderPhase};
use crate::metrics;
use crate::terminal::{OrderInfo, TerminalApi};

/// Infer the next phase from a freshly read external order, never moving
/// backward. Tracking presence is the only evidence considered.
pub fn advance_phase(current: OrderPhase, external: &OrderInfo) -> OrderPhase {
    let observed = if external.has_tracking() {
        OrderPhase::Shipped
    } else {
        OrderPhase::Ordered
    };
    if observed.rank() > current.rank() {
        observed
    } else {
        current
    }
}

/// Re-read the external order backing `order` and fold any progress into
/// its status. Every poll stamps `lastCheckedTime`, phase change or not.
pub async fn poll_order(
    api: &Api<Order>,
    order: &Order,
    terminal: &dyn TerminalApi,
    interval: Duration,
) -> Result<Action, ReconcileError> {
    let name = order.name_any();
    let status = order.status.clone().unwrap_or_default();
    let current = status.phase.unwrap_or(OrderPhase::Ordered);

    let Some(order_id) = status.order_id.clone() else {
        return Err(ReconcileError::ContractViolation(format!(
            "order {name} is {current:?} but carries no orderId"
        )));
    };

    metrics::increment_drift_polls();

    match terminal.get_order(&order_id).await {
        Ok(external) => {
            let next = advance_phase(current, &external);
            let mut patched = status;
            patched.last_checked_time = Some(chrono::Utc::now().to_rfc3339());
            if next != current {
                info!("Order {} advanced {:?} -> {:?}", name, current, next);
                patched.phase = Some(next);
                patched.message = Some(match next {
                    OrderPhase::Shipped => {
                        let number = external
                            .tracking
                            .as_ref()
                            .and_then(|t| t.number.clone())
                            .unwrap_or_default();
                        format!("order {order_id} shipped (tracking {number})")
                    }
                    other => format!("order {order_id} is {other:?}"),
                });
            }
            patch_status(api, &name, &patched).await?;

            if next.pollable() {
                Ok(Action::requeue(interval))
            } else {
                Ok(Action::await_change())
            }
        }
        Err(e) if e.is_not_found() => {
            // The backing record vanished; nothing to keep polling for.
            warn!("Order {} ({}) no longer exists on the service", name, order_id);
            let mut patched = status;
            patched.phase = Some(OrderPhase::Failed);
            patched.message = Some(format!("order {order_id} no longer exists on the service"));
            patched.last_checked_time = Some(chrono::Utc::now().to_rfc3339());
            patch_status(api, &name, &patched).await?;
            Err(ReconcileError::External(e))
        }
        Err(e) => Err(ReconcileError::External(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::OrderTracking;

    fn external(tracking_number: Option<&str>) -> OrderInfo {
        OrderInfo {
            id: "ord_1".to_string(),
            tracking: tracking_number.map(|n| OrderTracking {
                service: Some("usps".to_string()),
                number: Some(n.to_string()),
                url: None,
            }),
        }
    }

    #[test]
    fn tracking_presence_advances_to_shipped() {
        assert_eq!(
            advance_phase(OrderPhase::Ordered, &external(Some("9400"))),
            OrderPhase::Shipped
        );
    }

    #[test]
    fn absence_of_evidence_leaves_phase_unchanged() {
        assert_eq!(
            advance_phase(OrderPhase::Ordered, &external(None)),
            OrderPhase::Ordered
        );
    }

    #[test]
    fn shipped_never_regresses_to_ordered() {
        // A later poll without tracking info must not move the phase back.
        assert_eq!(
            advance_phase(OrderPhase::Shipped, &external(None)),
            OrderPhase::Shipped
        );
    }

    #[test]
    fn settled_orders_are_never_moved() {
        assert_eq!(
            advance_phase(OrderPhase::Delivered, &external(Some("9400"))),
            OrderPhase::Delivered
        );
        assert_eq!(
            advance_phase(OrderPhase::Cancelled, &external(Some("9400"))),
            OrderPhase::Cancelled
        );
    }
}
