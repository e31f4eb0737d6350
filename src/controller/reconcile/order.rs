//! Order reconciler: the fully dependent kind. An order is only placed once
//! its Address is Verified, its Card is Registered, and (when referenced)
//! its Profile is Synced; after placement the drift poller follows the
//! external record. Orders cannot be cancelled through the service, so the
//! finalizer's cleanup only records that the placed order remains.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{require_non_empty, require_positive, FINALIZER};
use crate::controller::context::Context;
use crate::controller::deps::{gate_ready, gate_with_id, ReferenceResolver};
use crate::controller::drift;
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Order, OrderPhase, OrderSpec, OrderStatus};
use crate::metrics;

pub fn validate(spec: &OrderSpec) -> Result<(), ReconcileError> {
    require_non_empty("productVariantId", &spec.product_variant_id)?;
    require_positive("quantity", spec.quantity)?;
    require_non_empty("addressRef.name", &spec.address_ref.name)?;
    require_non_empty("cardRef.name", &spec.card_ref.name)?;
    if spec.address_ref.kind_mismatch("Address") {
        return Err(ReconcileError::Validation(
            "spec.addressRef must reference an Address".to_string(),
        ));
    }
    if spec.card_ref.kind_mismatch("Card") {
        return Err(ReconcileError::Validation(
            "spec.cardRef must reference a Card".to_string(),
        ));
    }
    if let Some(profile_ref) = &spec.profile_ref {
        require_non_empty("profileRef.name", &profile_ref.name)?;
        if profile_ref.kind_mismatch("Profile") {
            return Err(ReconcileError::Validation(
                "spec.profileRef must reference a Profile".to_string(),
            ));
        }
    }
    Ok(())
}

/// Identifiers extracted from ready prerequisites.
#[derive(Debug, Clone)]
pub struct OrderInputs {
    pub address_id: String,
    pub card_id: String,
}

/// Resolve every prerequisite, recording per-dependency readiness as it is
/// learned. Fails with the first gate that does not hold; already-checked
/// flags stay recorded so the status shows partial readiness.
pub async fn resolve_inputs(
    resolver: &dyn ReferenceResolver,
    namespace: &str,
    spec: &OrderSpec,
    flags: &mut BTreeMap<String, bool>,
) -> Result<OrderInputs, ReconcileError> {
    let address_ns = spec.address_ref.namespace_or(namespace);
    let snapshot = resolver.address(address_ns, &spec.address_ref.name).await?;
    let address_id = gate_with_id(
        "address",
        "Address",
        address_ns,
        &spec.address_ref.name,
        snapshot,
        flags,
    )?;

    let card_ns = spec.card_ref.namespace_or(namespace);
    let snapshot = resolver.card(card_ns, &spec.card_ref.name).await?;
    let card_id = gate_with_id("card", "Card", card_ns, &spec.card_ref.name, snapshot, flags)?;

    if let Some(profile_ref) = &spec.profile_ref {
        let profile_ns = profile_ref.namespace_or(namespace);
        let snapshot = resolver.profile(profile_ns, &profile_ref.name).await?;
        gate_ready(
            "profile",
            "Profile",
            profile_ns,
            &profile_ref.name,
            snapshot,
            flags,
        )?;
    }

    Ok(OrderInputs {
        address_id,
        card_id,
    })
}

pub async fn reconcile(order: Arc<Order>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = order.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<Order> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, order, |event| async move {
        match event {
            FinalizerEvent::Apply(order) => apply(order, ctx).await,
            FinalizerEvent::Cleanup(order) => cleanup(order, ctx).await,
        }
    })
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)))
}

async fn apply(order: Arc<Order>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = order.name_any();
    let namespace = order.namespace().unwrap_or_else(|| "default".to_string());
    let generation = order.metadata.generation;

    metrics::increment_reconciliations("Order");
    info!("Reconciling Order {}/{}", namespace, name);

    let api: Api<Order> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = order.status.clone().unwrap_or_default();

    // Idempotency gate: once this generation has been placed, reconciles
    // only feed the drift poller; no second order is created.
    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(phase) if phase.pollable() => {
                return drift::poll_order(
                    &api,
                    &order,
                    ctx.terminal.as_ref(),
                    ctx.order_poll_interval,
                )
                .await;
            }
            Some(OrderPhase::Delivered | OrderPhase::Cancelled | OrderPhase::Failed) => {
                debug!("Order {}/{} is settled", namespace, name);
                return Ok(Action::await_change());
            }
            _ => {}
        }
    }

    if let Err(e) = validate(&order.spec) {
        let failed = OrderStatus {
            phase: Some(OrderPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            ready_flags: status.ready_flags,
            order_id: status.order_id,
            last_checked_time: status.last_checked_time,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    // Pre-write: the order is Processing for this generation before any
    // external traffic happens.
    let mut next = OrderStatus {
        phase: Some(OrderPhase::Processing),
        observed_generation: generation,
        message: Some("resolving order prerequisites".to_string()),
        ready_flags: status.ready_flags,
        order_id: status.order_id,
        last_checked_time: status.last_checked_time,
    };
    patch_status(&api, &name, &next).await?;

    let inputs = match resolve_inputs(
        ctx.resolver.as_ref(),
        &namespace,
        &order.spec,
        &mut next.ready_flags,
    )
    .await
    {
        Ok(inputs) => inputs,
        Err(err) => {
            // Unready prerequisites leave the order Processing; the retry is
            // scheduled by the error policy at the classified delay.
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            return Err(err);
        }
    };

    match ctx
        .terminal
        .create_order(&inputs.address_id, &inputs.card_id, &order.spec.variants())
        .await
    {
        Ok(order_id) => {
            next.phase = Some(OrderPhase::Ordered);
            next.message = Some(format!("order {order_id} placed"));
            next.order_id = Some(order_id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Order", start.elapsed().as_secs_f64());
            info!("Order {}/{} placed", namespace, name);
            Ok(Action::requeue(ctx.order_poll_interval))
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(OrderPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}

/// Orders have no cancel operation; the external effect outlives the
/// resource and the cleanup only says so.
async fn cleanup(order: Arc<Order>, _ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let name = order.name_any();
    match order.status.as_ref().and_then(|s| s.order_id.clone()) {
        Some(order_id) => info!(
            "Order {} removed; placed order {} cannot be cancelled through the service and remains",
            name, order_id
        ),
        None => debug!("Order {} removed before an order was placed", name),
    }
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::Reference;

    fn reference(name: &str) -> Reference {
        Reference {
            kind: None,
            name: name.to_string(),
            namespace: None,
        }
    }

    fn spec() -> OrderSpec {
        OrderSpec {
            product_variant_id: "var_01JNH7GTF9FBA62Y0RT0WMK3BT".to_string(),
            quantity: 1,
            address_ref: reference("home"),
            card_ref: reference("visa"),
            profile_ref: None,
        }
    }

    #[test]
    fn complete_order_passes() {
        assert!(validate(&spec()).is_ok());
    }

    #[test]
    fn missing_variant_is_permanent() {
        let mut s = spec();
        s.product_variant_id = String::new();
        let err = validate(&s).unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut s = spec();
        s.quantity = 0;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn mistyped_reference_kind_is_rejected() {
        let mut s = spec();
        s.card_ref.kind = Some("Address".to_string());
        assert!(validate(&s).unwrap_err().is_permanent());
    }
}
