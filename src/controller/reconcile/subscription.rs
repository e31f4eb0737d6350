//! Subscription reconciler: starts a recurring delivery once its Address
//! and Card prerequisites are ready. Subscriptions can be cancelled, so the
//! resource runs under a finalizer that issues the remote cancel.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{require_non_empty, require_positive, FINALIZER};
use crate::controller::context::Context;
use crate::controller::deps::{gate_with_id, ReferenceResolver};
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{
    Subscription, SubscriptionPhase, SubscriptionSchedule, SubscriptionSpec, SubscriptionStatus,
};
use crate::metrics;
use crate::terminal::{SchedulePayload, SubscriptionPayload};

pub fn validate(spec: &SubscriptionSpec) -> Result<(), ReconcileError> {
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
    if let Some(SubscriptionSchedule::Weekly { interval }) = spec.schedule {
        if interval == 0 {
            return Err(ReconcileError::Validation(
                "spec.schedule.interval must be at least 1 week".to_string(),
            ));
        }
    }
    Ok(())
}

/// Identifiers extracted from ready prerequisites.
#[derive(Debug, Clone)]
pub struct SubscriptionInputs {
    pub address_id: String,
    pub card_id: String,
}

pub async fn resolve_inputs(
    resolver: &dyn ReferenceResolver,
    namespace: &str,
    spec: &SubscriptionSpec,
    flags: &mut BTreeMap<String, bool>,
) -> Result<SubscriptionInputs, ReconcileError> {
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

    Ok(SubscriptionInputs {
        address_id,
        card_id,
    })
}

pub fn payload(spec: &SubscriptionSpec, inputs: &SubscriptionInputs) -> SubscriptionPayload {
    SubscriptionPayload {
        product_variant_id: spec.product_variant_id.clone(),
        quantity: spec.quantity,
        address_id: inputs.address_id.clone(),
        card_id: inputs.card_id.clone(),
        schedule: spec.schedule.map(|schedule| match schedule {
            SubscriptionSchedule::Fixed => SchedulePayload::Fixed,
            SubscriptionSchedule::Weekly { interval } => SchedulePayload::Weekly { interval },
        }),
    }
}

pub async fn reconcile(
    subscription: Arc<Subscription>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let namespace = subscription
        .namespace()
        .unwrap_or_else(|| "default".to_string());
    let api: Api<Subscription> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, subscription, |event| async move {
        match event {
            FinalizerEvent::Apply(subscription) => apply(subscription, ctx).await,
            FinalizerEvent::Cleanup(subscription) => cleanup(subscription, ctx).await,
        }
    })
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)))
}

async fn apply(
    subscription: Arc<Subscription>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = subscription.name_any();
    let namespace = subscription
        .namespace()
        .unwrap_or_else(|| "default".to_string());
    let generation = subscription.metadata.generation;

    metrics::increment_reconciliations("Subscription");
    info!("Reconciling Subscription {}/{}", namespace, name);

    let api: Api<Subscription> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = subscription.status.clone().unwrap_or_default();

    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(SubscriptionPhase::Active) => {
                debug!(
                    "Subscription {}/{} already active as {:?}",
                    namespace, name, status.subscription_id
                );
                return Ok(Action::await_change());
            }
            Some(SubscriptionPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&subscription.spec) {
        let failed = SubscriptionStatus {
            phase: Some(SubscriptionPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            ready_flags: status.ready_flags,
            subscription_id: status.subscription_id,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    let mut next = SubscriptionStatus {
        phase: Some(SubscriptionPhase::Pending),
        observed_generation: generation,
        message: Some("resolving subscription prerequisites".to_string()),
        ready_flags: status.ready_flags,
        subscription_id: status.subscription_id,
    };
    patch_status(&api, &name, &next).await?;

    let inputs = match resolve_inputs(
        ctx.resolver.as_ref(),
        &namespace,
        &subscription.spec,
        &mut next.ready_flags,
    )
    .await
    {
        Ok(inputs) => inputs,
        Err(err) => {
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            return Err(err);
        }
    };

    match ctx
        .terminal
        .create_subscription(&payload(&subscription.spec, &inputs))
        .await
    {
        Ok(subscription_id) => {
            next.phase = Some(SubscriptionPhase::Active);
            next.message = Some(format!("subscription {subscription_id} active"));
            next.subscription_id = Some(subscription_id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Subscription", start.elapsed().as_secs_f64());
            info!("Subscription {}/{} active", namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(SubscriptionPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}

/// Best-effort remote cancellation; never blocks resource removal.
pub async fn discard(terminal: &dyn crate::terminal::TerminalApi, subscription_id: Option<&str>) {
    let Some(subscription_id) = subscription_id else {
        debug!("subscription never started externally; nothing to clean up");
        return;
    };

    metrics::increment_external_cleanups("Subscription");
    match terminal.delete_subscription(subscription_id).await {
        Ok(()) => info!("Cancelled subscription {} on the service", subscription_id),
        Err(e) if e.is_not_found() => debug!(
            "Subscription {} already gone from the service",
            subscription_id
        ),
        Err(e) => warn!(
            "Failed to cancel subscription {} on the service: {} (resource removal proceeds)",
            subscription_id, e
        ),
    }
}

async fn cleanup(
    subscription: Arc<Subscription>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    discard(
        ctx.terminal.as_ref(),
        subscription
            .status
            .as_ref()
            .and_then(|s| s.subscription_id.as_deref()),
    )
    .await;
    Ok(Action::await_change())
}
