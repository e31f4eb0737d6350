//! Cart reconciler: assembles the account's cart step by step (items,
//! address, card) and converts it into an order. Each completed step lands
//! in status before the next begins, so an interrupted assembly resumes
//! where it stopped instead of replaying from the start. The converted
//! order cannot be cancelled, so no finalizer is attached.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{require_non_empty, require_positive};
use crate::controller::context::Context;
use crate::controller::deps::{gate_with_id, ReferenceResolver};
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Cart, CartPhase, CartSpec, CartStatus};
use crate::metrics;
use crate::terminal::TerminalApi;

pub fn validate(spec: &CartSpec) -> Result<(), ReconcileError> {
    if spec.items.is_empty() {
        return Err(ReconcileError::Validation(
            "spec.items must contain at least one item".to_string(),
        ));
    }
    for (index, item) in spec.items.iter().enumerate() {
        if item.product_variant_id.trim().is_empty() {
            return Err(ReconcileError::Validation(format!(
                "spec.items[{index}].productVariantId must not be empty"
            )));
        }
        require_positive("items.quantity", item.quantity)?;
    }
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
    Ok(())
}

/// Identifiers extracted from ready prerequisites.
#[derive(Debug, Clone)]
pub struct CartInputs {
    pub address_id: String,
    pub card_id: String,
}

pub async fn resolve_inputs(
    resolver: &dyn ReferenceResolver,
    namespace: &str,
    spec: &CartSpec,
    flags: &mut BTreeMap<String, bool>,
) -> Result<CartInputs, ReconcileError> {
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

    Ok(CartInputs {
        address_id,
        card_id,
    })
}

/// Walk the assembly steps from the current phase to Converted, patching
/// status after every completed step. Item placement uses set-quantity
/// semantics, so re-running the item step after a crash is idempotent.
pub async fn assemble(
    api: &Api<Cart>,
    name: &str,
    terminal: &dyn TerminalApi,
    spec: &CartSpec,
    inputs: &CartInputs,
    next: &mut CartStatus,
) -> Result<(), ReconcileError> {
    loop {
        let phase = next.phase.unwrap_or(CartPhase::Empty);
        let (advanced, message) = match phase {
            CartPhase::Empty => {
                for item in &spec.items {
                    terminal
                        .put_cart_item(&item.product_variant_id, item.quantity)
                        .await?;
                }
                (
                    CartPhase::ItemsAdded,
                    format!("{} item(s) staged in cart", spec.items.len()),
                )
            }
            CartPhase::ItemsAdded => {
                terminal.set_cart_address(&inputs.address_id).await?;
                (
                    CartPhase::AddressSet,
                    format!("cart shipping to address {}", inputs.address_id),
                )
            }
            CartPhase::AddressSet => {
                terminal.set_cart_card(&inputs.card_id).await?;
                (
                    CartPhase::CardSet,
                    format!("cart paying with card {}", inputs.card_id),
                )
            }
            CartPhase::CardSet => (CartPhase::Converting, "converting cart".to_string()),
            CartPhase::Converting => {
                let order_id = terminal.convert_cart().await?;
                let message = format!("cart converted into order {order_id}");
                next.order_id = Some(order_id);
                (CartPhase::Converted, message)
            }
            CartPhase::Converted | CartPhase::Failed => return Ok(()),
        };

        next.phase = Some(advanced);
        next.message = Some(message);
        patch_status(api, name, next).await?;
    }
}

pub async fn reconcile(cart: Arc<Cart>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = cart.name_any();
    let namespace = cart.namespace().unwrap_or_else(|| "default".to_string());
    let generation = cart.metadata.generation;

    metrics::increment_reconciliations("Cart");
    info!("Reconciling Cart {}/{}", namespace, name);

    let api: Api<Cart> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = cart.status.clone().unwrap_or_default();

    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(CartPhase::Converted) => {
                debug!(
                    "Cart {}/{} already converted into {:?}",
                    namespace, name, status.order_id
                );
                return Ok(Action::await_change());
            }
            Some(CartPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&cart.spec) {
        let failed = CartStatus {
            phase: Some(CartPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            ready_flags: status.ready_flags,
            order_id: status.order_id,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    // Pre-write: a new generation restarts assembly from Empty; the same
    // generation resumes from the phase already recorded.
    let mut next = if up_to_date(status.observed_generation, generation) {
        let mut resumed = status;
        resumed.phase = Some(resumed.phase.unwrap_or(CartPhase::Empty));
        resumed
    } else {
        CartStatus {
            phase: Some(CartPhase::Empty),
            observed_generation: generation,
            message: Some("starting cart assembly".to_string()),
            ready_flags: BTreeMap::new(),
            order_id: None,
        }
    };
    patch_status(&api, &name, &next).await?;

    let inputs = match resolve_inputs(
        ctx.resolver.as_ref(),
        &namespace,
        &cart.spec,
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

    match assemble(
        &api,
        &name,
        ctx.terminal.as_ref(),
        &cart.spec,
        &inputs,
        &mut next,
    )
    .await
    {
        Ok(()) => {
            metrics::observe_reconcile_duration("Cart", start.elapsed().as_secs_f64());
            info!("Cart {}/{} converted", namespace, name);
            Ok(Action::await_change())
        }
        Err(err) => {
            if err.severity() == Severity::Permanent {
                next.phase = Some(CartPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}
