//! Card reconciler: registers a tokenized payment card, falling back to the
//! existing card when the service reports it is already on file. Cards can
//! be deleted remotely, so the resource runs under a finalizer.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{require_non_empty, FINALIZER};
use crate::controller::context::Context;
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Card, CardPhase, CardSpec, CardStatus};
use crate::metrics;
use crate::terminal::TerminalApi;

pub fn validate(spec: &CardSpec) -> Result<(), ReconcileError> {
    require_non_empty("token", &spec.token)
}

/// Register the tokenized card. An `already_exists` rejection is not a
/// failure: the card is on file, so list the registered cards and adopt the
/// existing one instead of retrying the create.
pub async fn register_card(
    terminal: &dyn TerminalApi,
    token: &str,
) -> Result<String, ReconcileError> {
    match terminal.create_card(token).await {
        Ok(card_id) => Ok(card_id),
        Err(e) if e.is_already_exists() => {
            debug!("card already registered on the service; adopting the existing card");
            let cards = terminal.list_cards().await.map_err(ReconcileError::External)?;
            cards
                .into_iter()
                .next()
                .map(|card| card.id)
                .ok_or_else(|| {
                    ReconcileError::ContractViolation(
                        "card reported already_exists but the card list is empty".to_string(),
                    )
                })
        }
        Err(e) => Err(ReconcileError::External(e)),
    }
}

pub async fn reconcile(card: Arc<Card>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = card.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<Card> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, card, |event| async move {
        match event {
            FinalizerEvent::Apply(card) => apply(card, ctx).await,
            FinalizerEvent::Cleanup(card) => cleanup(card, ctx).await,
        }
    })
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)))
}

async fn apply(card: Arc<Card>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = card.name_any();
    let namespace = card.namespace().unwrap_or_else(|| "default".to_string());
    let generation = card.metadata.generation;

    metrics::increment_reconciliations("Card");
    info!("Reconciling Card {}/{}", namespace, name);

    let api: Api<Card> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = card.status.clone().unwrap_or_default();

    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(CardPhase::Registered) => {
                debug!(
                    "Card {}/{} already registered as {:?}",
                    namespace, name, status.card_id
                );
                return Ok(Action::await_change());
            }
            Some(CardPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&card.spec) {
        let failed = CardStatus {
            phase: Some(CardPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            card_id: status.card_id,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    let mut next = CardStatus {
        phase: Some(CardPhase::Processing),
        observed_generation: generation,
        message: Some("registering card".to_string()),
        card_id: status.card_id,
    };
    patch_status(&api, &name, &next).await?;

    match register_card(ctx.terminal.as_ref(), &card.spec.token).await {
        Ok(card_id) => {
            next.phase = Some(CardPhase::Registered);
            next.message = Some(format!("card {card_id} registered"));
            next.card_id = Some(card_id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Card", start.elapsed().as_secs_f64());
            info!("Card {}/{} registered", namespace, name);
            Ok(Action::await_change())
        }
        Err(err) => {
            if err.severity() == Severity::Permanent {
                next.phase = Some(CardPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}

/// Best-effort remote cleanup. No recorded identifier means no external
/// call at all; a missing card means it is already gone; any other failure
/// is logged and the local removal proceeds regardless.
pub async fn discard(terminal: &dyn TerminalApi, card_id: Option<&str>) {
    let Some(card_id) = card_id else {
        debug!("card never registered externally; nothing to clean up");
        return;
    };

    metrics::increment_external_cleanups("Card");
    match terminal.delete_card(card_id).await {
        Ok(()) => info!("Deleted card {} from the service", card_id),
        Err(e) if e.is_not_found() => debug!("Card {} already gone from the service", card_id),
        Err(e) => warn!(
            "Failed to delete card {} from the service: {} (resource removal proceeds)",
            card_id, e
        ),
    }
}

async fn cleanup(card: Arc<Card>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    discard(
        ctx.terminal.as_ref(),
        card.status.as_ref().and_then(|s| s.card_id.as_deref()),
    )
    .await;
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_permanent() {
        let err = validate(&CardSpec {
            token: String::new(),
        })
        .unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn tokenized_card_passes() {
        assert!(validate(&CardSpec {
            token: "tok_visa".to_string(),
        })
        .is_ok());
    }
}
