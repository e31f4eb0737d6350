//! Token reconciler: mints a personal access token. The bearer value is
//! returned by the service exactly once and is intentionally dropped; only
//! the identifier is recorded so the token can be revoked on deletion.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::FINALIZER;
use crate::controller::context::Context;
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Token, TokenPhase, TokenStatus};
use crate::metrics;

pub async fn reconcile(token: Arc<Token>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = token.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<Token> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, token, |event| async move {
        match event {
            FinalizerEvent::Apply(token) => apply(token, ctx).await,
            FinalizerEvent::Cleanup(token) => cleanup(token, ctx).await,
        }
    })
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)))
}

async fn apply(token: Arc<Token>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = token.name_any();
    let namespace = token.namespace().unwrap_or_else(|| "default".to_string());
    let generation = token.metadata.generation;

    metrics::increment_reconciliations("Token");
    info!("Reconciling Token {}/{}", namespace, name);

    let api: Api<Token> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = token.status.clone().unwrap_or_default();

    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(TokenPhase::Active) => {
                debug!(
                    "Token {}/{} already active as {:?}",
                    namespace, name, status.token_id
                );
                return Ok(Action::await_change());
            }
            Some(TokenPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    let mut next = TokenStatus {
        phase: Some(TokenPhase::Pending),
        observed_generation: generation,
        message: Some("minting access token".to_string()),
        token_id: status.token_id,
    };
    patch_status(&api, &name, &next).await?;

    match ctx.terminal.create_token().await {
        Ok(created) => {
            next.phase = Some(TokenPhase::Active);
            next.message = Some(format!(
                "token {} active; the bearer value was shown once by the service and is not stored",
                created.id
            ));
            next.token_id = Some(created.id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Token", start.elapsed().as_secs_f64());
            info!("Token {}/{} active", namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(TokenPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}

/// Best-effort token revocation on removal; never blocks deletion.
pub async fn discard(terminal: &dyn crate::terminal::TerminalApi, token_id: Option<&str>) {
    let Some(token_id) = token_id else {
        debug!("token never minted externally; nothing to clean up");
        return;
    };

    metrics::increment_external_cleanups("Token");
    match terminal.delete_token(token_id).await {
        Ok(()) => info!("Revoked token {} on the service", token_id),
        Err(e) if e.is_not_found() => debug!("Token {} already gone from the service", token_id),
        Err(e) => warn!(
            "Failed to revoke token {} on the service: {} (resource removal proceeds)",
            token_id, e
        ),
    }
}

async fn cleanup(token: Arc<Token>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    discard(
        ctx.terminal.as_ref(),
        token.status.as_ref().and_then(|s| s.token_id.as_deref()),
    )
    .await;
    Ok(Action::await_change())
}
