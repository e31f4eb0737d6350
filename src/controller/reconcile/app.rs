//! App reconciler: registers an OAuth application.

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
use crate::crd::{App, AppPhase, AppSpec, AppStatus};
use crate::metrics;

pub fn validate(spec: &AppSpec) -> Result<(), ReconcileError> {
    require_non_empty("name", &spec.name)?;
    require_non_empty("redirectUri", &spec.redirect_uri)?;
    if !spec.redirect_uri.contains("://") {
        return Err(ReconcileError::Validation(format!(
            "spec.redirectUri '{}' is not an absolute URI",
            spec.redirect_uri
        )));
    }
    Ok(())
}

pub async fn reconcile(app: Arc<App>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = app.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<App> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, app, |event| async move {
        match event {
            FinalizerEvent::Apply(app) => apply(app, ctx).await,
            FinalizerEvent::Cleanup(app) => cleanup(app, ctx).await,
        }
    })
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)))
}

async fn apply(app: Arc<App>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = app.name_any();
    let namespace = app.namespace().unwrap_or_else(|| "default".to_string());
    let generation = app.metadata.generation;

    metrics::increment_reconciliations("App");
    info!("Reconciling App {}/{}", namespace, name);

    let api: Api<App> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = app.status.clone().unwrap_or_default();

    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(AppPhase::Active) => {
                debug!(
                    "App {}/{} already active as {:?}",
                    namespace, name, status.app_id
                );
                return Ok(Action::await_change());
            }
            Some(AppPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&app.spec) {
        let failed = AppStatus {
            phase: Some(AppPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            app_id: status.app_id,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    let mut next = AppStatus {
        phase: Some(AppPhase::Pending),
        observed_generation: generation,
        message: Some("registering app".to_string()),
        app_id: status.app_id,
    };
    patch_status(&api, &name, &next).await?;

    match ctx
        .terminal
        .create_app(&app.spec.name, &app.spec.redirect_uri)
        .await
    {
        Ok(created) => {
            next.phase = Some(AppPhase::Active);
            next.message = Some(format!("app {} registered", created.id));
            next.app_id = Some(created.id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("App", start.elapsed().as_secs_f64());
            info!("App {}/{} active", namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(AppPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}

/// Best-effort remote app deletion; never blocks resource removal.
pub async fn discard(terminal: &dyn crate::terminal::TerminalApi, app_id: Option<&str>) {
    let Some(app_id) = app_id else {
        debug!("app never registered externally; nothing to clean up");
        return;
    };

    metrics::increment_external_cleanups("App");
    match terminal.delete_app(app_id).await {
        Ok(()) => info!("Deleted app {} from the service", app_id),
        Err(e) if e.is_not_found() => debug!("App {} already gone from the service", app_id),
        Err(e) => warn!(
            "Failed to delete app {} from the service: {} (resource removal proceeds)",
            app_id, e
        ),
    }
}

async fn cleanup(app: Arc<App>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    discard(
        ctx.terminal.as_ref(),
        app.status.as_ref().and_then(|s| s.app_id.as_deref()),
    )
    .await;
    Ok(Action::await_change())
}
