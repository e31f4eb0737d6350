//! Profile reconciler: pushes the desired account profile to the service.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::require_non_empty;
use crate::controller::context::Context;
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Profile, ProfilePhase, ProfileSpec, ProfileStatus};
use crate::metrics;

pub fn validate(spec: &ProfileSpec) -> Result<(), ReconcileError> {
    require_non_empty("name", &spec.name)?;
    require_non_empty("email", &spec.email)?;
    if !spec.email.contains('@') {
        return Err(ReconcileError::Validation(format!(
            "spec.email '{}' is not an email address",
            spec.email
        )));
    }
    Ok(())
}

pub async fn reconcile(profile: Arc<Profile>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = profile.name_any();
    let namespace = profile.namespace().unwrap_or_else(|| "default".to_string());
    let generation = profile.metadata.generation;

    metrics::increment_reconciliations("Profile");
    info!("Reconciling Profile {}/{}", namespace, name);

    let api: Api<Profile> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = profile.status.clone().unwrap_or_default();

    // Idempotency gate: this generation already synced or settled.
    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(ProfilePhase::Synced) => {
                debug!(
                    "Profile {}/{} already synced at generation {:?}",
                    namespace, name, generation
                );
                return Ok(Action::await_change());
            }
            Some(ProfilePhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&profile.spec) {
        let failed = ProfileStatus {
            phase: Some(ProfilePhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            last_sync_time: status.last_sync_time,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    // Pre-write so an interrupted sync leaves an observable state.
    let mut next = ProfileStatus {
        phase: Some(ProfilePhase::Pending),
        observed_generation: generation,
        message: Some("syncing profile".to_string()),
        last_sync_time: status.last_sync_time,
    };
    patch_status(&api, &name, &next).await?;

    match ctx
        .terminal
        .update_profile(&profile.spec.name, &profile.spec.email)
        .await
    {
        Ok(_) => {
            next.phase = Some(ProfilePhase::Synced);
            next.message = Some(format!("profile synced as {}", profile.spec.email));
            next.last_sync_time = Some(chrono::Utc::now().to_rfc3339());
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Profile", start.elapsed().as_secs_f64());
            info!("Profile {}/{} synced", namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(ProfilePhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}
