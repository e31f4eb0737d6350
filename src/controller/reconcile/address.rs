//! Address reconciler: registers a shipping address and records the
//! identifier dependents resolve.

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::require_non_empty;
use crate::controller::context::Context;
use crate::controller::error::{ReconcileError, Severity};
use crate::controller::status::{patch_status, up_to_date};
use crate::crd::{Address, AddressPhase, AddressSpec, AddressStatus};
use crate::metrics;
use crate::terminal::AddressPayload;

pub fn validate(spec: &AddressSpec) -> Result<(), ReconcileError> {
    require_non_empty("name", &spec.name)?;
    require_non_empty("street1", &spec.street1)?;
    require_non_empty("city", &spec.city)?;
    require_non_empty("zip", &spec.zip)?;
    require_non_empty("country", &spec.country)?;
    if spec.country.trim().len() != 2 {
        return Err(ReconcileError::Validation(format!(
            "spec.country '{}' is not a two-letter country code",
            spec.country
        )));
    }
    Ok(())
}

pub fn payload(spec: &AddressSpec) -> AddressPayload {
    AddressPayload {
        name: spec.name.clone(),
        street1: spec.street1.clone(),
        street2: spec.street2.clone(),
        city: spec.city.clone(),
        province: spec.province.clone(),
        zip: spec.zip.clone(),
        country: spec.country.clone(),
        phone: spec.phone.clone(),
    }
}

pub async fn reconcile(address: Arc<Address>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = address.name_any();
    let namespace = address.namespace().unwrap_or_else(|| "default".to_string());
    let generation = address.metadata.generation;

    metrics::increment_reconciliations("Address");
    info!("Reconciling Address {}/{}", namespace, name);

    let api: Api<Address> = Api::namespaced(ctx.client.clone(), &namespace);
    let status = address.status.clone().unwrap_or_default();

    // Idempotency gate: the identifier is set at most once per generation
    // and never overwritten while the phase stays Verified.
    if up_to_date(status.observed_generation, generation) {
        match status.phase {
            Some(AddressPhase::Verified) => {
                debug!(
                    "Address {}/{} already verified as {:?}",
                    namespace, name, status.address_id
                );
                return Ok(Action::await_change());
            }
            Some(AddressPhase::Failed) => return Ok(Action::await_change()),
            _ => {}
        }
    }

    if let Err(e) = validate(&address.spec) {
        let failed = AddressStatus {
            phase: Some(AddressPhase::Failed),
            observed_generation: generation,
            message: Some(e.to_string()),
            address_id: status.address_id,
        };
        patch_status(&api, &name, &failed).await?;
        return Err(e);
    }

    let mut next = AddressStatus {
        phase: Some(AddressPhase::Processing),
        observed_generation: generation,
        message: Some("creating address".to_string()),
        address_id: status.address_id,
    };
    patch_status(&api, &name, &next).await?;

    match ctx.terminal.create_address(&payload(&address.spec)).await {
        Ok(address_id) => {
            next.phase = Some(AddressPhase::Verified);
            next.message = Some(format!("address {address_id} verified"));
            next.address_id = Some(address_id);
            patch_status(&api, &name, &next).await?;
            metrics::observe_reconcile_duration("Address", start.elapsed().as_secs_f64());
            info!("Address {}/{} verified", namespace, name);
            Ok(Action::await_change())
        }
        Err(e) => {
            let err = ReconcileError::External(e);
            if err.severity() == Severity::Permanent {
                next.phase = Some(AddressPhase::Failed);
            }
            next.message = Some(err.to_string());
            patch_status(&api, &name, &next).await?;
            Err(err)
        }
    }
}
