//! # Dependency resolution
//!
//! Dependent kinds (Order, Subscription, Cart) gate their terminal external
//! action on referenced prerequisites being ready. Resolution is a fresh
//! read of the prerequisite's status at reconcile time; nothing is cached
//! across reconciles, so staleness is bounded by the reconcile interval.
//!
//! The resolver is a trait so the engine can be exercised against stub
//! snapshots in tests.

use async_trait::async_trait;
use kube::{Api, Client};
use std::collections::BTreeMap;

use super::error::ReconcileError;
use crate::crd::{Address, AddressPhase, Card, CardPhase, Profile, ProfilePhase};

/// Point-in-time view of a referenced resource's status.
#[derive(Debug, Clone)]
pub struct DepSnapshot {
    /// Whether the resource is in its ready phase.
    pub ready: bool,
    /// The phase label, for messages.
    pub phase: String,
    /// The external identifier, when the kind owns one and it is set.
    pub external_id: Option<String>,
}

/// Reads prerequisite statuses by kind, namespace, and name.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Look up an Address; ready means phase Verified.
    async fn address(&self, namespace: &str, name: &str)
        -> Result<Option<DepSnapshot>, ReconcileError>;

    /// Look up a Card; ready means phase Registered.
    async fn card(&self, namespace: &str, name: &str)
        -> Result<Option<DepSnapshot>, ReconcileError>;

    /// Look up a Profile; ready means phase Synced. Profiles carry no
    /// external identifier.
    async fn profile(&self, namespace: &str, name: &str)
        -> Result<Option<DepSnapshot>, ReconcileError>;
}

/// Resolver backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeResolver {
    client: Client,
}

impl std::fmt::Debug for KubeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResolver").finish_non_exhaustive()
    }
}

impl KubeResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn phase_label<P: std::fmt::Debug>(phase: Option<P>) -> String {
    phase.map_or_else(|| "Unset".to_string(), |p| format!("{p:?}"))
}

#[async_trait]
impl ReferenceResolver for KubeResolver {
    async fn address(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        let api: Api<Address> = Api::namespaced(self.client.clone(), namespace);
        let Some(address) = api.get_opt(name).await? else {
            return Ok(None);
        };
        let status = address.status.unwrap_or_default();
        Ok(Some(DepSnapshot {
            ready: status.phase == Some(AddressPhase::Verified),
            phase: phase_label(status.phase),
            external_id: status.address_id,
        }))
    }

    async fn card(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        let api: Api<Card> = Api::namespaced(self.client.clone(), namespace);
        let Some(card) = api.get_opt(name).await? else {
            return Ok(None);
        };
        let status = card.status.unwrap_or_default();
        Ok(Some(DepSnapshot {
            ready: status.phase == Some(CardPhase::Registered),
            phase: phase_label(status.phase),
            external_id: status.card_id,
        }))
    }

    async fn profile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        let api: Api<Profile> = Api::namespaced(self.client.clone(), namespace);
        let Some(profile) = api.get_opt(name).await? else {
            return Ok(None);
        };
        let status = profile.status.unwrap_or_default();
        Ok(Some(DepSnapshot {
            ready: status.phase == Some(ProfilePhase::Synced),
            phase: phase_label(status.phase),
            external_id: None,
        }))
    }
}

/// Gate on a dependency that must be ready and expose its external
/// identifier. Updates the caller's `readyFlags` entry either way.
pub fn gate_with_id(
    dep: &'static str,
    kind: &'static str,
    namespace: &str,
    name: &str,
    snapshot: Option<DepSnapshot>,
    flags: &mut BTreeMap<String, bool>,
) -> Result<String, ReconcileError> {
    match gate(dep, kind, namespace, name, snapshot, flags, true)? {
        Some(id) => Ok(id),
        // Unreachable: requiring an id means gate only succeeds with one.
        None => Err(ReconcileError::ContractViolation(format!(
            "{kind} {namespace}/{name} is ready but exposes no identifier"
        ))),
    }
}

/// Gate on a dependency that only needs to be ready (no identifier).
pub fn gate_ready(
    dep: &'static str,
    kind: &'static str,
    namespace: &str,
    name: &str,
    snapshot: Option<DepSnapshot>,
    flags: &mut BTreeMap<String, bool>,
) -> Result<(), ReconcileError> {
    gate(dep, kind, namespace, name, snapshot, flags, false).map(|_| ())
}

fn gate(
    dep: &'static str,
    kind: &'static str,
    namespace: &str,
    name: &str,
    snapshot: Option<DepSnapshot>,
    flags: &mut BTreeMap<String, bool>,
    requires_id: bool,
) -> Result<Option<String>, ReconcileError> {
    let not_ready = |phase: String| ReconcileError::DependencyNotReady {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
        phase,
    };

    match snapshot {
        None => {
            flags.insert(dep.to_string(), false);
            Err(ReconcileError::DependencyNotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
        }
        Some(snapshot) if !snapshot.ready => {
            flags.insert(dep.to_string(), false);
            Err(not_ready(snapshot.phase))
        }
        Some(snapshot) => {
            // A ready phase without its identifier means the prerequisite's
            // status write has not landed in full yet; treat it as still
            // provisioning rather than corrupt.
            if requires_id && snapshot.external_id.is_none() {
                flags.insert(dep.to_string(), false);
                return Err(not_ready(snapshot.phase));
            }
            flags.insert(dep.to_string(), true);
            Ok(snapshot.external_id)
        }
    }
}
