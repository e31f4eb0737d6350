//! # Address resource
//!
//! A shipping address registered with the Terminal API. Orders, carts, and
//! subscriptions reference a Verified Address to obtain its `addressId`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired shipping address.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "coffee.terminal.sh",
    version = "v1alpha1",
    kind = "Address",
    namespaced,
    status = "AddressStatus",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"AddressId", "type":"string", "jsonPath":".status.addressId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpec {
    /// Recipient name.
    pub name: String,
    /// Street address, first line.
    pub street1: String,
    /// Street address, second line.
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    /// Province or state. Optional; not every country requires one.
    #[serde(default)]
    pub province: Option<String>,
    /// Postal or ZIP code.
    pub zip: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Provisioning state of an Address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum AddressPhase {
    Pending,
    Processing,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressStatus {
    #[serde(default)]
    pub phase: Option<AddressPhase>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier assigned by the Terminal API once the address is created.
    #[serde(default)]
    pub address_id: Option<String>,
}
