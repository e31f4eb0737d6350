//! # Terminal API wire types
//!
//! One explicit schema for every response the operator reads. The service
//! wraps payloads in a `data` envelope, and a handful of create endpoints
//! return either a bare identifier string or the full record depending on
//! API version; that union is modeled once here and resolved at the client
//! boundary so the rest of the engine only ever sees plain identifiers.

use serde::{Deserialize, Serialize};

/// The `{"data": ...}` envelope every Terminal response uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// A create response that is either a bare id or the created record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdOrRecord<T> {
    Id(String),
    Record(T),
}

/// Records that expose the identifier the engine stores in status.
pub trait HasId {
    fn into_id(self) -> String;
}

impl<T: HasId> IdOrRecord<T> {
    /// Resolve the union to the identifier, whichever shape was returned.
    pub fn into_id(self) -> String {
        match self {
            IdOrRecord::Id(id) => id,
            IdOrRecord::Record(record) => record.into_id(),
        }
    }
}

/// Error body the service attaches to non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Address-create request body. Field names follow the service's wire
/// convention (`zip`, `province`), not Kubernetes casing.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPayload {
    pub name: String,
    pub street1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub zip: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Subscription-create request body.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPayload {
    #[serde(rename = "productVariantID")]
    pub product_variant_id: String,
    pub quantity: i64,
    #[serde(rename = "addressID")]
    pub address_id: String,
    #[serde(rename = "cardID")]
    pub card_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<SchedulePayload>,
}

/// Delivery cadence in the service's wire shape.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SchedulePayload {
    Fixed,
    Weekly { interval: u32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInfo {
    #[serde(default)]
    pub user: Option<ProfileUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInfo {
    pub id: String,
}

impl HasId for AddressInfo {
    fn into_id(self) -> String {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardInfo {
    pub id: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

impl HasId for CardInfo {
    fn into_id(self) -> String {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    pub id: String,
    #[serde(default)]
    pub tracking: Option<OrderTracking>,
}

impl HasId for OrderInfo {
    fn into_id(self) -> String {
        self.id
    }
}

/// Shipment tracking block on an order. All fields are optional; the drift
/// poller treats a present tracking number as the only positive evidence of
/// shipment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderTracking {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl OrderInfo {
    /// True when the service reports a concrete tracking number.
    pub fn has_tracking(&self) -> bool {
        self.tracking
            .as_ref()
            .is_some_and(|t| t.number.as_deref().is_some_and(|n| !n.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
}

impl HasId for SubscriptionInfo {
    fn into_id(self) -> String {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    /// The bearer value, returned exactly once at creation. Never persisted.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// OAuth client secret, returned once at creation. Never persisted.
    #[serde(default)]
    pub secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_bare_id_resolves() {
        let env: DataEnvelope<IdOrRecord<AddressInfo>> =
            serde_json::from_str(r#"{"data": "shp_123"}"#).unwrap();
        assert_eq!(env.data.into_id(), "shp_123");
    }

    #[test]
    fn envelope_with_record_resolves() {
        let env: DataEnvelope<IdOrRecord<AddressInfo>> =
            serde_json::from_str(r#"{"data": {"id": "shp_456", "city": "Portland"}}"#).unwrap();
        assert_eq!(env.data.into_id(), "shp_456");
    }

    #[test]
    fn tracking_number_is_the_only_shipment_evidence() {
        let order: OrderInfo =
            serde_json::from_str(r#"{"id": "ord_1", "tracking": {"service": "usps"}}"#).unwrap();
        assert!(!order.has_tracking());

        let shipped: OrderInfo = serde_json::from_str(
            r#"{"id": "ord_1", "tracking": {"service": "usps", "number": "9400"}}"#,
        )
        .unwrap();
        assert!(shipped.has_tracking());

        let bare: OrderInfo = serde_json::from_str(r#"{"id": "ord_1"}"#).unwrap();
        assert!(!bare.has_tracking());
    }

    #[test]
    fn error_body_tolerates_missing_fields() {
        let body: ErrorBody = serde_json::from_str(r#"{"code": "already_exists"}"#).unwrap();
        assert_eq!(body.code.as_deref(), Some("already_exists"));
        assert!(body.message.is_none());
    }
}
