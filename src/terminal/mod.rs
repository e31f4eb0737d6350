//! # Terminal API integration
//!
//! The operator's only side-effecting collaborator is the Terminal commerce
//! API. Every reconciler receives the service as a `TerminalApi` trait
//! object so tests can substitute a double without touching HTTP.
//!
//! Operations are grouped per kind, mirroring the service's REST surface:
//! profile update, address/card/order/subscription/token/app creation, cart
//! assembly, and the delete calls used by the deletion handlers.

use async_trait::async_trait;
use std::collections::BTreeMap;

mod client;
mod error;
mod types;

pub use client::TerminalClient;
pub use error::ApiError;
pub use types::{
    AddressInfo, AddressPayload, AppInfo, CardInfo, DataEnvelope, ErrorBody, HasId, IdOrRecord,
    OrderInfo, OrderTracking, ProfileInfo, ProfileUser, SchedulePayload, SubscriptionInfo,
    SubscriptionPayload, TokenInfo,
};

/// External-action interface for the Terminal API.
///
/// Create operations resolve the service's id-or-record response union and
/// return the bare identifier the engine persists in status. Cart operations
/// act on the account's single active cart.
#[async_trait]
pub trait TerminalApi: Send + Sync {
    async fn update_profile(&self, name: &str, email: &str) -> Result<ProfileInfo, ApiError>;

    async fn create_address(&self, address: &AddressPayload) -> Result<String, ApiError>;

    async fn create_card(&self, token: &str) -> Result<String, ApiError>;
    async fn list_cards(&self) -> Result<Vec<CardInfo>, ApiError>;
    async fn delete_card(&self, id: &str) -> Result<(), ApiError>;

    async fn create_order(
        &self,
        address_id: &str,
        card_id: &str,
        variants: &BTreeMap<String, i64>,
    ) -> Result<String, ApiError>;
    async fn get_order(&self, id: &str) -> Result<OrderInfo, ApiError>;

    /// Set the quantity for a variant in the active cart. Replaying the call
    /// with the same quantity is a no-op on the service side.
    async fn put_cart_item(&self, product_variant_id: &str, quantity: i64) -> Result<(), ApiError>;
    async fn set_cart_address(&self, address_id: &str) -> Result<(), ApiError>;
    async fn set_cart_card(&self, card_id: &str) -> Result<(), ApiError>;
    /// Convert the active cart into an order, returning the order id.
    async fn convert_cart(&self) -> Result<String, ApiError>;

    async fn create_subscription(
        &self,
        subscription: &SubscriptionPayload,
    ) -> Result<String, ApiError>;
    async fn delete_subscription(&self, id: &str) -> Result<(), ApiError>;

    async fn create_token(&self) -> Result<TokenInfo, ApiError>;
    async fn delete_token(&self, id: &str) -> Result<(), ApiError>;

    async fn create_app(&self, name: &str, redirect_uri: &str) -> Result<AppInfo, ApiError>;
    async fn delete_app(&self, id: &str) -> Result<(), ApiError>;
}
