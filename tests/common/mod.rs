//! Test doubles for the reconciliation engine: a scriptable Terminal API
//! and a stub dependency resolver. Responses are queued per operation;
//! operations with an empty queue answer with a generic success so tests
//! only script what they assert on.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use terminal_operator::controller::deps::{DepSnapshot, ReferenceResolver};
use terminal_operator::controller::ReconcileError;
use terminal_operator::terminal::{
    AddressPayload, ApiError, AppInfo, CardInfo, OrderInfo, ProfileInfo, SubscriptionPayload,
    TerminalApi, TokenInfo,
};

/// Build an HTTP-status error like the real client produces.
pub fn status_error(status: u16, code: Option<&str>) -> ApiError {
    ApiError::Status {
        status,
        code: code.map(str::to_string),
        message: format!("simulated {status} response"),
    }
}

pub fn card(id: &str) -> CardInfo {
    CardInfo {
        id: id.to_string(),
        brand: Some("Visa".to_string()),
        last4: Some("4242".to_string()),
    }
}

/// Scriptable [`TerminalApi`] double. Every call is recorded as
/// `"<operation> <args>"`, and per-operation queues drive the responses.
#[derive(Default)]
pub struct MockTerminal {
    calls: Mutex<Vec<String>>,
    create_card_responses: Mutex<VecDeque<Result<String, ApiError>>>,
    list_cards_responses: Mutex<VecDeque<Result<Vec<CardInfo>, ApiError>>>,
    create_order_responses: Mutex<VecDeque<Result<String, ApiError>>>,
    get_order_responses: Mutex<VecDeque<Result<OrderInfo, ApiError>>>,
    create_subscription_responses: Mutex<VecDeque<Result<String, ApiError>>>,
    delete_responses: Mutex<VecDeque<Result<(), ApiError>>>,
}

impl MockTerminal {
    pub fn queue_create_card(&self, response: Result<String, ApiError>) {
        self.create_card_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_list_cards(&self, response: Result<Vec<CardInfo>, ApiError>) {
        self.list_cards_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_create_order(&self, response: Result<String, ApiError>) {
        self.create_order_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_get_order(&self, response: Result<OrderInfo, ApiError>) {
        self.get_order_responses.lock().unwrap().push_back(response);
    }

    pub fn queue_create_subscription(&self, response: Result<String, ApiError>) {
        self.create_subscription_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn queue_delete(&self, response: Result<(), ApiError>) {
        self.delete_responses.lock().unwrap().push_back(response);
    }

    /// Number of recorded calls for the given operation.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop_delete(&self) -> Result<(), ApiError> {
        self.delete_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl TerminalApi for MockTerminal {
    async fn update_profile(&self, name: &str, email: &str) -> Result<ProfileInfo, ApiError> {
        self.record(format!("profile.update {name} {email}"));
        Ok(ProfileInfo { user: None })
    }

    async fn create_address(&self, address: &AddressPayload) -> Result<String, ApiError> {
        self.record(format!("address.create {}", address.zip));
        Ok("shp_generated".to_string())
    }

    async fn create_card(&self, token: &str) -> Result<String, ApiError> {
        self.record(format!("card.create {token}"));
        self.create_card_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("crd_generated".to_string()))
    }

    async fn list_cards(&self) -> Result<Vec<CardInfo>, ApiError> {
        self.record("card.list".to_string());
        self.list_cards_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_card(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("card.delete {id}"));
        self.pop_delete()
    }

    async fn create_order(
        &self,
        address_id: &str,
        card_id: &str,
        variants: &BTreeMap<String, i64>,
    ) -> Result<String, ApiError> {
        let variants_summary = variants
            .iter()
            .map(|(variant, quantity)| format!("{variant}x{quantity}"))
            .collect::<Vec<_>>()
            .join(",");
        self.record(format!("order.create {address_id} {card_id} {variants_summary}"));
        self.create_order_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ord_generated".to_string()))
    }

    async fn get_order(&self, id: &str) -> Result<OrderInfo, ApiError> {
        self.record(format!("order.get {id}"));
        self.get_order_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(OrderInfo {
                    id: id.to_string(),
                    tracking: None,
                })
            })
    }

    async fn put_cart_item(&self, product_variant_id: &str, quantity: i64) -> Result<(), ApiError> {
        self.record(format!("cart.item {product_variant_id} {quantity}"));
        Ok(())
    }

    async fn set_cart_address(&self, address_id: &str) -> Result<(), ApiError> {
        self.record(format!("cart.address {address_id}"));
        Ok(())
    }

    async fn set_cart_card(&self, card_id: &str) -> Result<(), ApiError> {
        self.record(format!("cart.card {card_id}"));
        Ok(())
    }

    async fn convert_cart(&self) -> Result<String, ApiError> {
        self.record("cart.convert".to_string());
        Ok("ord_from_cart".to_string())
    }

    async fn create_subscription(
        &self,
        subscription: &SubscriptionPayload,
    ) -> Result<String, ApiError> {
        self.record(format!(
            "subscription.create {} {}",
            subscription.address_id, subscription.card_id
        ));
        self.create_subscription_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("sub_generated".to_string()))
    }

    async fn delete_subscription(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("subscription.delete {id}"));
        self.pop_delete()
    }

    async fn create_token(&self) -> Result<TokenInfo, ApiError> {
        self.record("token.create".to_string());
        Ok(TokenInfo {
            id: "pat_generated".to_string(),
            token: Some("trm_secret".to_string()),
        })
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("token.delete {id}"));
        self.pop_delete()
    }

    async fn create_app(&self, name: &str, redirect_uri: &str) -> Result<AppInfo, ApiError> {
        self.record(format!("app.create {name} {redirect_uri}"));
        Ok(AppInfo {
            id: "app_generated".to_string(),
            name: Some(name.to_string()),
            secret: None,
        })
    }

    async fn delete_app(&self, id: &str) -> Result<(), ApiError> {
        self.record(format!("app.delete {id}"));
        self.pop_delete()
    }
}

/// Stub resolver with fixed snapshots per kind.
#[derive(Default)]
pub struct StubResolver {
    pub address: Option<DepSnapshot>,
    pub card: Option<DepSnapshot>,
    pub profile: Option<DepSnapshot>,
}

pub fn ready(phase: &str, external_id: Option<&str>) -> DepSnapshot {
    DepSnapshot {
        ready: true,
        phase: phase.to_string(),
        external_id: external_id.map(str::to_string),
    }
}

pub fn provisioning(phase: &str) -> DepSnapshot {
    DepSnapshot {
        ready: false,
        phase: phase.to_string(),
        external_id: None,
    }
}

#[async_trait]
impl ReferenceResolver for StubResolver {
    async fn address(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        Ok(self.address.clone())
    }

    async fn card(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        Ok(self.card.clone())
    }

    async fn profile(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<DepSnapshot>, ReconcileError> {
        Ok(self.profile.clone())
    }
}
