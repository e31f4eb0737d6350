//! # Terminal API client
//!
//! `reqwest`-backed implementation of [`TerminalApi`]. The client owns the
//! bearer credential, records per-operation metrics, and resolves the
//! service's response envelopes so callers only see plain identifiers and
//! typed records.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    AddressInfo, AddressPayload, AppInfo, CardInfo, DataEnvelope, ErrorBody, IdOrRecord, OrderInfo,
    ProfileInfo, SubscriptionInfo, SubscriptionPayload, TokenInfo,
};
use super::TerminalApi;
use crate::metrics;

/// HTTP client for the Terminal API.
#[derive(Debug, Clone)]
pub struct TerminalClient {
    http: reqwest::Client,
    base_url: String,
}

impl TerminalClient {
    /// Build a client for the given API base URL using bearer-token auth.
    pub fn new(base_url: impl Into<String>, bearer_token: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {bearer_token}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("terminal-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and return the raw status and body, recording metrics
    /// for the named operation.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, String), ApiError> {
        let start = Instant::now();
        metrics::increment_api_operations(operation);

        let response = request.send().await.map_err(|e| {
            metrics::increment_api_operation_errors(operation);
            ApiError::Transport(e)
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            metrics::increment_api_operation_errors(operation);
            ApiError::Transport(e)
        })?;

        metrics::observe_api_operation_duration(operation, start.elapsed().as_secs_f64());
        debug!("terminal {} -> {}", operation, status);

        if status.is_success() {
            Ok((status, body))
        } else {
            metrics::increment_api_operation_errors(operation);
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                code: parsed.code,
                message: parsed.message.unwrap_or(body),
            })
        }
    }

    /// Send a request and decode the enveloped payload.
    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let (_, body) = self.execute(operation, request).await?;
        let envelope: DataEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("{operation}: {e}")))?;
        Ok(envelope.data)
    }

    /// Send a request where the caller only cares about success.
    async fn unit(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(), ApiError> {
        self.execute(operation, request).await.map(|_| ())
    }
}

#[async_trait]
impl TerminalApi for TerminalClient {
    async fn update_profile(&self, name: &str, email: &str) -> Result<ProfileInfo, ApiError> {
        let body = serde_json::json!({ "name": name, "email": email });
        self.json(
            "profile.update",
            self.http.put(self.url("/profile")).json(&body),
        )
        .await
    }

    async fn create_address(&self, address: &AddressPayload) -> Result<String, ApiError> {
        let created: IdOrRecord<AddressInfo> = self
            .json(
                "address.create",
                self.http.post(self.url("/address")).json(address),
            )
            .await?;
        Ok(created.into_id())
    }

    async fn create_card(&self, token: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "token": token });
        let created: IdOrRecord<CardInfo> = self
            .json("card.create", self.http.post(self.url("/card")).json(&body))
            .await?;
        Ok(created.into_id())
    }

    async fn list_cards(&self) -> Result<Vec<CardInfo>, ApiError> {
        self.json("card.list", self.http.get(self.url("/card")))
            .await
    }

    async fn delete_card(&self, id: &str) -> Result<(), ApiError> {
        self.unit(
            "card.delete",
            self.http.delete(self.url(&format!("/card/{id}"))),
        )
        .await
    }

    async fn create_order(
        &self,
        address_id: &str,
        card_id: &str,
        variants: &BTreeMap<String, i64>,
    ) -> Result<String, ApiError> {
        let body = serde_json::json!({
            "addressID": address_id,
            "cardID": card_id,
            "variants": variants,
        });
        let created: IdOrRecord<OrderInfo> = self
            .json(
                "order.create",
                self.http.post(self.url("/order")).json(&body),
            )
            .await?;
        Ok(created.into_id())
    }

    async fn get_order(&self, id: &str) -> Result<OrderInfo, ApiError> {
        self.json("order.get", self.http.get(self.url(&format!("/order/{id}"))))
            .await
    }

    async fn put_cart_item(&self, product_variant_id: &str, quantity: i64) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "productVariantID": product_variant_id,
            "quantity": quantity,
        });
        self.unit(
            "cart.item",
            self.http.put(self.url("/cart/item")).json(&body),
        )
        .await
    }

    async fn set_cart_address(&self, address_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "addressID": address_id });
        self.unit(
            "cart.address",
            self.http.put(self.url("/cart/address")).json(&body),
        )
        .await
    }

    async fn set_cart_card(&self, card_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "cardID": card_id });
        self.unit(
            "cart.card",
            self.http.put(self.url("/cart/card")).json(&body),
        )
        .await
    }

    async fn convert_cart(&self) -> Result<String, ApiError> {
        let converted: IdOrRecord<OrderInfo> = self
            .json("cart.convert", self.http.post(self.url("/cart/convert")))
            .await?;
        Ok(converted.into_id())
    }

    async fn create_subscription(
        &self,
        subscription: &SubscriptionPayload,
    ) -> Result<String, ApiError> {
        let created: IdOrRecord<SubscriptionInfo> = self
            .json(
                "subscription.create",
                self.http.post(self.url("/subscription")).json(subscription),
            )
            .await?;
        Ok(created.into_id())
    }

    async fn delete_subscription(&self, id: &str) -> Result<(), ApiError> {
        self.unit(
            "subscription.delete",
            self.http.delete(self.url(&format!("/subscription/{id}"))),
        )
        .await
    }

    async fn create_token(&self) -> Result<TokenInfo, ApiError> {
        self.json("token.create", self.http.post(self.url("/token")))
            .await
    }

    async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        self.unit(
            "token.delete",
            self.http.delete(self.url(&format!("/token/{id}"))),
        )
        .await
    }

    async fn create_app(&self, name: &str, redirect_uri: &str) -> Result<AppInfo, ApiError> {
        let body = serde_json::json!({ "name": name, "redirectURI": redirect_uri });
        self.json("app.create", self.http.post(self.url("/app")).json(&body))
            .await
    }

    async fn delete_app(&self, id: &str) -> Result<(), ApiError> {
        self.unit(
            "app.delete",
            self.http.delete(self.url(&format!("/app/{id}"))),
        )
        .await
    }
}
