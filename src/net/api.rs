//! REST client for the restaurant backend.
//!
//! Thin wrapper over `reqwest`: one method per endpoint, every request signed
//! with the session's bearer token and tagged with an `x-request-id`. Error
//! bodies are reduced to the backend's `message` field by [`parse_error_message`]
//! so callers can show it as-is.

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{
    MenuItem, MenuUpdate, NewMenuItem, NewOrder, NewReservation, Order, PasswordChange, ProfileUpdate, RegisterUser,
    Reservation, Table, User, UserUpdate, ValidationError,
};
use crate::config::{AppConfig, HttpTimeouts};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("{message}")]
    Response { status: u16, message: String },
    #[error("unexpected response from {path}: {detail}")]
    Parse { path: String, detail: String },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("order {0} not found")]
    OrderNotFound(String),
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(base_url: &str, timeouts: HttpTimeouts, token: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), token })
    }

    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_config(config: &AppConfig, token: Option<String>) -> Result<Self, ApiError> {
        Self::new(&config.backend_url, config.timeouts, token)
    }

    // -------------------------------------------------------------------------
    // Menu
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn list_menu(&self) -> Result<Vec<MenuItem>, ApiError> {
        self.get_json("/menus").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] before any request if required fields are missing.
    pub async fn create_menu_item(&self, item: &NewMenuItem) -> Result<(), ApiError> {
        item.validate()?;
        let mut form = reqwest::multipart::Form::new()
            .text("name", item.name.trim().to_owned())
            .text("category", item.category.trim().to_owned())
            .text("price", item.price.to_string())
            .text("description", item.description.clone())
            .text("available", item.available.to_string());
        if let Some(image) = item.image.as_deref().filter(|i| !i.trim().is_empty()) {
            form = form.text("image", image.trim().to_owned());
        }
        let request = self.request(Method::POST, "/menus")?.multipart(form);
        self.execute(request, "/menus").await.map(drop)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] before any request if the update is invalid.
    pub async fn update_menu_item(&self, id: &str, update: &MenuUpdate) -> Result<(), ApiError> {
        update.validate()?;
        self.send_json(Method::PUT, &format!("/menus/{id}"), update).await.map(drop)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_json("/orders").await
    }

    /// Create an order and return the saved record with its new id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] before any request if the order has no items.
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        order.validate()?;
        let body = self.send_json(Method::POST, "/orders", order).await?;
        parse_body("/orders", &body)
    }

    /// There is no single-order endpoint; this scans the full list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::OrderNotFound`] when no order has the id.
    pub async fn find_order(&self, id: &str) -> Result<Order, ApiError> {
        self.list_orders()
            .await?
            .into_iter()
            .find(|order| order.id.as_deref() == Some(id))
            .ok_or_else(|| ApiError::OrderNotFound(id.to_owned()))
    }

    // -------------------------------------------------------------------------
    // Tables and reservations
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn list_tables(&self) -> Result<Vec<Table>, ApiError> {
        self.get_json("/tables").await
    }

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, ApiError> {
        self.get_json("/reservations").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] before any request if required fields are missing.
    pub async fn create_reservation(&self, reservation: &NewReservation) -> Result<(), ApiError> {
        reservation.validate()?;
        self.send_json(Method::POST, "/reservations", reservation).await.map(drop)
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("/users").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] before any request if required fields are missing.
    pub async fn register_user(&self, user: &RegisterUser) -> Result<(), ApiError> {
        user.validate()?;
        self.send_json(Method::POST, "/users/register", user).await.map(drop)
    }

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &format!("/users/{id}"), update).await.map(drop)
    }

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.get_json("/users/profile").await
    }

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let body = self.send_json(Method::PUT, "/users/profile", update).await?;
        parse_body("/users/profile", &body)
    }

    /// # Errors
    ///
    /// Fails when not signed in, on transport errors, or on a non-2xx response.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.send_json(Method::PUT, "/users/change-password", change).await.map(drop)
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotSignedIn)?;
        let url = format!("{}{path}", self.base_url);
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?;
        let body = self.execute(request, path).await?;
        parse_body(path, &body)
    }

    async fn send_json<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> Result<String, ApiError> {
        let request = self.request(method, path)?.json(body);
        self.execute(request, path).await
    }

    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<String, ApiError> {
        let request = request.build().map_err(|e| ApiError::Request(e.to_string()))?;
        let method = request.method().clone();
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(%method, path, %request_id, error = %e, "backend request failed");
            ApiError::Request(e.to_string())
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = parse_error_message(&text, status.canonical_reason());
            warn!(%method, path, %request_id, status = status.as_u16(), %message, "backend returned error");
            return Err(ApiError::Response { status: status.as_u16(), message });
        }

        debug!(%method, path, %request_id, status = status.as_u16(), "backend request ok");
        Ok(text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Pull the user-facing message out of an error body.
///
/// Prefers a JSON `message` field, then the raw body, then the status reason.
#[must_use]
pub fn parse_error_message(body: &str, reason: Option<&str>) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_owned));
    if let Some(message) = from_json.filter(|m| !m.trim().is_empty()) {
        return message;
    }
    let raw = body.trim();
    if !raw.is_empty() {
        return raw.to_owned();
    }
    reason.unwrap_or("request failed").to_owned()
}

/// # Errors
///
/// Returns [`ApiError::Parse`] naming the endpoint when the body does not match `T`.
pub fn parse_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Parse { path: path.to_owned(), detail: e.to_string() })
}
