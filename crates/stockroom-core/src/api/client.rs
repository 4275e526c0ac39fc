//! API client for communicating with the inventory REST API.
//!
//! This module provides the `ApiClient` struct, the production
//! implementation of `InventoryApi`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{ApiError, InventoryApi, IssueRequestBody};
use crate::models::{Category, Instrument, IssueRequest, Subcategory};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// The cache layer enforces no timeouts of its own; this is the only one.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the inventory service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// `include_credentials` turns on the cookie store so session cookies set
    /// by the server are sent back on later requests.
    pub fn new(base_url: &str, include_credentials: bool) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(include_credentials)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie: None,
        })
    }

    /// Create a new ApiClient carrying an existing session cookie,
    /// sharing the connection pool.
    pub fn with_session_cookie(&self, cookie: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session_cookie: Some(cookie),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let mut builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref cookie) = self.session_cookie {
            let value = header::HeaderValue::from_str(cookie)
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid session cookie: {}", e)))?;
            builder = builder.header(header::COOKIE, value);
        }
        Ok(builder)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.request(Method::GET, url)?.send().await?;

            if response.status().as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let response = Self::check_response(response).await?;
            return Self::parse_json(response, url).await;
        }
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.request(method, url)?.json(body).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, url).await
    }
}

#[async_trait]
impl InventoryApi for ApiClient {
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let categories: Vec<Category> = self.get(&self.url("/categories")).await?;
        debug!(count = categories.len(), "Categories response received");
        Ok(categories)
    }

    async fn fetch_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>, ApiError> {
        let url = self.url(&format!("/subcategories?category_id={}", category_id));
        let subs: Vec<Subcategory> = self.get(&url).await?;
        debug!(category_id, count = subs.len(), "Subcategories response received");
        Ok(subs)
    }

    async fn fetch_instruments(&self, subcategory_id: i64) -> Result<Vec<Instrument>, ApiError> {
        let url = self.url(&format!("/items?subcategory={}", subcategory_id));
        let items: Vec<Instrument> = self.get(&url).await?;
        debug!(subcategory_id, count = items.len(), "Items response received");
        Ok(items)
    }

    async fn update_instrument(&self, instrument: &Instrument) -> Result<Instrument, ApiError> {
        let url = self.url(&format!("/items/{}", instrument.id));
        self.send_json(Method::PUT, &url, instrument).await
    }

    async fn delete_instrument(&self, id: i64) -> Result<(), ApiError> {
        let url = self.url(&format!("/items/{}", id));
        let response = self.request(Method::DELETE, &url)?.send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn create_issue_request(
        &self,
        body: &IssueRequestBody,
    ) -> Result<IssueRequest, ApiError> {
        let url = self.url("/issue-requests/");
        self.send_json(Method::POST, &url, body).await
    }
}
