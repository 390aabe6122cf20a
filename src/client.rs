//! Thin HTTP wrapper around the OpenList JSON API.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::ApiResponse;

/// Content type OpenList expects on POST bodies.
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one OpenList instance.
///
/// The inner [`reqwest::Client`] pools connections and is safe to share
/// across concurrent requests, so batch tasks borrow this client directly.
pub struct OpenListClient {
    base_url: String,
    token: String,
    http: Client,
}

impl OpenListClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the OpenList instance, e.g. `http://127.0.0.1:5244`
    /// * `token` - Admin token; an empty string sends no `Authorization` header
    /// * `timeout` - Upper bound for every single request
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the token used for subsequent requests.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// Send a GET request to `endpoint` (path relative to the base URL).
    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        let request = self.http.get(self.url(endpoint));
        self.send(request).await
    }

    /// Send a POST request with `body` serialized as JSON.
    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<ApiResponse> {
        let request = self
            .http
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(body);
        self.send(request).await
    }

    /// Send a POST request with an empty body.
    pub async fn post_empty(&self, endpoint: &str) -> Result<ApiResponse> {
        let request = self
            .http
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        self.send(request).await
    }

    /// Release pooled connections.
    pub fn close(self) {
        debug!(base_url = %self.base_url, "Closing OpenList client");
        drop(self.http);
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, mut request: RequestBuilder) -> Result<ApiResponse> {
        // OpenList takes the raw token, without a "Bearer" prefix.
        if !self.token.is_empty() {
            request = request.header(AUTHORIZATION, &self.token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "OpenList responded");

        let parsed: ApiResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
