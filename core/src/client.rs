//! Retrying HTTP client for the CaaS backend.
//!
//! # Design
//! `ApiClient` is the single point of outbound communication. Every call
//! goes through [`ApiClient::send`], which
//!
//! 1. attaches `Authorization: Bearer <token>` when the token store has one,
//! 2. hands the attempt to the `Transport`,
//! 3. retries retryable statuses with exponential backoff per `RetryPolicy`,
//! 4. normalizes every failure into an `ApiError`.
//!
//! Domain endpoints live in `endpoints.rs` as `build_*` methods (pure
//! request descriptors) paired with async methods that execute them.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::credentials::{FileTokenStore, NoToken, TokenStore};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport, TransportError};

pub struct ApiClient<T = ReqwestTransport> {
    base_url: Url,
    transport: T,
    retry: RetryPolicy,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient<ReqwestTransport> {
    /// Build a production client from loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport =
            ReqwestTransport::new(config.timeout()).map_err(|e| ApiError::client(e.to_string()))?;
        let mut client = Self::with_transport(&config.api_base_url, transport)?
            .with_retry_policy(config.retry_policy());
        if let Some(path) = &config.token_file {
            client = client.with_token_store(Arc::new(FileTokenStore::new(path)));
        }
        Ok(client)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::client(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::client(format!("invalid base URL '{base_url}'")));
        }
        Ok(Self {
            base_url,
            transport,
            retry: RetryPolicy::default(),
            tokens: Arc::new(NoToken),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL for a path relative to the base, e.g. `/health`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Absolute URL built from individually percent-encoded path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    /// Execute `request`, retrying transient failures, and decode the body.
    pub async fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let response = self.send_raw(request).await?;
        decode(&response)
    }

    async fn send_raw(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiError> {
        loop {
            match self.tokens.token() {
                Some(token) => request.set_header("Authorization", format!("Bearer {token}")),
                None => request.remove_header("Authorization"),
            }

            let response = match self.transport.execute(&request).await {
                Ok(response) => response,
                Err(TransportError::NoResponse(cause)) => {
                    warn!(
                        method = request.method.as_str(),
                        path = %request.path,
                        error = %cause,
                        "no response from server"
                    );
                    return Err(ApiError::network(cause));
                }
                Err(TransportError::Local(cause)) => return Err(ApiError::client(cause)),
                Err(TransportError::Body { status, cause }) => {
                    return Err(ApiError::invalid_response(status, cause))
                }
            };

            if response.is_success() {
                return Ok(response);
            }

            if !self.retry.should_retry(&request, response.status) {
                return Err(ApiError::from_response(response.status, &response.body));
            }

            request.attempt += 1;
            let delay = self.retry.delay_for(request.attempt);
            info!(
                status = response.status,
                path = %request.path,
                delay_ms = delay.as_millis() as u64,
                "Retrying request (attempt {}/{})",
                request.attempt,
                self.retry.max_retries
            );
            tokio::time::sleep(delay).await;
        }
    }

    // -----------------------------------------------------------------------
    // Generic verbs
    // -----------------------------------------------------------------------

    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<R, ApiError> {
        self.send(HttpRequest::new(HttpMethod::Get, self.url(path)).with_query(query))
            .await
    }

    pub async fn post<R, B>(&self, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.with_body(HttpMethod::Post, path, body)?).await
    }

    pub async fn put<R, B>(&self, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.with_body(HttpMethod::Put, path, body)?).await
    }

    pub async fn patch<R, B>(&self, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.with_body(HttpMethod::Patch, path, body)?).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(HttpRequest::new(HttpMethod::Delete, self.url(path)))
            .await
    }

    fn with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let request = HttpRequest::new(method, self.url(path));
        match body {
            Some(body) => request.with_json(body),
            None => Ok(request),
        }
    }
}

/// Decode a 2xx body. An empty body decodes as JSON `null`, so `()` and
/// `Option<_>` results accept `204 No Content`.
fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| ApiError::invalid_response(response.status, e))
}
