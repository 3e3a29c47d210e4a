//! HTTP request descriptors and responses as plain data.
//!
//! # Design
//! `ApiClient::build_*` methods produce `HttpRequest` values without touching
//! the network, so every endpoint's method, path, query and body can be
//! asserted in unit tests. A `Transport` executes the descriptor and hands
//! back an `HttpResponse`. The descriptor also carries its retry state: the
//! `attempt` counter the retry loop increments and the opt-in flag that lets
//! non-idempotent requests be retried.

use serde::Serialize;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Methods whose repetition has no additional effect on the server.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Put | HttpMethod::Delete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<MultipartField>),
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL without the query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Number of retries already performed for this request.
    pub attempt: u32,
    /// Allow automatic retry even when the method is not idempotent.
    pub retry_opt_in: bool,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            attempt: 0,
            retry_opt_in: false,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body and the matching content-type header.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::client(format!("serialization failed: {e}")))?;
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    pub fn with_multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Some(RequestBody::Multipart(fields));
        self
    }

    /// Opt this request into automatic retry regardless of its method.
    pub fn retryable(mut self) -> Self {
        self.retry_opt_in = true;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.remove_header(name);
        self.headers.push((name.to_string(), value));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Flatten a serializable filter struct into query pairs.
///
/// Unset (`null`) fields are skipped and scalars are rendered without JSON
/// quoting, so `{"tier": "Critical", "min": 0.5}` becomes
/// `[("tier", "Critical"), ("min", "0.5")]`.
pub fn query_pairs<T: Serialize>(filters: &T) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(filters)
        .map_err(|e| ApiError::client(format!("serialization failed: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(ApiError::client("query filters must serialize to an object"));
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
