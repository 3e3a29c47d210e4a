//! Execution of `HttpRequest` descriptors.
//!
//! The client never talks to the network directly. It hands each attempt
//! to a `Transport`, which either returns the response (any status) or a
//! `TransportError` saying whether the request left the process at all.
//! `ReqwestTransport` is the production implementation; tests plug in
//! scripted transports.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartField, RequestBody};

#[derive(Debug, Error)]
pub enum TransportError {
    /// Sent, but no response arrived (connection failure, timeout).
    #[error("{0}")]
    NoResponse(String),

    /// The request could not be built or sent.
    #[error("{0}")]
    Local(String),

    /// A status line arrived but the body could not be read.
    #[error("failed to read response body: {cause}")]
    Body { status: u16, cause: String },
}

/// Executes one attempt of a request.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).execute(request)
    }
}

/// `reqwest`-backed transport with a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Local(e.to_string()))?;
        Ok(Self { client })
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        // parse_with_params leaves a dangling '?' for an empty pair list
        let parsed = if request.query.is_empty() {
            reqwest::Url::parse(&request.path)
        } else {
            reqwest::Url::parse_with_params(&request.path, &request.query)
        };
        let url = parsed
            .map_err(|e| TransportError::Local(format!("invalid URL {}: {e}", request.path)))?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Multipart(fields)) => builder.multipart(multipart_form(fields)?),
        };

        Ok(builder)
    }
}

fn multipart_form(fields: &[MultipartField]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartField::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|e| TransportError::Local(format!("invalid content type: {e}")))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let builder = self.build(request)?;
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            attempt = request.attempt,
            "sending request"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::Local(e.to_string())
            } else {
                TransportError::NoResponse(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.text().await.map_err(|e| TransportError::Body {
            status,
            cause: e.to_string(),
        })?;

        Ok(HttpResponse { status, headers, body })
    }
}
