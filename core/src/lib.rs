//! Client core for the CaaS (Cleanliness-as-a-Service) platform API.
//!
//! # Overview
//! Every endpoint is split into a pure `build_*` step that produces an
//! [`HttpRequest`] and an async call that runs it through a [`Transport`].
//! The transport is the only place that touches the network, so the
//! request shapes, retry timing and error normalization are all testable
//! without a server.
//!
//! # Layers
//! - [`ApiClient`] owns the base URL, the [`RetryPolicy`] and the bearer
//!   token source. Failed requests are retried on transient statuses with
//!   exponential backoff; every failure comes back as an [`ApiError`].
//! - [`fetch`] holds the [`Query`] / [`Mutation`] state machines that track
//!   loading, data and error for one logical call.
//! - [`Queries`] and [`Mutations`] bind one query or mutation to each
//!   endpoint. Collection queries mirror their results into the shared
//!   [`AppStore`].
//! - DTOs are defined independently from the mock-server crate; the
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod credentials;
mod endpoints;
pub mod error;
pub mod fetch;
pub mod http;
pub mod mutations;
pub mod queries;
pub mod retry;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use credentials::{FileTokenStore, MemoryTokenStore, NoToken, TokenStore, AUTH_TOKEN_KEY};
pub use error::{failure_message, ApiError};
pub use fetch::{fetcher, FetchStatus, Mutation, Query};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mutations::Mutations;
pub use queries::Queries;
pub use retry::RetryPolicy;
pub use store::AppStore;
pub use transport::{ReqwestTransport, Transport, TransportError};
