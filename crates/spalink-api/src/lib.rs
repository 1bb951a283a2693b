//! # spalink-api
//!
//! HTTP client for the Gizwits cloud API the spa controller lives behind.
//!
//! Covers the four exchanges the bridge needs: account login, device
//! binding lookup, telemetry fetch, and control dispatch. Every call is
//! bounded by a short request timeout so a stalled network call cannot
//! block the poll loop or the command relay.

pub mod client;
pub mod endpoints;

pub use client::{ApiClient, ApiClientConfig, ApiError, Session, DEFAULT_TIMEOUT};
pub use endpoints::Endpoints;
