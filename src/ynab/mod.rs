//! YNAB budgeting service integration
//!
//! The target side of the sync: the `RecordSink` capability and the HTTP
//! client that implements it against the YNAB v1 API.

/// HTTP client for the transactions endpoint
mod client;
/// Wire types for the transactions endpoint
mod types;

pub use client::{RecordSink, YnabClient, YNAB_BASE_URL};
pub use types::*;
