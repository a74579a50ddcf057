//! Remote data gateway: the relational data API the offline layer writes to.

mod query;
mod supabase;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub use query::{Condition, Filter, FilterOp, Order, Query};
pub use supabase::{normalize_rest_url, SupabaseGateway};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Data API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Gateway call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether retrying the same call later could plausibly succeed.
    ///
    /// Validation and permission rejections are not transient; the queue still
    /// retries them until the attempt limit moves them to the dead-letter list.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            Self::InvalidConfiguration(_) | Self::Json(_) | Self::InvalidResponse(_) => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Minimal contract of the remote relational data API.
///
/// `insert` and `update` return the affected row as the server stored it
/// (`Value::Null` when the server returned nothing); `delete` returns
/// `Value::Null`.
#[allow(async_fn_in_trait)]
pub trait RemoteGateway: Clone + Send + Sync + 'static {
    async fn insert(&self, table: &str, record: &Value) -> GatewayResult<Value>;

    async fn update(&self, table: &str, id: &str, changes: &Value) -> GatewayResult<Value>;

    async fn delete(&self, table: &str, id: &str) -> GatewayResult<Value>;

    async fn select(&self, query: &Query) -> GatewayResult<Vec<Value>>;
}
