//! Ghost Content API access.
//!
//! [`GhostClient`] performs GETs against `{base}/ghost/api/{version}/content/...`
//! and absorbs transient faults with a bounded [`RetryPolicy`]. It returns raw
//! JSON; shaping the payload is left to the cache.

mod client;
mod error;
mod retry;

pub use client::{ContentApi, GhostClient, redact_key};
pub use error::{ConfigError, ContentApiError};
pub use retry::{RETRYABLE_STATUSES, RetryPolicy, is_retryable_status};
