//! Folio content cache.
//!
//! Sits between request handlers and the CMS:
//!
//! - **Store**: an LRU bounded by entry count whose entries expire a fixed
//!   time after insertion, but stay readable as a fallback.
//! - **Content**: the only path to the CMS. Memoizes the post collection and
//!   individual pages and degrades to stale or empty results on failure.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! ttl_seconds = 3600
//! capacity = 100
//! ```

mod config;
mod content;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use content::{CacheStatus, CachedContent, ContentCache};
pub use keys::ContentKey;
pub use store::{Held, TtlLruStore};
