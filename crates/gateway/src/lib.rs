//! Object-store gateway for silo.
//!
//! A bucket is a flat namespace: byte-string keys, whole-object get/put/
//! delete, and prefix+delimiter listing. This crate wraps those four
//! primitives behind the [`Gateway`] trait so the filesystem layer above can
//! run against the real S3 backend or the in-memory one interchangeably.
//!
//! Listing is paginated. A single [`ListPage`] is never the whole story for
//! a large prefix: callers must follow `next_marker` until `is_truncated`
//! is false before treating a listing as complete.
//!
//! No retry policy lives here. A failed call surfaces one [`GatewayError`]
//! immediately and callers do not loop on it.

use async_trait::async_trait;
use bytes::Bytes;

mod body;
mod error;
mod memory;
mod s3;

pub use body::ObjectBody;
pub use error::{BoxError, GatewayError};
pub use memory::MemoryGateway;
pub use s3::S3Gateway;

/// One page of a delimiter-bounded listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Full keys of objects directly under the listed prefix.
    pub objects: Vec<String>,
    /// Sub-prefixes grouped by the delimiter, each ending in the delimiter.
    pub common_prefixes: Vec<String>,
    /// True when more results remain past this page.
    pub is_truncated: bool,
    /// Marker to resume from; set when `is_truncated` is true.
    pub next_marker: Option<String>,
}

/// The four object-store primitives against a single fixed bucket.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch an object by exact key. `Ok(None)` means the key does not
    /// exist; errors are transport failures only.
    async fn get(&self, key: &str) -> Result<Option<(u64, ObjectBody)>, GatewayError>;

    /// Fetch one page of a delimiter-bounded listing, starting after
    /// `marker` when given.
    async fn list(
        &self,
        prefix: &str,
        delimiter: &str,
        marker: Option<String>,
    ) -> Result<ListPage, GatewayError>;

    /// Whole-object replace-or-create.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), GatewayError>;

    /// Delete by exact key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;
}
