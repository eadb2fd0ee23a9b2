//! StorageService trait definition
//!
//! This trait is the seam between the blob store and the remote bucket
//! service. It allows the store logic to be decoupled from any specific SDK,
//! and is implemented by the S3 adapter and by the in-memory service.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::batch::BatchTracker;
use crate::error::Result;

/// Streaming body of a blob
pub type BlobStream = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata for a blob, as handed to callers of list operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Blob name, relative to the path that was stripped
    pub name: String,

    /// Size in bytes
    pub size_in_bytes: i64,
}

impl BlobMetadata {
    pub fn new(name: impl Into<String>, size_in_bytes: i64) -> Self {
        Self {
            name: name.into(),
            size_in_bytes,
        }
    }
}

/// Bucket record returned by the bucket probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketInfo {
    /// Service-assigned identifier; empty means the record is unusable
    pub id: String,

    /// Bucket name
    pub name: String,
}

/// Object descriptor returned by the remote service per listed or fetched object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteObject {
    /// Service-assigned identifier
    pub id: Option<String>,

    /// Full object name within the bucket
    pub name: String,

    /// Size in bytes, if the service reported one
    pub size: Option<i64>,

    /// ETag or generation marker
    pub etag: Option<String>,

    /// Last update timestamp
    pub updated: Option<jiff::Timestamp>,
}

impl RemoteObject {
    /// Create a descriptor with a name and size
    pub fn new(name: impl Into<String>, size: i64) -> Self {
        let name = name.into();
        Self {
            id: Some(name.clone()),
            name,
            size: Some(size),
            etag: None,
            updated: None,
        }
    }

    /// True when the service returned a non-empty identifier
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// One page request of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only objects whose name starts with this prefix
    pub prefix: Option<String>,

    /// Maximum number of objects in the page
    pub page_size: usize,

    /// Continuation token returned by the previous page
    pub page_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Objects in this page
    pub items: Vec<RemoteObject>,

    /// Token for the next page, None when the listing is complete
    pub next_page_token: Option<String>,
}

/// Remote bucket service used by the blob store
///
/// Absence is always reported as `Error::NotFound`; an expired resumable
/// upload session as `Error::SessionExpired`; transport faults as
/// `Error::Network`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Fetch the bucket record
    async fn get_bucket(&self, bucket: &str) -> Result<BucketInfo>;

    /// Fetch object metadata (no content)
    async fn get_object(&self, bucket: &str, name: &str) -> Result<RemoteObject>;

    /// Open the object content as a stream
    async fn get_object_media(&self, bucket: &str, name: &str) -> Result<BlobStream>;

    /// Create or replace the named object with exactly `length` bytes
    async fn insert_object(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        length: u64,
    ) -> Result<()>;

    /// Delete a single object
    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()>;

    /// Delete many objects in one round trip, reporting each outcome to `tracker`
    ///
    /// The returned error covers the round trip itself. Per-object failures
    /// are only reported through the tracker.
    async fn delete_batch(
        &self,
        bucket: &str,
        names: &[String],
        tracker: &BatchTracker,
    ) -> Result<()>;

    /// Server-side copy of `source` onto `target` within the bucket
    async fn rewrite_object(&self, bucket: &str, source: &str, target: &str) -> Result<()>;

    /// Fetch one page of objects
    async fn list_objects(&self, bucket: &str, request: ListRequest) -> Result<ListingPage>;
}
