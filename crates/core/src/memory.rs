//! In-memory storage service
//!
//! A `StorageService` that keeps buckets in process memory. It honors the
//! same contracts as a remote service (absence as `NotFound`, paged listing
//! with continuation tokens, per-member batch outcomes) and supports fault
//! injection and call counting, which makes it the backend of choice for
//! tests of anything built on the blob store.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::batch::BatchTracker;
use crate::error::{Error, Result};
use crate::traits::{BlobStream, BucketInfo, ListRequest, ListingPage, RemoteObject, StorageService};

/// Remote operations, used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetBucket,
    GetObject,
    GetMedia,
    Insert,
    Delete,
    DeleteBatch,
    Rewrite,
    List,
}

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub get_bucket_calls: usize,
    pub get_object_calls: usize,
    pub media_calls: usize,
    pub insert_calls: usize,
    pub delete_calls: usize,
    pub batch_calls: usize,
    pub rewrite_calls: usize,
    pub list_calls: usize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    generation: u64,
    updated: jiff::Timestamp,
}

#[derive(Default)]
struct Inner {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    faults: HashMap<Operation, VecDeque<Error>>,
    failing_members: HashSet<String>,
    stats: CallStats,
    generation: u64,
}

impl Inner {
    /// Count the call and pop an injected fault, if any
    fn enter(&mut self, op: Operation) -> Result<()> {
        let stats = &mut self.stats;
        match op {
            Operation::GetBucket => stats.get_bucket_calls += 1,
            Operation::GetObject => stats.get_object_calls += 1,
            Operation::GetMedia => stats.media_calls += 1,
            Operation::Insert => stats.insert_calls += 1,
            Operation::Delete => stats.delete_calls += 1,
            Operation::DeleteBatch => stats.batch_calls += 1,
            Operation::Rewrite => stats.rewrite_calls += 1,
            Operation::List => stats.list_calls += 1,
        }

        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn bucket(&self, bucket: &str) -> Result<&BTreeMap<String, StoredObject>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(format!("bucket [{bucket}]")))
    }

    fn bucket_mut(&mut self, bucket: &str) -> Result<&mut BTreeMap<String, StoredObject>> {
        self.buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(format!("bucket [{bucket}]")))
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Storage service backed by process memory
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with one empty bucket
    pub fn with_bucket(bucket: &str) -> Self {
        let storage = Self::new();
        storage.create_bucket(bucket);
        storage
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the state from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.lock().buckets.entry(bucket.to_string()).or_default();
    }

    /// Store an object directly, bypassing fault injection and counters
    pub fn put(&self, bucket: &str, name: &str, data: impl Into<Bytes>) {
        let mut inner = self.lock();
        let generation = inner.next_generation();
        inner.buckets.entry(bucket.to_string()).or_default().insert(
            name.to_string(),
            StoredObject {
                data: data.into(),
                generation,
                updated: jiff::Timestamp::now(),
            },
        );
    }

    pub fn contains(&self, bucket: &str, name: &str) -> bool {
        self.lock()
            .buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(name))
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.lock().buckets.get(bucket).map_or(0, BTreeMap::len)
    }

    pub fn stats(&self) -> CallStats {
        self.lock().stats
    }

    /// Make the next call of `op` fail with `error`; queued faults fire in order
    pub fn fail_next(&self, op: Operation, error: Error) {
        self.lock().faults.entry(op).or_default().push_back(error);
    }

    /// Make batched deletes report a failure for `name`
    pub fn fail_batch_member(&self, name: &str) {
        self.lock().failing_members.insert(name.to_string());
    }

    fn describe(name: &str, object: &StoredObject) -> RemoteObject {
        RemoteObject {
            id: Some(format!("{name}/{}", object.generation)),
            name: name.to_string(),
            size: Some(object.data.len() as i64),
            etag: Some(object.generation.to_string()),
            updated: Some(object.updated),
        }
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn get_bucket(&self, bucket: &str) -> Result<BucketInfo> {
        let mut inner = self.lock();
        inner.enter(Operation::GetBucket)?;
        inner.bucket(bucket)?;
        Ok(BucketInfo {
            id: format!("memory:{bucket}"),
            name: bucket.to_string(),
        })
    }

    async fn get_object(&self, bucket: &str, name: &str) -> Result<RemoteObject> {
        let mut inner = self.lock();
        inner.enter(Operation::GetObject)?;
        inner
            .bucket(bucket)?
            .get(name)
            .map(|object| Self::describe(name, object))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn get_object_media(&self, bucket: &str, name: &str) -> Result<BlobStream> {
        let mut inner = self.lock();
        inner.enter(Operation::GetMedia)?;
        let data = inner
            .bucket(bucket)?
            .get(name)
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn insert_object(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        length: u64,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Operation::Insert)?;
        if content.len() as u64 != length {
            return Err(Error::General(format!(
                "declared length {length} does not match {} bytes of content for [{name}]",
                content.len()
            )));
        }
        let generation = inner.next_generation();
        inner.bucket_mut(bucket)?.insert(
            name.to_string(),
            StoredObject {
                data: content,
                generation,
                updated: jiff::Timestamp::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Operation::Delete)?;
        inner
            .bucket_mut(bucket)?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn delete_batch(
        &self,
        bucket: &str,
        names: &[String],
        tracker: &BatchTracker,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Operation::DeleteBatch)?;
        let failing = inner.failing_members.clone();
        let objects = inner.bucket_mut(bucket)?;

        for name in names {
            if failing.contains(name) {
                tracker.on_failure(name, "injected failure");
            } else if objects.remove(name).is_some() {
                tracker.on_success(name);
            } else {
                tracker.on_failure(name, "Not Found");
            }
        }
        Ok(())
    }

    async fn rewrite_object(&self, bucket: &str, source: &str, target: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.enter(Operation::Rewrite)?;
        let data = inner
            .bucket(bucket)?
            .get(source)
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::NotFound(source.to_string()))?;
        let generation = inner.next_generation();
        inner.bucket_mut(bucket)?.insert(
            target.to_string(),
            StoredObject {
                data,
                generation,
                updated: jiff::Timestamp::now(),
            },
        );
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, request: ListRequest) -> Result<ListingPage> {
        let mut inner = self.lock();
        inner.enter(Operation::List)?;
        let objects = inner.bucket(bucket)?;
        let prefix = request.prefix.as_deref().unwrap_or("");
        let page_size = request.page_size.max(1);

        let mut matching = objects
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .filter(|(name, _)| {
                request
                    .page_token
                    .as_deref()
                    .is_none_or(|token| name.as_str() > token)
            });

        let items: Vec<RemoteObject> = matching
            .by_ref()
            .take(page_size)
            .map(|(name, object)| Self::describe(name, object))
            .collect();

        let next_page_token = match (matching.next(), items.last()) {
            (Some(_), Some(last)) => Some(last.name.clone()),
            _ => None,
        };

        Ok(ListingPage {
            items,
            next_page_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_and_read_back() {
        let storage = MemoryStorage::with_bucket("snapshots");
        storage
            .insert_object("snapshots", "a", Bytes::from_static(b"hello"), 5)
            .await
            .unwrap();

        let mut stream = storage.get_object_media("snapshots", "a").await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");

        let meta = storage.get_object("snapshots", "a").await.unwrap();
        assert_eq!(meta.size, Some(5));
        assert!(meta.has_id());
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let storage = MemoryStorage::with_bucket("snapshots");
        let result = storage
            .insert_object("snapshots", "a", Bytes::from_static(b"hello"), 4)
            .await;
        assert!(result.is_err());
        assert!(!storage.contains("snapshots", "a"));
    }

    #[tokio::test]
    async fn test_missing_bucket_and_object() {
        let storage = MemoryStorage::new();
        assert!(storage.get_bucket("nope").await.unwrap_err().is_not_found());

        storage.create_bucket("snapshots");
        assert!(
            storage
                .get_object("snapshots", "nope")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_injected_faults_fire_in_order() {
        let storage = MemoryStorage::with_bucket("snapshots");
        storage.fail_next(Operation::GetBucket, Error::Network("reset".into()));

        assert!(matches!(
            storage.get_bucket("snapshots").await,
            Err(Error::Network(_))
        ));
        assert!(storage.get_bucket("snapshots").await.is_ok());
        assert_eq!(storage.stats().get_bucket_calls, 2);
    }

    #[tokio::test]
    async fn test_list_pages() {
        let storage = MemoryStorage::with_bucket("snapshots");
        for name in ["a", "b", "c"] {
            storage.put("snapshots", name, Bytes::from_static(b"x"));
        }

        let first = storage
            .list_objects(
                "snapshots",
                ListRequest {
                    page_size: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("b"));

        let second = storage
            .list_objects(
                "snapshots",
                ListRequest {
                    page_size: 2,
                    page_token: first.next_page_token,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_page_token.is_none());
    }
}
