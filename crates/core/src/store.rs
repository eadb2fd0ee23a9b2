//! Blob store facade
//!
//! [`BlobStore`] binds one bucket to a remote storage service and exposes the
//! operations a snapshot repository needs: probe, read, write, delete,
//! batched delete, listing and move. It holds no mutable state beyond the
//! bucket binding and the shared service handle, so clones can be used from
//! any number of tasks at once. Nothing is cached: every call re-queries the
//! remote service.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;

use crate::batch::{BatchDeleteCoordinator, MAX_BATCH_SIZE};
use crate::container::{BlobContainer, BlobPath};
use crate::error::{Error, Result};
use crate::listing::ObjectLister;
use crate::metadata::project;
use crate::retry::{CallExecutor, CallKind, RetryConfig};
use crate::scope::RemoteScope;
use crate::traits::{BlobMetadata, BlobStream, StorageService};

/// Blob store bound to a single bucket
#[derive(Clone)]
pub struct BlobStore {
    bucket: String,
    service: Arc<dyn StorageService>,
    executor: CallExecutor,
    scope: RemoteScope,
    page_size: usize,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("bucket", &self.bucket)
            .field("retry", self.executor.config())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl BlobStore {
    /// Bind `bucket` on `service`
    ///
    /// Fails with `Error::BucketNotFound` when the bucket does not exist. The
    /// probe is not retried.
    pub async fn open(
        bucket: impl Into<String>,
        service: Arc<dyn StorageService>,
        retry: RetryConfig,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let store = Self {
            scope: RemoteScope::new(&bucket),
            bucket,
            service,
            executor: CallExecutor::new(retry),
            page_size: MAX_BATCH_SIZE,
        };

        if !store.bucket_exists(&store.bucket).await? {
            return Err(Error::BucketNotFound(store.bucket));
        }

        Ok(store)
    }

    /// Set the listing page size, clamped to `1..=MAX_BATCH_SIZE`
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Path-scoped view onto this store
    pub fn blob_container(&self, path: BlobPath) -> BlobContainer {
        BlobContainer::new(path, self.clone())
    }

    /// Delete every blob under `path`
    pub async fn delete(&self, path: &BlobPath) -> Result<()> {
        self.delete_by_prefix(&path.build_as_string()).await
    }

    /// Release resources. The store owns no connections, so this does nothing.
    pub fn close(&self) {}

    /// Return true if the given bucket exists
    pub async fn bucket_exists(&self, name: &str) -> Result<bool> {
        tracing::debug!(bucket = name, "Checking existence of bucket");
        match self
            .scope
            .run("get_bucket", self.service.get_bucket(name))
            .await
        {
            Ok(info) => Ok(!info.id.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(Error::store(
                format!("Unable to check if bucket [{name}] exists"),
                e,
            )),
        }
    }

    /// Return true if the blob exists in the bucket
    pub async fn blob_exists(&self, name: &str) -> Result<bool> {
        tracing::debug!(blob = name, "Checking existence of blob");
        match self
            .scope
            .run("get_object", self.service.get_object(&self.bucket, name))
            .await
        {
            Ok(object) => Ok(object.has_id()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(Error::store(
                format!("Unable to check if blob [{name}] exists"),
                e,
            )),
        }
    }

    /// Open a blob for reading
    ///
    /// Network faults are retried; absence fails immediately with
    /// `Error::NotFound`.
    pub async fn read_blob(&self, name: &str) -> Result<BlobStream> {
        let (service, scope, bucket) = (&self.service, &self.scope, self.bucket.as_str());
        self.executor
            .execute(CallKind::Read, "read_blob", || {
                scope.run("get_object_media", service.get_object_media(bucket, name))
            })
            .await
    }

    /// Write `content` as `name`, replacing any existing blob of that name
    ///
    /// `length` must equal the content length; the remote service rejects a
    /// mismatch. Restarting the upload is safe because the target is named
    /// explicitly, so expired upload sessions are retried too.
    pub async fn write_blob(&self, name: &str, content: Bytes, length: u64) -> Result<()> {
        let (service, scope, bucket) = (&self.service, &self.scope, self.bucket.as_str());
        self.executor
            .execute(CallKind::Write, "write_blob", || {
                let content = content.clone();
                scope.run(
                    "insert_object",
                    service.insert_object(bucket, name, content, length),
                )
            })
            .await
    }

    /// Delete a blob; fails with `Error::NotFound` if it does not exist
    pub async fn delete_blob(&self, name: &str) -> Result<()> {
        if !self.blob_exists(name).await? {
            return Err(Error::NotFound(format!("Blob [{name}] does not exist")));
        }
        self.scope
            .run("delete_object", self.service.delete_object(&self.bucket, name))
            .await
    }

    /// Delete many blobs using batched requests
    ///
    /// A single name goes through [`delete_blob`](Self::delete_blob). Batches
    /// are not atomic: chunks processed before a failing chunk stay deleted.
    pub async fn delete_blobs(&self, names: &[String]) -> Result<()> {
        let mut seen = HashSet::with_capacity(names.len());
        let unique: Vec<String> = names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();

        match unique.as_slice() {
            [] => Ok(()),
            [name] => self.delete_blob(name).await,
            _ => {
                let chunks = BatchDeleteCoordinator::new(self.service.as_ref(), &self.scope)
                    .delete_chunks(&unique)
                    .await?;
                tracing::debug!(blobs = unique.len(), chunks, "Deleted blobs in batches");
                Ok(())
            }
        }
    }

    /// Delete every blob whose name starts with `prefix`
    pub async fn delete_by_prefix(&self, prefix: &str) -> Result<()> {
        let names: Vec<String> = self
            .list_blobs_by_path(prefix, None)
            .await?
            .into_keys()
            .collect();
        self.delete_blobs(&names).await
    }

    /// List all blobs under `path`, named relative to `path`
    pub async fn list_blobs(&self, path: &str) -> Result<BTreeMap<String, BlobMetadata>> {
        self.list_blobs_by_path(path, Some(path)).await
    }

    /// List the blobs under `path` whose relative name starts with `prefix`
    pub async fn list_blobs_by_prefix(
        &self,
        path: &str,
        prefix: &str,
    ) -> Result<BTreeMap<String, BlobMetadata>> {
        self.list_blobs_by_path(&format!("{path}{prefix}"), Some(path))
            .await
    }

    /// List all blobs whose name starts with `prefix`, removing `path_to_remove`
    /// from each name
    ///
    /// Fails with `Error::DuplicateBlob` if two objects map to the same name.
    pub async fn list_blobs_by_path(
        &self,
        prefix: &str,
        path_to_remove: Option<&str>,
    ) -> Result<BTreeMap<String, BlobMetadata>> {
        let lister = ObjectLister::new(
            self.service.clone(),
            &self.bucket,
            Some(prefix.to_string()),
            self.page_size,
        );

        self.scope
            .run("list_objects", async {
                let mut objects = pin!(lister.into_stream());
                let mut blobs = BTreeMap::new();

                while let Some(object) = objects.try_next().await? {
                    let metadata = project(&object, path_to_remove)?;
                    match blobs.entry(metadata.name.clone()) {
                        Entry::Occupied(entry) => {
                            return Err(Error::DuplicateBlob(entry.key().clone()));
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(metadata);
                        }
                    }
                }

                Ok(blobs)
            })
            .await
    }

    /// Move a blob within the bucket
    ///
    /// The service has no atomic rename: this is a server-side copy followed
    /// by a delete of the source. If the delete fails, both names exist.
    pub async fn move_blob(&self, source: &str, target: &str) -> Result<()> {
        tracing::debug!(source, target, "Moving blob");
        self.scope
            .run(
                "rewrite_object",
                self.service.rewrite_object(&self.bucket, source, target),
            )
            .await?;
        self.scope
            .run("delete_object", self.service.delete_object(&self.bucket, source))
            .await
    }
}
