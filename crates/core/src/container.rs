//! Path-scoped blob containers
//!
//! A snapshot repository addresses blobs relative to a directory-like path
//! (`indices/<id>/0/`). [`BlobContainer`] prefixes every name with its path
//! and delegates to the [`BlobStore`] it was created from.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::Result;
use crate::store::BlobStore;
use crate::traits::{BlobMetadata, BlobStream};

/// Directory-like location made of path components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobPath {
    parts: Vec<String>,
}

impl BlobPath {
    /// The root path
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path; empty components are ignored
    pub fn parse(path: &str) -> Self {
        Self {
            parts: path
                .split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// A new path with `part` appended
    pub fn add(&self, part: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(part.into());
        Self { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The parent path, or `None` at the root
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.parts.split_last()?;
        Some(Self {
            parts: rest.to_vec(),
        })
    }

    /// Key prefix for this path: every component followed by `/`
    pub fn build_as_string(&self) -> String {
        self.parts.iter().map(|part| format!("{part}/")).collect()
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.build_as_string())
    }
}

/// Blob store view rooted at a [`BlobPath`]
#[derive(Debug, Clone)]
pub struct BlobContainer {
    path: BlobPath,
    prefix: String,
    store: BlobStore,
}

impl BlobContainer {
    pub(crate) fn new(path: BlobPath, store: BlobStore) -> Self {
        Self {
            prefix: path.build_as_string(),
            path,
            store,
        }
    }

    pub fn path(&self) -> &BlobPath {
        &self.path
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    pub async fn blob_exists(&self, name: &str) -> Result<bool> {
        self.store.blob_exists(&self.key(name)).await
    }

    pub async fn read_blob(&self, name: &str) -> Result<BlobStream> {
        self.store.read_blob(&self.key(name)).await
    }

    pub async fn write_blob(&self, name: &str, content: Bytes, length: u64) -> Result<()> {
        self.store.write_blob(&self.key(name), content, length).await
    }

    pub async fn delete_blob(&self, name: &str) -> Result<()> {
        self.store.delete_blob(&self.key(name)).await
    }

    pub async fn delete_blobs(&self, names: &[String]) -> Result<()> {
        let keys: Vec<String> = names.iter().map(|name| self.key(name)).collect();
        self.store.delete_blobs(&keys).await
    }

    /// Blobs under this path, named relative to it
    pub async fn list_blobs(&self) -> Result<BTreeMap<String, BlobMetadata>> {
        self.store.list_blobs(&self.prefix).await
    }

    pub async fn list_blobs_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, BlobMetadata>> {
        self.store.list_blobs_by_prefix(&self.prefix, prefix).await
    }

    pub async fn move_blob(&self, source: &str, target: &str) -> Result<()> {
        self.store
            .move_blob(&self.key(source), &self.key(target))
            .await
    }

    /// Delete this path and everything below it
    pub async fn delete(&self) -> Result<()> {
        self.store.delete(&self.path).await
    }
}
