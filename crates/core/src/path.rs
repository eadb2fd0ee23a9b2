//! Remote path parsing
//!
//! Command-line locations have the format `alias/bucket[/key]`. The alias
//! names a configured endpoint, the bucket is bound to a blob store and the
//! key is a blob name (or a name prefix when it ends with `/`).

use crate::error::{Error, Result};

/// A parsed remote path pointing to a blob or prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Alias name
    pub alias: String,
    /// Bucket name
    pub bucket: String,
    /// Blob name or prefix (empty for bucket root)
    pub key: String,
}

impl RemotePath {
    pub fn new(
        alias: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether the key names a prefix rather than a single blob
    pub fn is_prefix(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }

    /// Fail unless the path names a single blob
    pub fn require_key(&self) -> Result<&str> {
        if self.is_prefix() {
            return Err(Error::InvalidPath(format!(
                "'{self}' does not name a blob. Expected: alias/bucket/key"
            )));
        }
        Ok(&self.key)
    }

    /// Get the full path as a string (alias/bucket/key)
    pub fn to_full_path(&self) -> String {
        if self.key.is_empty() {
            format!("{}/{}", self.alias, self.bucket)
        } else {
            format!("{}/{}/{}", self.alias, self.bucket, self.key)
        }
    }

    /// Whether two paths live in the same bucket of the same endpoint
    pub fn same_bucket(&self, other: &RemotePath) -> bool {
        self.alias == other.alias && self.bucket == other.bucket
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Parse `alias/bucket[/key]`
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let parts: Vec<&str> = path.splitn(3, '/').collect();
    if parts.len() < 2 {
        return Err(Error::InvalidPath(format!(
            "Path '{path}' is incomplete. Use format: alias/bucket[/key]"
        )));
    }

    let alias = parts[0];
    if !is_valid_alias_name(alias) {
        return Err(Error::InvalidPath(format!("Invalid alias name: '{alias}'")));
    }

    let bucket = parts[1];
    if bucket.is_empty() {
        return Err(Error::InvalidPath("Bucket name cannot be empty".into()));
    }

    let key = parts.get(2).copied().unwrap_or_default();
    Ok(RemotePath::new(alias, bucket, key))
}

/// Check if a string is a valid alias name
pub fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
