//! Named endpoints holding snapshot buckets
//!
//! An alias carries what is needed to reach one S3-compatible service:
//! endpoint, credentials, region, addressing style, and the retry and
//! timeout policy the blob store runs with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};
use crate::path::is_valid_alias_name;
use crate::retry::RetryConfig;

/// How bucket names are placed in request URLs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketLookup {
    /// Path style unless the service insists otherwise
    #[default]
    Auto,
    /// `https://host/bucket/key`
    Path,
    /// `https://bucket.host/key`
    Dns,
}

impl FromStr for BucketLookup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "path" => Ok(Self::Path),
            "dns" => Ok(Self::Dns),
            other => Err(Error::Config(format!(
                "Bucket lookup must be 'auto', 'path', or 'dns', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BucketLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Path => "path",
            Self::Dns => "dns",
        })
    }
}

/// Connect and read timeouts, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub read_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            read_ms: 30_000,
        }
    }
}

const DEFAULT_REGION: &str = "us-east-1";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,

    pub endpoint: String,

    pub access_key: String,

    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub bucket_lookup: BucketLookup,

    /// Retry policy override; `None` means [`RetryConfig::default`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

impl Alias {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            bucket_lookup: BucketLookup::default(),
            retry: None,
            timeout: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_bucket_lookup(mut self, lookup: BucketLookup) -> Self {
        self.bucket_lookup = lookup;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Check the name, the endpoint URL and any retry override
    pub fn validate(&self) -> Result<()> {
        if !is_valid_alias_name(&self.name) {
            return Err(Error::Config(format!(
                "Invalid alias name '{}': use letters, digits, '-' or '_'",
                self.name
            )));
        }

        let url = url::Url::parse(&self.endpoint)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }

        match &self.retry {
            Some(retry) => retry.validate(),
            None => Ok(()),
        }
    }

    pub fn path_style(&self) -> bool {
        self.bucket_lookup != BucketLookup::Dns
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }
}

/// Alias CRUD over the configuration file
pub struct AliasManager {
    config_manager: ConfigManager,
}

impl AliasManager {
    pub fn new() -> Result<Self> {
        Ok(Self::with_config_manager(ConfigManager::new()?))
    }

    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// All aliases, sorted by name
    pub fn list(&self) -> Result<Vec<Alias>> {
        let mut aliases = self.config_manager.load()?.aliases;
        aliases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(aliases)
    }

    pub fn get(&self, name: &str) -> Result<Alias> {
        self.config_manager
            .load()?
            .aliases
            .into_iter()
            .find(|alias| alias.name == name)
            .ok_or_else(|| Error::AliasNotFound(name.to_string()))
    }

    /// Add an alias, replacing one of the same name
    pub fn set(&self, alias: Alias) -> Result<()> {
        alias.validate()?;
        self.config_manager.update(|config| {
            config.aliases.retain(|existing| existing.name != alias.name);
            config.aliases.push(alias);
            Ok(())
        })
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.config_manager.update(|config| {
            let position = config
                .aliases
                .iter()
                .position(|alias| alias.name == name)
                .ok_or_else(|| Error::AliasNotFound(name.to_string()))?;
            config.aliases.remove(position);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (AliasManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::with_path(dir.path().join("config.toml"));
        (AliasManager::with_config_manager(config_manager), dir)
    }

    #[test]
    fn test_new_alias_defaults() {
        let alias = Alias::new("local", "http://localhost:9000", "access", "secret");
        assert_eq!(alias.region, "us-east-1");
        assert_eq!(alias.bucket_lookup, BucketLookup::Auto);
        assert!(alias.path_style());
        assert_eq!(alias.retry_config().max_attempts, 3);
        assert_eq!(alias.timeout_config(), TimeoutConfig::default());
    }

    #[test]
    fn test_bucket_lookup_parse_and_display() {
        for text in ["auto", "path", "dns"] {
            assert_eq!(text.parse::<BucketLookup>().unwrap().to_string(), text);
        }
        assert!("virtual".parse::<BucketLookup>().is_err());
        assert!(!Alias::new("x", "http://h", "a", "b")
            .with_bucket_lookup(BucketLookup::Dns)
            .path_style());
    }

    #[test]
    fn test_validate() {
        assert!(Alias::new("ok", "https://s3.example.com", "a", "b").validate().is_ok());
        assert!(Alias::new("bad name", "http://localhost", "a", "b").validate().is_err());
        assert!(matches!(
            Alias::new("x", "not a url", "a", "b").validate(),
            Err(Error::InvalidUrl(_))
        ));
        assert!(Alias::new("x", "ftp://host", "a", "b").validate().is_err());

        let zero_attempts = Alias::new("x", "http://localhost", "a", "b").with_retry(RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert!(zero_attempts.validate().is_err());
    }

    #[test]
    fn test_oversized_backoff_from_file_is_rejected() {
        let alias: Alias = toml::from_str(
            r#"
            name = "local"
            endpoint = "http://localhost:9000"
            access_key = "a"
            secret_key = "b"

            [retry]
            initial_backoff_ms = 9223372036854775807
            "#,
        )
        .unwrap();

        assert_eq!(alias.retry_config().max_attempts, 3);
        assert!(matches!(alias.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_set_replaces_and_lists_sorted() {
        let (manager, _dir) = manager();
        manager.set(Alias::new("b", "http://b:9000", "b", "b")).unwrap();
        manager.set(Alias::new("a", "http://a:9000", "a", "a")).unwrap();
        manager
            .set(Alias::new("b", "http://b2:9000", "b", "b").with_region("eu-west-1"))
            .unwrap();

        let aliases = manager.list().unwrap();
        let names: Vec<_> = aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(aliases[1].endpoint, "http://b2:9000");
        assert_eq!(aliases[1].region, "eu-west-1");
    }

    #[test]
    fn test_remove() {
        let (manager, _dir) = manager();
        manager
            .set(Alias::new("local", "http://localhost:9000", "a", "b"))
            .unwrap();
        manager.remove("local").unwrap();
        assert!(matches!(manager.get("local"), Err(Error::AliasNotFound(_))));
        assert!(matches!(manager.remove("local"), Err(Error::AliasNotFound(_))));
    }

    #[test]
    fn test_retry_policy_persists() {
        let (manager, _dir) = manager();
        let alias = Alias::new("local", "http://localhost:9000", "a", "b")
            .with_bucket_lookup(BucketLookup::Path)
            .with_retry(RetryConfig {
                max_attempts: 5,
                initial_backoff_ms: 0,
                max_backoff_ms: 0,
            });
        manager.set(alias).unwrap();

        let loaded = manager.get("local").unwrap();
        assert_eq!(loaded.bucket_lookup, BucketLookup::Path);
        assert_eq!(loaded.retry_config().max_attempts, 5);
        assert_eq!(loaded.retry_config().initial_backoff_ms, 0);
    }
}
