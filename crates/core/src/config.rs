//! Configuration file
//!
//! `config.toml` lives in `$SNAP_CONFIG_DIR`, or in `snap/` under the
//! platform configuration directory. It holds the aliases and the defaults
//! the CLI applies before its own flags.
//!
//! Changing `schema_version` requires a migration step in
//! [`ConfigManager::migrate`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alias::Alias;
use crate::batch::MAX_BATCH_SIZE;
use crate::error::{Error, Result};

pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SNAP_CONFIG_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub aliases: Vec<Alias>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            aliases: Vec::new(),
        }
    }
}

impl Config {
    /// Reject settings the store cannot honor
    pub fn validate(&self) -> Result<()> {
        let page_size = self.defaults.list_page_size;
        if page_size == 0 || page_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "list_page_size must be between 1 and {MAX_BATCH_SIZE}, got {page_size}"
            )));
        }
        Ok(())
    }
}

/// Defaults applied by the CLI unless overridden by flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub output: OutputFormat,

    pub color: ColorMode,

    /// Show progress spinners
    pub progress: bool,

    /// Objects requested per listing page
    pub list_page_size: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: OutputFormat::Human,
            color: ColorMode::Auto,
            progress: true,
            list_page_size: MAX_BATCH_SIZE,
        }
    }
}

/// Loads and saves `config.toml`
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Resolve the configuration path from the environment
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .map(|dir| dir.join("snap"))
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?,
        };
        Ok(Self::with_path(dir.join("config.toml")))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Read the file; a missing file yields the default configuration
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };

        let config: Config = toml::from_str(&content)?;
        let config = match config.schema_version {
            v if v < SCHEMA_VERSION => Self::migrate(config),
            SCHEMA_VERSION => config,
            v => {
                return Err(Error::Config(format!(
                    "Configuration file version {v} is newer than supported version \
                     {SCHEMA_VERSION}. Please upgrade snap."
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the file with owner-only permissions, creating parent directories
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml::to_string_pretty(config)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.config_path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Load, apply `change`, and save only if `change` succeeded
    pub fn update<T>(&self, change: impl FnOnce(&mut Config) -> Result<T>) -> Result<T> {
        let mut config = self.load()?;
        let value = change(&mut config)?;
        self.save(&config)?;
        Ok(value)
    }

    fn migrate(mut config: Config) -> Config {
        // Version 0 predates schema tracking and has the same fields.
        config.schema_version = SCHEMA_VERSION;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (ConfigManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.toml"));
        (manager, dir)
    }

    fn write(manager: &ConfigManager, content: &str) {
        std::fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();
        std::fs::write(manager.config_path(), content).unwrap();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _dir) = manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.defaults.list_page_size, 999);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_partial_defaults_section() {
        let (manager, _dir) = manager();
        write(
            &manager,
            "schema_version = 1\n\n[defaults]\noutput = \"json\"\ncolor = \"never\"\n",
        );

        let defaults = manager.load().unwrap().defaults;
        assert_eq!(defaults.output, OutputFormat::Json);
        assert_eq!(defaults.color, ColorMode::Never);
        assert!(defaults.progress);
        assert_eq!(defaults.list_page_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_update_persists_aliases() {
        let (manager, _dir) = manager();
        manager
            .update(|config| {
                config
                    .aliases
                    .push(Alias::new("local", "http://localhost:9000", "a", "b"));
                Ok(())
            })
            .unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.aliases.len(), 1);
        assert_eq!(loaded.aliases[0].name, "local");
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let (manager, _dir) = manager();
        let result: Result<()> = manager.update(|config| {
            config.defaults.progress = false;
            Err(Error::General("abort".into()))
        });
        assert!(result.is_err());
        assert!(!manager.config_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, _dir) = manager();
        manager.save(&Config::default()).unwrap();
        let mode = std::fs::metadata(manager.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_schema_zero_is_migrated() {
        let (manager, _dir) = manager();
        write(&manager, "schema_version = 0\n");
        assert_eq!(manager.load().unwrap().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let (manager, _dir) = manager();
        write(&manager, &format!("schema_version = {}\n", SCHEMA_VERSION + 1));
        let err = manager.load().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_page_size_out_of_range() {
        let (manager, _dir) = manager();
        write(&manager, "schema_version = 1\n\n[defaults]\nlist_page_size = 5000\n");
        assert!(matches!(manager.load(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.defaults.list_page_size = 0;
        assert!(manager.save(&config).is_err());
    }
}
