//! CLI command definitions and execution
//!
//! Every remote command resolves `alias/bucket[/key]`, opens a `BlobStore`
//! for the bucket through the alias endpoint and runs one store operation.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use snap_core::{AliasManager, BlobStore, ConfigManager, Defaults, RemotePath, Result};
use snap_s3::S3Service;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod alias;
mod cat;
mod completions;
mod exists;
mod ls;
mod mv;
mod put;
mod rm;

/// snap - snapshot blob store client
///
/// Reads, writes, lists and deletes snapshot blobs kept in buckets of
/// S3-compatible storage services.
#[derive(Parser, Debug)]
#[command(name = "snap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storage service aliases
    #[command(subcommand)]
    Alias(alias::AliasCommands),

    /// List blobs under a path or name prefix
    Ls(ls::LsArgs),

    /// Write a blob to stdout
    Cat(cat::CatArgs),

    /// Upload a local file as a blob
    Put(put::PutArgs),

    /// Remove blobs
    Rm(rm::RmArgs),

    /// Move a blob within its bucket
    Mv(mv::MvArgs),

    /// Check whether a blob exists
    Exists(exists::ExistsArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let formatter = Formatter::new(output_config(&cli));

    match cli.command {
        Commands::Alias(cmd) => alias::execute(cmd, &formatter),
        Commands::Ls(args) => ls::execute(args, &formatter).await,
        Commands::Cat(args) => cat::execute(args, &formatter).await,
        Commands::Put(args) => put::execute(args, &formatter).await,
        Commands::Rm(args) => rm::execute(args, &formatter).await,
        Commands::Mv(args) => mv::execute(args, &formatter).await,
        Commands::Exists(args) => exists::execute(args, &formatter).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Merge the global flags over the configured output defaults
fn output_config(cli: &Cli) -> OutputConfig {
    let defaults = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config.defaults,
        Err(e) => {
            tracing::debug!(error = %e, "Using built-in output defaults");
            Defaults::default()
        }
    };

    let mut config = OutputConfig::from_defaults(&defaults);
    config.json |= cli.json;
    config.no_color |= cli.no_color;
    config.no_progress |= cli.no_progress;
    config.quiet |= cli.quiet;
    config
}

/// Open the blob store for the bucket named by `path`
pub(crate) async fn open_store(path: &RemotePath) -> Result<BlobStore> {
    let config_manager = ConfigManager::new()?;
    let page_size = config_manager.load()?.defaults.list_page_size;
    let alias = AliasManager::with_config_manager(config_manager).get(&path.alias)?;
    alias.validate()?;

    tracing::debug!(
        alias = %alias.name,
        endpoint = %alias.endpoint,
        bucket = %path.bucket,
        "Opening blob store"
    );
    let service = S3Service::new(&alias).await?;
    let store = BlobStore::open(&path.bucket, Arc::new(service), alias.retry_config()).await?;
    Ok(store.with_page_size(page_size))
}

/// Parse a path or report a usage error
pub(crate) fn parse_path(
    path: &str,
    formatter: &Formatter,
) -> std::result::Result<RemotePath, ExitCode> {
    snap_core::parse_remote_path(path).map_err(|e| formatter.fail("Invalid path", &e))
}

/// Parse a path that must name a single blob
pub(crate) fn parse_blob_path(
    path: &str,
    formatter: &Formatter,
) -> std::result::Result<RemotePath, ExitCode> {
    let parsed = parse_path(path, formatter)?;
    match parsed.require_key() {
        Ok(_) => Ok(parsed),
        Err(e) => Err(formatter.fail("Invalid path", &e)),
    }
}
