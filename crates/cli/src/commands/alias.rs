//! Alias management commands
//!
//! Aliases name the S3-compatible endpoints that hold snapshot buckets,
//! together with credentials and the retry policy for transient failures.

use clap::Subcommand;
use serde::Serialize;
use snap_core::{Alias, AliasManager, BucketLookup, RetryConfig};

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Endpoints that `alias/bucket/key` paths resolve through
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add an alias, or replace the one with the same name
    Set(SetArgs),

    /// Show configured aliases, sorted by name
    List(ListArgs),

    /// Forget an alias
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "local", "backup")
    pub name: String,

    /// S3 endpoint URL (e.g., "http://localhost:9000")
    pub endpoint: String,

    pub access_key: String,

    pub secret_key: String,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: BucketLookup,

    /// Attempts per blob read or write, the first one included
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Initial retry backoff in milliseconds (0 retries immediately)
    #[arg(long)]
    pub retry_backoff_ms: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show region, lookup style and retry policy
    #[arg(short, long)]
    pub long: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub name: String,
}

#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<AliasInfo>,
}

/// Alias information for JSON output (without credentials)
#[derive(Serialize)]
struct AliasInfo {
    name: String,
    endpoint: String,
    region: String,
    bucket_lookup: String,
    max_attempts: u32,
}

impl From<&Alias> for AliasInfo {
    fn from(alias: &Alias) -> Self {
        Self {
            name: alias.name.clone(),
            endpoint: alias.endpoint.clone(),
            region: alias.region.clone(),
            bucket_lookup: alias.bucket_lookup.to_string(),
            max_attempts: alias.retry_config().max_attempts,
        }
    }
}

#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

pub fn execute(cmd: AliasCommands, formatter: &Formatter) -> ExitCode {
    let manager = match AliasManager::new() {
        Ok(manager) => manager,
        Err(e) => return formatter.fail("Failed to load configuration", &e),
    };

    match cmd {
        AliasCommands::Set(args) => execute_set(args, &manager, formatter),
        AliasCommands::List(args) => execute_list(args, &manager, formatter),
        AliasCommands::Remove(args) => execute_remove(args, &manager, formatter),
    }
}

fn build_alias(args: SetArgs) -> Alias {
    let alias = Alias::new(args.name, args.endpoint, args.access_key, args.secret_key)
        .with_region(args.region)
        .with_bucket_lookup(args.bucket_lookup);

    if args.max_attempts.is_none() && args.retry_backoff_ms.is_none() {
        return alias;
    }
    let defaults = RetryConfig::default();
    alias.with_retry(RetryConfig {
        max_attempts: args.max_attempts.unwrap_or(defaults.max_attempts),
        initial_backoff_ms: args.retry_backoff_ms.unwrap_or(defaults.initial_backoff_ms),
        ..defaults
    })
}

fn execute_set(args: SetArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let alias = build_alias(args);
    let name = alias.name.clone();

    match manager.set(alias) {
        Ok(()) => {
            let message = format!("Alias '{name}' configured successfully");
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to set alias", &e),
    }
}

fn execute_list(args: ListArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let aliases = match manager.list() {
        Ok(aliases) => aliases,
        Err(e) => return formatter.fail("Failed to list aliases", &e),
    };

    if formatter.is_json() {
        formatter.json(&AliasListOutput {
            aliases: aliases.iter().map(AliasInfo::from).collect(),
        });
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else {
        for alias in &aliases {
            if args.long {
                let retry = alias.retry_config();
                formatter.println(&format!(
                    "{:<12} {} (region: {}, lookup: {}, attempts: {})",
                    alias.name,
                    alias.endpoint,
                    alias.region,
                    alias.bucket_lookup,
                    retry.max_attempts
                ));
            } else {
                formatter.println(&format!("{:<12} {}", alias.name, alias.endpoint));
            }
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Alias '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to remove alias", &e),
    }
}
