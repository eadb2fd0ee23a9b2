//! rm command - Remove blobs
//!
//! Blob paths are grouped by alias and bucket. A single blob is deleted
//! directly; several blobs of one bucket go out as batched deletes of at
//! most 999 names each. `--recursive` deletes everything under a prefix.

use std::collections::BTreeMap;

use clap::Args;
use serde::Serialize;
use snap_core::{BlobStore, Error, RemotePath};

use super::{open_store, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};

/// Remove blobs
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Blob path(s) to remove (alias/bucket/key, or alias/bucket/prefix with --recursive)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove every blob whose name starts with the given prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Ignore blobs that do not exist
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    prefixes: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, formatter: &Formatter) -> ExitCode {
    let mut parsed = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        match parse_path(path, formatter) {
            Ok(path) if path.is_prefix() && !args.recursive => {
                formatter.error(&format!(
                    "'{path}' is a prefix, use --recursive to remove everything under it"
                ));
                return ExitCode::UsageError;
            }
            Ok(path) => parsed.push(path),
            Err(code) => return code,
        }
    }

    let mut removed = Vec::new();
    let mut prefixes = Vec::new();

    for ((alias, bucket), keys) in group_by_bucket(parsed) {
        let location = RemotePath::new(&alias, &bucket, "");
        let store = match open_store(&location).await {
            Ok(store) => store,
            Err(e) => return formatter.fail(&format!("Failed to open {location}"), &e),
        };

        let result = if args.recursive {
            remove_prefixes(&store, &keys, formatter).await
        } else {
            remove_blobs(&store, keys, args.force, formatter).await
        };

        match result {
            Ok(done) if args.recursive => {
                prefixes.extend(done.into_iter().map(|k| format!("{location}/{k}")));
            }
            Ok(done) => removed.extend(done.into_iter().map(|k| format!("{location}/{k}"))),
            Err(e) => return formatter.fail(&format!("Failed to remove blobs from {location}"), &e),
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: "success",
            total: removed.len(),
            removed,
            prefixes,
        });
    } else {
        for path in &removed {
            formatter.println(&format!("Removed: {path}"));
        }
        for prefix in &prefixes {
            formatter.println(&format!("Removed everything under: {prefix}"));
        }
        if !removed.is_empty() {
            formatter.success(&format!("Removed {} blob(s).", removed.len()));
        }
    }

    ExitCode::Success
}

/// Group keys by (alias, bucket), keeping first-seen key order per bucket
fn group_by_bucket(paths: Vec<RemotePath>) -> BTreeMap<(String, String), Vec<String>> {
    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for path in paths {
        let keys = groups.entry((path.alias, path.bucket)).or_default();
        if !keys.contains(&path.key) {
            keys.push(path.key);
        }
    }
    groups
}

async fn remove_prefixes(
    store: &BlobStore,
    prefixes: &[String],
    formatter: &Formatter,
) -> Result<Vec<String>, Error> {
    let progress = ProgressBar::spinner(formatter.config(), "Removing blobs");
    for prefix in prefixes {
        progress.set_message(&format!("Removing blobs under '{prefix}'"));
        if let Err(e) = store.delete_by_prefix(prefix).await {
            progress.finish_and_clear();
            return Err(e);
        }
    }
    progress.finish_and_clear();
    Ok(prefixes.to_vec())
}

async fn remove_blobs(
    store: &BlobStore,
    keys: Vec<String>,
    force: bool,
    formatter: &Formatter,
) -> Result<Vec<String>, Error> {
    if let [key] = keys.as_slice() {
        return match store.delete_blob(key).await {
            Ok(()) => Ok(keys),
            Err(e) if force && e.is_not_found() => {
                formatter.warning(&format!("Skipped missing blob '{key}'"));
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        };
    }

    let keys = if force {
        let mut present = Vec::with_capacity(keys.len());
        for key in keys {
            if store.blob_exists(&key).await? {
                present.push(key);
            } else {
                formatter.warning(&format!("Skipped missing blob '{key}'"));
            }
        }
        present
    } else {
        keys
    };

    let progress = ProgressBar::spinner(
        formatter.config(),
        &format!("Removing {} blobs", keys.len()),
    );
    let result = store.delete_blobs(&keys).await;
    progress.finish_and_clear();
    result.map(|()| keys)
}
