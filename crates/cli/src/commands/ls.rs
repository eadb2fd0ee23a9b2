//! ls command - List blobs
//!
//! `alias/bucket/dir/` lists every blob under `dir/`; `alias/bucket/dir/index-`
//! lists the blobs under `dir/` whose name starts with `index-`. Names are
//! shown relative to `dir/`.

use clap::Args;
use serde::Serialize;
use snap_core::BlobMetadata;

use super::{open_store, parse_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List blobs
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (alias/bucket[/dir/][name-prefix])
    pub path: String,

    /// Show totals after the listing
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    path: String,
    items: Vec<BlobMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_blobs: usize,
    total_size_bytes: i64,
    total_size_human: String,
}

impl Summary {
    fn of(items: &[BlobMetadata]) -> Self {
        let total_size_bytes: i64 = items.iter().map(|b| b.size_in_bytes).sum();
        Self {
            total_blobs: items.len(),
            total_size_bytes,
            total_size_human: humansize::format_size(
                total_size_bytes.max(0) as u64,
                humansize::BINARY,
            ),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, formatter: &Formatter) -> ExitCode {
    let path = match parse_path(&args.path, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let store = match open_store(&path).await {
        Ok(store) => store,
        Err(e) => return formatter.fail("Failed to open bucket", &e),
    };

    let (dir, prefix) = split_prefix(&path.key);
    let items: Vec<BlobMetadata> = match store.list_blobs_by_prefix(dir, prefix).await {
        Ok(blobs) => blobs.into_values().collect(),
        Err(e) => return formatter.fail("Failed to list blobs", &e),
    };

    let summary = args.summarize.then(|| Summary::of(&items));

    if formatter.is_json() {
        formatter.json(&LsOutput {
            path: path.to_full_path(),
            items,
            summary,
        });
    } else {
        for blob in &items {
            let size = humansize::format_size(blob.size_in_bytes.max(0) as u64, humansize::BINARY);
            formatter.println(&format!("{size:>10} {}", blob.name));
        }
        if let Some(summary) = summary {
            formatter.println(&format!(
                "\nTotal: {} blobs, {}",
                summary.total_blobs, summary.total_size_human
            ));
        }
    }

    ExitCode::Success
}

/// Split a key into the directory part (up to the last `/`) and a name prefix
fn split_prefix(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(index) => key.split_at(index + 1),
        None => ("", key),
    }
}
