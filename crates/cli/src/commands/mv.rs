//! mv command - Move a blob within its bucket
//!
//! The move is a server-side copy followed by a delete of the source. If the
//! delete fails both names exist afterwards.

use clap::Args;
use serde::Serialize;

use super::{open_store, parse_blob_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Move a blob
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Source blob path (alias/bucket/key)
    pub source: String,

    /// Target blob path in the same alias and bucket
    pub target: String,
}

#[derive(Debug, Serialize)]
struct MvOutput {
    status: &'static str,
    source: String,
    target: String,
}

/// Execute the mv command
pub async fn execute(args: MvArgs, formatter: &Formatter) -> ExitCode {
    let source = match parse_blob_path(&args.source, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };
    let target = match parse_blob_path(&args.target, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };

    if !source.same_bucket(&target) {
        formatter.error("Source and target must be in the same alias and bucket");
        return ExitCode::UsageError;
    }

    let store = match open_store(&source).await {
        Ok(store) => store,
        Err(e) => return formatter.fail("Failed to open bucket", &e),
    };

    if let Err(e) = store.move_blob(&source.key, &target.key).await {
        return formatter.fail(&format!("Failed to move {source}"), &e);
    }

    if formatter.is_json() {
        formatter.json(&MvOutput {
            status: "success",
            source: source.to_full_path(),
            target: target.to_full_path(),
        });
    } else {
        formatter.success(&format!("{source} -> {target}"));
    }
    ExitCode::Success
}
