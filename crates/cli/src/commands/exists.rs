//! exists command - Check whether a blob exists
//!
//! Exits 0 when the blob exists and 5 (not found) when it does not, so it
//! can drive shell conditionals.

use clap::Args;
use serde::Serialize;

use super::{open_store, parse_blob_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Check whether a blob exists
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Blob path (alias/bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ExistsOutput {
    path: String,
    exists: bool,
}

/// Execute the exists command
pub async fn execute(args: ExistsArgs, formatter: &Formatter) -> ExitCode {
    let path = match parse_blob_path(&args.path, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let store = match open_store(&path).await {
        Ok(store) => store,
        Err(e) => return formatter.fail("Failed to open bucket", &e),
    };

    let exists = match store.blob_exists(&path.key).await {
        Ok(exists) => exists,
        Err(e) => return formatter.fail(&format!("Failed to check {path}"), &e),
    };

    if formatter.is_json() {
        formatter.json(&ExistsOutput {
            path: path.to_full_path(),
            exists,
        });
    } else if exists {
        formatter.println(&format!("{path} exists"));
    } else {
        formatter.println(&format!("{path} does not exist"));
    }

    exit_code_for(exists)
}

fn exit_code_for(exists: bool) -> ExitCode {
    if exists {
        ExitCode::Success
    } else {
        ExitCode::NotFound
    }
}
