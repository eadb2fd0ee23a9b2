//! put command - Upload a local file as a blob
//!
//! The file is read fully and written with its exact length, replacing any
//! blob of the same name.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use serde::Serialize;

use super::{open_store, parse_blob_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};

/// Upload a local file as a blob
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Target blob path (alias/bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

/// Execute the put command
pub async fn execute(args: PutArgs, formatter: &Formatter) -> ExitCode {
    let path = match parse_blob_path(&args.path, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let content = match tokio::fs::read(&args.file).await {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            return formatter.fail(
                &format!("Failed to read {}", args.file.display()),
                &snap_core::Error::from(e),
            );
        }
    };
    let length = content.len() as u64;

    let store = match open_store(&path).await {
        Ok(store) => store,
        Err(e) => return formatter.fail("Failed to open bucket", &e),
    };

    let size_human = humansize::format_size(length, humansize::BINARY);
    let progress = ProgressBar::spinner(
        formatter.config(),
        &format!("Uploading {} ({size_human})", args.file.display()),
    );
    let result = store.write_blob(&path.key, content, length).await;
    progress.finish_and_clear();

    if let Err(e) = result {
        return formatter.fail(&format!("Failed to write {path}"), &e);
    }

    if formatter.is_json() {
        formatter.json(&PutOutput {
            status: "success",
            source: args.file.display().to_string(),
            target: path.to_full_path(),
            size_bytes: length,
            size_human,
        });
    } else {
        formatter.success(&format!(
            "{} -> {path} ({size_human})",
            args.file.display()
        ));
    }
    ExitCode::Success
}
