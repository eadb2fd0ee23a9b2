//! cat command - Write a blob to stdout
//!
//! The blob is streamed, never buffered whole, so binary and large blobs
//! are fine.

use clap::Args;
use tokio::io::AsyncWriteExt;

use super::{open_store, parse_blob_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Write a blob to stdout
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Blob path (alias/bucket/key)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, formatter: &Formatter) -> ExitCode {
    let path = match parse_blob_path(&args.path, formatter) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let store = match open_store(&path).await {
        Ok(store) => store,
        Err(e) => return formatter.fail("Failed to open bucket", &e),
    };

    let mut blob = match store.read_blob(&path.key).await {
        Ok(blob) => blob,
        Err(e) => return formatter.fail(&format!("Failed to read {path}"), &e),
    };

    let mut stdout = tokio::io::stdout();
    let copied = async {
        tokio::io::copy(&mut blob, &mut stdout).await?;
        stdout.flush().await
    }
    .await;

    match copied {
        Ok(()) => ExitCode::Success,
        Err(e) => formatter.fail(&format!("Failed to stream {path}"), &snap_core::Error::from(e)),
    }
}
