//! snap-core: Core library for the snapstore blob store
//!
//! This crate provides the blob store used by snapshot repositories:
//! - `BlobStore` facade bound to one bucket, and path-scoped `BlobContainer`s
//! - Retry executor for transient remote failures
//! - Paginated object listing and metadata projection
//! - Batched deletion with per-member outcome tracking
//! - Configuration, alias management and path parsing for the CLI
//!
//! The remote service sits behind the `StorageService` trait, so the crate is
//! independent of any SDK. `MemoryStorage` implements it in process memory.

pub mod alias;
pub mod batch;
pub mod config;
pub mod container;
pub mod error;
pub mod listing;
pub mod memory;
pub mod metadata;
pub mod path;
pub mod retry;
pub mod scope;
pub mod store;
pub mod traits;

pub use alias::{Alias, AliasManager, BucketLookup, TimeoutConfig};
pub use batch::{BatchTracker, CountDown, MAX_BATCH_SIZE};
pub use config::{ColorMode, Config, ConfigManager, Defaults, OutputFormat};
pub use container::{BlobContainer, BlobPath};
pub use error::{Error, Result};
pub use listing::ObjectLister;
pub use memory::MemoryStorage;
pub use path::{RemotePath, parse_remote_path};
pub use retry::{CallExecutor, CallKind, RetryConfig};
pub use scope::RemoteScope;
pub use store::BlobStore;
pub use traits::{
    BlobMetadata, BlobStream, BucketInfo, ListRequest, ListingPage, RemoteObject, StorageService,
};
