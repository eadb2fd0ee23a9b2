//! snap-s3: S3 SDK adapter for snapstore
//!
//! This crate implements the `StorageService` trait using the aws-sdk-s3
//! crate. It is the only crate that directly depends on the AWS SDK.

pub mod client;
pub mod multipart;

pub use client::S3Service;
pub use multipart::MultipartConfig;
