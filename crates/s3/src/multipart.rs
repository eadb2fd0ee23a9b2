//! Multipart upload support
//!
//! Large blobs are written as a multipart upload: create, upload every part,
//! complete. Any failure aborts the upload so no parts are left behind; the
//! caller restarts the whole write from the first byte.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;

use snap_core::{Error, Result};

use crate::client::classify;

/// Default part size: 64 MiB
pub const DEFAULT_PART_SIZE: u64 = 64 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Multipart upload configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Part size in bytes
    pub part_size: u64,

    /// Blobs of at least this many bytes use a multipart upload
    pub threshold: u64,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            threshold: DEFAULT_PART_SIZE,
        }
    }
}

impl MultipartConfig {
    /// Calculate appropriate part size for a blob
    pub fn calculate_part_size(&self, blob_size: u64) -> u64 {
        if blob_size <= MIN_PART_SIZE {
            return MIN_PART_SIZE;
        }

        let parts = blob_size.div_ceil(self.part_size);

        if parts <= MAX_PARTS as u64 {
            self.part_size
        } else {
            // Need larger parts to fit within 10,000 limit
            let required_size = blob_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for a blob
pub fn calculate_parts(blob_size: u64, part_size: u64) -> usize {
    blob_size.div_ceil(part_size) as usize
}

/// Get byte range for a part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

/// Upload `content` as `key` using a multipart upload
pub(crate) async fn upload(
    client: &aws_sdk_s3::Client,
    config: &MultipartConfig,
    bucket: &str,
    key: &str,
    content: Bytes,
) -> Result<()> {
    let created = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| classify(e, &format!("CreateMultipartUpload [{key}]")))?;

    let upload_id = created
        .upload_id()
        .ok_or_else(|| Error::General(format!("No upload id returned for [{key}]")))?
        .to_string();

    match upload_parts(client, config, bucket, key, &upload_id, content).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(key, upload_id, "Aborting multipart upload");
            if let Err(abort) = client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(
                    key,
                    upload_id,
                    error = %classify(abort, "AbortMultipartUpload"),
                    "Failed to abort multipart upload"
                );
            }
            Err(e)
        }
    }
}

async fn upload_parts(
    client: &aws_sdk_s3::Client,
    config: &MultipartConfig,
    bucket: &str,
    key: &str,
    upload_id: &str,
    content: Bytes,
) -> Result<()> {
    let total_size = content.len() as u64;
    let part_size = config.calculate_part_size(total_size);
    let part_count = calculate_parts(total_size, part_size);
    let mut completed = Vec::with_capacity(part_count);

    for part_number in 1..=part_count as i32 {
        let (start, end) = part_byte_range(part_number, part_size, total_size);
        let body = content.slice(start as usize..end as usize);

        let response = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length((end - start) as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(e, &format!("UploadPart [{key}] #{part_number}")))?;

        tracing::debug!(key, part_number, part_count, "Uploaded part");
        completed.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(response.e_tag().map(str::to_string))
                .build(),
        );
    }

    client
        .complete_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .multipart_upload(
            CompletedMultipartUpload::builder()
                .set_parts(Some(completed))
                .build(),
        )
        .send()
        .await
        .map_err(|e| classify(e, &format!("CompleteMultipartUpload [{key}]")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MultipartConfig::default();
        assert_eq!(config.part_size, DEFAULT_PART_SIZE);
        assert_eq!(config.threshold, DEFAULT_PART_SIZE);
    }

    #[test]
    fn test_calculate_part_size_small_blob() {
        let config = MultipartConfig::default();
        assert_eq!(config.calculate_part_size(1024 * 1024), MIN_PART_SIZE);
    }

    #[test]
    fn test_calculate_part_size_large_blob() {
        let config = MultipartConfig::default();
        let huge = DEFAULT_PART_SIZE * 20_000;
        let size = config.calculate_part_size(huge);
        assert!(calculate_parts(huge, size) <= MAX_PARTS);
    }

    #[test]
    fn test_part_ranges_cover_blob() {
        let total = 250;
        let parts = calculate_parts(total, 100);
        assert_eq!(parts, 3);

        let ranges: Vec<_> = (1..=parts as i32)
            .map(|n| part_byte_range(n, 100, total))
            .collect();
        assert_eq!(ranges, vec![(0, 100), (100, 200), (200, 250)]);
    }
}
