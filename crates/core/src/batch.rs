//! Batched deletion
//!
//! Names are partitioned into chunks within the service's per-request
//! operation ceiling. Each chunk is one round trip; the service reports every
//! member's outcome to a [`BatchTracker`], possibly from several threads at
//! once, and the chunk succeeds only if the tracker's countdown reaches zero.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::scope::RemoteScope;
use crate::traits::StorageService;

/// Batch requests are limited to 1000 operations; stay one below
pub const MAX_BATCH_SIZE: usize = 999;

/// Thread-safe countdown that saturates at zero
#[derive(Debug)]
pub struct CountDown {
    remaining: AtomicUsize,
}

impl CountDown {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
        }
    }

    /// Decrement by one; returns true only for the call that reaches zero
    pub fn count_down(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|previous| previous == 1)
            .unwrap_or(false)
    }

    pub fn is_counted_down(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

/// Completion tracker for one batched request
#[derive(Debug)]
pub struct BatchTracker {
    bucket: String,
    size: usize,
    countdown: CountDown,
}

impl BatchTracker {
    pub fn new(bucket: impl Into<String>, size: usize) -> Self {
        Self {
            bucket: bucket.into(),
            size,
            countdown: CountDown::new(size),
        }
    }

    /// Record a successful member deletion
    pub fn on_success(&self, name: &str) {
        if self.countdown.count_down() {
            tracing::debug!(
                blob = name,
                bucket = %self.bucket,
                size = self.size,
                "batch fully deleted"
            );
        }
    }

    /// Record a failed member deletion. Does not count down.
    pub fn on_failure(&self, name: &str, reason: &str) {
        tracing::error!(
            blob = name,
            bucket = %self.bucket,
            reason,
            "failed to delete blob"
        );
    }

    /// Number of members in the batch
    pub fn size(&self) -> usize {
        self.size
    }

    /// Members that have not reported success
    pub fn outstanding(&self) -> usize {
        self.countdown.remaining()
    }

    pub fn is_complete(&self) -> bool {
        self.countdown.is_counted_down()
    }
}

/// Issues chunked batch deletes against one bucket
pub struct BatchDeleteCoordinator<'a> {
    service: &'a dyn StorageService,
    scope: &'a RemoteScope,
}

impl<'a> BatchDeleteCoordinator<'a> {
    pub fn new(service: &'a dyn StorageService, scope: &'a RemoteScope) -> Self {
        Self { service, scope }
    }

    /// Delete `names` in sequential chunks of at most `MAX_BATCH_SIZE`
    ///
    /// The first chunk with a shortfall aborts the remaining chunks and
    /// reports how many of its deletions failed. Chunks already processed
    /// stay deleted.
    pub async fn delete_chunks(&self, names: &[String]) -> Result<usize> {
        let bucket = self.scope.bucket();
        let mut chunks = 0;

        for chunk in names.chunks(MAX_BATCH_SIZE) {
            chunks += 1;
            let tracker = BatchTracker::new(bucket, chunk.len());

            tracing::debug!(bucket, chunk = chunks, size = chunk.len(), "Submitting delete batch");
            self.scope
                .run("delete_batch", self.service.delete_batch(bucket, chunk, &tracker))
                .await?;

            if !tracker.is_complete() {
                return Err(Error::PartialBatch {
                    failed: tracker.outstanding(),
                    total: tracker.size(),
                });
            }
        }

        Ok(chunks)
    }
}
