//! Paginated object listing
//!
//! A listing is a pull-based traversal with explicit cursor state. Each
//! lister owns its own cursor; a fresh lister re-queries from the start.

use std::sync::Arc;

use futures::{Stream, TryStreamExt, stream};

use crate::batch::MAX_BATCH_SIZE;
use crate::error::{Error, Result};
use crate::traits::{ListRequest, RemoteObject, StorageService};

/// Position of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazy lister over the objects of a bucket under a prefix
pub struct ObjectLister {
    service: Arc<dyn StorageService>,
    bucket: String,
    prefix: Option<String>,
    page_size: usize,
    cursor: Cursor,
    pages_fetched: usize,
}

impl ObjectLister {
    /// Create a lister; the page size is clamped to `1..=MAX_BATCH_SIZE`
    pub fn new(
        service: Arc<dyn StorageService>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        page_size: usize,
    ) -> Self {
        Self {
            service,
            bucket: bucket.into(),
            prefix: prefix.filter(|p| !p.is_empty()),
            page_size: page_size.clamp(1, MAX_BATCH_SIZE),
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages requested from the service so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page; `None` once the listing is complete
    pub async fn next_page(&mut self) -> Result<Option<Vec<RemoteObject>>> {
        let page_token = match &self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
        };

        let request = ListRequest {
            prefix: self.prefix.clone(),
            page_size: self.page_size,
            page_token,
        };

        self.pages_fetched += 1;
        let page = match self.service.list_objects(&self.bucket, request).await {
            Ok(page) => page,
            Err(e) => {
                self.cursor = Cursor::Done;
                return Err(Error::store("Exception while listing objects", e));
            }
        };

        tracing::debug!(
            bucket = %self.bucket,
            page = self.pages_fetched,
            items = page.items.len(),
            "Fetched listing page"
        );

        if page.items.is_empty() {
            self.cursor = Cursor::Done;
            return Ok(None);
        }

        self.cursor = match page.next_page_token {
            Some(token) if !token.is_empty() => Cursor::Next(token),
            _ => Cursor::Done,
        };

        Ok(Some(page.items))
    }

    /// Turn the lister into a stream of objects, fetching pages on demand
    pub fn into_stream(self) -> impl Stream<Item = Result<RemoteObject>> + Send {
        stream::try_unfold(self, |mut lister| async move {
            let page = lister.next_page().await?;
            Ok::<_, Error>(page.map(|page| (page, lister)))
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
    }
}
