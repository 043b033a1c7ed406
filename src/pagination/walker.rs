use std::sync::Arc;

use futures::future;
use futures::stream::{self, FusedStream, StreamExt};
use tracing::{debug, warn};

use crate::app::Result;
use crate::pagination::{PageFetcher, PageRequest};

/// Turns a cursor-yielding API into one continuous, lazy item stream.
///
/// Nothing is fetched until the stream is polled, and a page is only fetched
/// once every item of the previous one has been pulled. Dropping the stream
/// abandons the remaining pages.
pub struct CursorWalker<F> {
    fetcher: Arc<F>,
    page_cap: Option<usize>,
}

impl<F> CursorWalker<F>
where
    F: PageFetcher + Send + Sync + 'static,
    F::Item: Send + 'static,
{
    pub fn new(fetcher: F) -> Self {
        Self::shared(Arc::new(fetcher))
    }

    pub fn shared(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            page_cap: None,
        }
    }

    /// Stop after `cap` pages even if the cursor continues.
    pub fn with_page_cap(mut self, cap: Option<usize>) -> Self {
        self.page_cap = cap;
        self
    }

    /// Items of every page, in cursor order.
    pub fn walk(self, initial: PageRequest) -> impl FusedStream<Item = Result<F::Item>> + Send + 'static {
        self.walk_pages(initial).flat_map(|page| match page {
            Ok(items) => stream::iter(items.into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        })
    }

    /// One element per fetched page. The next page is fetched only when this
    /// stream is polled again.
    pub fn walk_pages(
        self,
        initial: PageRequest,
    ) -> impl FusedStream<Item = Result<Vec<F::Item>>> + Send + 'static {
        let state = StreamState {
            fetcher: self.fetcher,
            current: Some(initial),
            pages_consumed: 0,
            page_cap: self.page_cap,
            exhausted: false,
        };

        stream::unfold(state, |mut state| async move {
            let page = state.next_page().await;
            page.map(|page| (page, state))
        })
        .fuse()
    }
}

/// Per-walk state, owned by exactly one stream.
struct StreamState<F> {
    fetcher: Arc<F>,
    current: Option<PageRequest>,
    pages_consumed: usize,
    page_cap: Option<usize>,
    exhausted: bool,
}

impl<F> StreamState<F>
where
    F: PageFetcher + Send + Sync,
    F::Item: Send,
{
    async fn next_page(&mut self) -> Option<Result<Vec<F::Item>>> {
        if self.exhausted {
            return None;
        }

        if self.page_cap.is_some_and(|cap| self.pages_consumed >= cap) {
            debug!(pages = self.pages_consumed, "Page cap reached");
            self.exhausted = true;
            return None;
        }

        let Some(request) = self.current.take() else {
            debug!(pages = self.pages_consumed, "Cursor exhausted");
            self.exhausted = true;
            return None;
        };

        match self.fetcher.fetch(&request).await {
            Ok(envelope) => {
                self.pages_consumed += 1;
                self.current = envelope.next;
                Some(Ok(envelope.items))
            }
            Err(e) => {
                warn!(
                    endpoint = request.endpoint(),
                    page = self.pages_consumed + 1,
                    "Page fetch failed: {}",
                    e
                );
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}
