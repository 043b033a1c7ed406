use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};
use tracing::{debug, info};

use crate::app::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    Running,
    /// The cursor ran out or the page cap was hit
    Exhausted,
    /// An error was handed to the consumer; nothing follows it
    Failed,
}

/// Single-pass, pull-based sequence of listed items.
///
/// Items come out in cursor order. After the first error or the end of the
/// data the listing stays terminated: there is no replay, start a new
/// listing to see the data again. Dropping a listing stops all further page
/// fetches.
pub struct Listing<T> {
    name: String,
    inner: BoxStream<'static, Result<T>>,
    state: ListingState,
    emitted: usize,
}

impl<T> Listing<T> {
    pub fn new<S>(name: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            inner: stream.boxed(),
            state: ListingState::Running,
            emitted: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ListingState {
        self.state
    }

    /// Number of items handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Pull the next item. `None` is the end of the listing.
    pub async fn next_item(&mut self) -> Option<Result<T>> {
        self.next().await
    }

    /// Drain the listing. Fails with the first error, discarding items
    /// pulled before it.
    pub async fn try_collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await {
            items.push(item?);
        }
        Ok(items)
    }
}

impl<T> Stream for Listing<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.state != ListingState::Running {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(item))) => {
                this.emitted += 1;
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.state = ListingState::Failed;
                info!(
                    listing = %this.name,
                    items = this.emitted,
                    "Listing failed: {}",
                    e
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.state = ListingState::Exhausted;
                info!(listing = %this.name, items = this.emitted, "Listing complete");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            ListingState::Running => (0, None),
            _ => (0, Some(0)),
        }
    }
}

impl<T> FusedStream for Listing<T> {
    fn is_terminated(&self) -> bool {
        self.state != ListingState::Running
    }
}

impl<T> Drop for Listing<T> {
    fn drop(&mut self) {
        if self.state == ListingState::Running {
            debug!(listing = %self.name, items = self.emitted, "Listing abandoned by consumer");
        }
    }
}
