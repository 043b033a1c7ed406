use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::app::{BbError, Result};
use crate::config::EnrichmentFailure;

/// Outcome of the secondary fetch for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment<S> {
    /// The listing ran without enrichment, or the item needed none
    NotRequested,
    Present(S),
    /// The secondary fetch succeeded but returned nothing
    Empty,
    /// The secondary fetch failed; carries the reason
    Unavailable(String),
}

impl<S> Default for Enrichment<S> {
    fn default() -> Self {
        Self::NotRequested
    }
}

impl<S> Enrichment<S> {
    pub fn value(&self) -> Option<&S> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Secondary, per-item fetch.
///
/// `request` decides (without I/O) whether an item needs a fetch at all;
/// items for which it returns `None` pass through untouched. `fetch` returns
/// `Ok(None)` when the remote has no data for the item.
#[async_trait]
pub trait Enricher<T>: Send + Sync + 'static {
    type Request: Send + 'static;
    type Data: Send + 'static;

    fn request(&self, item: &T) -> Option<Self::Request>;

    async fn fetch(&self, request: Self::Request) -> Result<Option<Self::Data>>;

    /// Produce the enriched item.
    fn attach(&self, item: T, outcome: Enrichment<Self::Data>) -> T;
}

/// Enriches a stream of pages with bounded concurrency, preserving order.
///
/// Each fetch runs on its own task and holds a permit from a semaphore
/// shared by every stream this stage produces. Results are handed back in
/// input order through an ordered buffer as wide as the worker count. The
/// buffer only reads ahead within the page being consumed: the next page is
/// not requested until the consumer has pulled every item of this one.
pub struct EnrichmentStage<E> {
    enricher: Arc<E>,
    semaphore: Arc<Semaphore>,
    window: usize,
    on_failure: EnrichmentFailure,
}

impl<E> EnrichmentStage<E> {
    pub fn with_workers(enricher: E, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            enricher: Arc::new(enricher),
            semaphore: Arc::new(Semaphore::new(workers)),
            window: workers,
            on_failure: EnrichmentFailure::default(),
        }
    }

    pub fn on_failure(mut self, policy: EnrichmentFailure) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn apply<T, P>(&self, pages: P) -> impl Stream<Item = Result<T>> + Send + 'static
    where
        E: Enricher<T>,
        T: Send + 'static,
        P: Stream<Item = Result<Vec<T>>> + Send + 'static,
    {
        let enricher = self.enricher.clone();
        let semaphore = self.semaphore.clone();
        let on_failure = self.on_failure;
        let window = self.window;

        pages.flat_map(move |page| match page {
            Ok(items) => {
                let enricher = enricher.clone();
                let semaphore = semaphore.clone();
                stream::iter(items)
                    .map(move |item| enrich_one(enricher.clone(), semaphore.clone(), on_failure, item))
                    .buffered(window)
                    .left_stream()
            }
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        })
    }
}

async fn enrich_one<T, E>(
    enricher: Arc<E>,
    semaphore: Arc<Semaphore>,
    on_failure: EnrichmentFailure,
    item: T,
) -> Result<T>
where
    E: Enricher<T>,
    T: Send + 'static,
{
    let Some(request) = enricher.request(&item) else {
        return Ok(item);
    };

    // Detached on drop: a fetch already started runs to completion and its
    // result is discarded.
    let task = {
        let enricher = enricher.clone();
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| BbError::Other("Enrichment pool closed".into()))?;
            enricher.fetch(request).await
        })
    };

    let outcome = match task.await {
        Ok(Ok(Some(data))) => Enrichment::Present(data),
        Ok(Ok(None)) => {
            debug!("Enrichment returned no data");
            Enrichment::Empty
        }
        Ok(Err(e)) => unavailable(e, on_failure)?,
        Err(e) => unavailable(
            BbError::Other(format!("Enrichment task failed: {e}")),
            on_failure,
        )?,
    };

    Ok(enricher.attach(item, outcome))
}

fn unavailable<D>(error: BbError, on_failure: EnrichmentFailure) -> Result<Enrichment<D>> {
    match on_failure {
        EnrichmentFailure::Mark => {
            warn!("Enrichment failed, continuing without it: {}", error);
            Ok(Enrichment::Unavailable(error.to_string()))
        }
        EnrichmentFailure::Propagate => Err(error),
    }
}
