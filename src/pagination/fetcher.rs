use async_trait::async_trait;

use crate::api::ApiClient;
use crate::app::{BbError, Result};
use crate::pagination::{PageEnvelope, PageRequest};

/// Performs exactly one round-trip per call and decodes one page.
#[async_trait]
pub trait PageFetcher {
    type Item;

    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<Self::Item>>;
}

/// Decodes a provider's page envelope.
///
/// This is where provider quirks live (field names, how the continuation is
/// expressed, which origin prefix to strip) so that the walker only ever
/// sees [`PageRequest`]s.
pub trait PageFormat {
    type Item;

    fn decode(&self, request: &PageRequest, body: &[u8])
        -> serde_json::Result<PageEnvelope<Self::Item>>;
}

/// A [`PageFetcher`] over a REST endpoint.
pub struct RestPageFetcher<F> {
    client: ApiClient,
    format: F,
}

impl<F> RestPageFetcher<F> {
    pub fn new(client: ApiClient, format: F) -> Self {
        Self { client, format }
    }
}

#[async_trait]
impl<F> PageFetcher for RestPageFetcher<F>
where
    F: PageFormat + Send + Sync,
    F::Item: Send,
{
    type Item = F::Item;

    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<F::Item>> {
        let body = self.client.get(request.endpoint()).await?;

        let envelope = self
            .format
            .decode(request, &body)
            .map_err(|e| BbError::decode(self.client.url(request.endpoint()), e))?;

        tracing::debug!(
            endpoint = request.endpoint(),
            items = envelope.items.len(),
            has_next = envelope.next.is_some(),
            "Fetched page"
        );

        Ok(envelope)
    }
}
