//! Per-provider clients.
//!
//! Each provider gets a [`PageFormat`](crate::pagination::PageFormat) for its
//! page envelope, a client whose list operations return
//! [`Listing`](crate::pagination::Listing)s, and the enrichers those
//! listings can run.

pub mod bitbucket;
pub mod client;
pub mod jira;
pub mod tempo;

use url::form_urlencoded;

use crate::config::{EnrichmentFailure, FetchConfig, DEFAULT_ENRICH_WORKERS};
use crate::pagination::EnrichmentStage;

pub use bitbucket::BitbucketClient;
pub use client::ApiClient;
pub use jira::JiraClient;
pub use tempo::TempoClient;

/// How listings run their per-item fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    pub workers: usize,
    pub on_failure: EnrichmentFailure,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_ENRICH_WORKERS,
            on_failure: EnrichmentFailure::default(),
        }
    }
}

impl From<&FetchConfig> for EnrichOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            workers: config.enrich_workers,
            on_failure: config.enrichment_failure,
        }
    }
}

impl EnrichOptions {
    pub fn stage<E>(&self, enricher: E) -> EnrichmentStage<E> {
        EnrichmentStage::with_workers(enricher, self.workers).on_failure(self.on_failure)
    }
}

/// Percent-encode one query parameter value.
pub(crate) fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Quote a user-supplied string for a Bitbucket or Jira query language.
pub(crate) fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
