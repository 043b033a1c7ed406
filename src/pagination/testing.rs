//! Test doubles for the pagination pipeline.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{BbError, Result};
use crate::pagination::{PageEnvelope, PageFetcher, PageRequest};

enum FakePage {
    Items(Vec<u32>, Option<String>),
    Fails,
}

/// In-memory page chain keyed by endpoint, recording every fetch.
#[derive(Default)]
pub(crate) struct FakePages {
    pages: HashMap<String, FakePage>,
    fetches: Mutex<Vec<String>>,
}

impl FakePages {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, endpoint: &str, items: &[u32], next: Option<&str>) -> Self {
        self.pages.insert(
            endpoint.to_string(),
            FakePage::Items(items.to_vec(), next.map(String::from)),
        );
        self
    }

    pub(crate) fn failing(mut self, endpoint: &str) -> Self {
        self.pages.insert(endpoint.to_string(), FakePage::Fails);
        self
    }

    pub(crate) fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    type Item = u32;

    async fn fetch(&self, request: &PageRequest) -> Result<PageEnvelope<u32>> {
        let endpoint = request.endpoint().to_string();
        self.fetches.lock().unwrap().push(endpoint.clone());

        match self.pages.get(&endpoint) {
            Some(FakePage::Items(items, next)) => Ok(PageEnvelope::new(
                items.clone(),
                next.clone().map(PageRequest::Next),
            )),
            Some(FakePage::Fails) => Err(BbError::RemoteStatus {
                endpoint,
                status: 500,
                body: "boom".into(),
            }),
            None => Err(BbError::Other(format!("unexpected fetch of {endpoint}"))),
        }
    }
}
