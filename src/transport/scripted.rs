//! In-memory transport for tests: canned responses keyed by URL, with a
//! log of every request seen.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::app::{BbError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

enum Reply {
    Respond(u16, String),
    Fail(String),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<String, (Reply, Option<Duration>)>>,
    calls: Mutex<Vec<String>>,
    methods: Mutex<Vec<Method>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.insert(url, Reply::Respond(status, body.to_string()), None)
    }

    pub(crate) fn respond_after(self, url: &str, delay: Duration, body: &str) -> Self {
        self.insert(url, Reply::Respond(200, body.to_string()), Some(delay))
    }

    pub(crate) fn fail(self, url: &str, message: &str) -> Self {
        self.insert(url, Reply::Fail(message.to_string()), None)
    }

    fn insert(self, url: &str, reply: Reply, delay: Option<Duration>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), (reply, delay));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn methods(&self) -> Vec<Method> {
        self.methods.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(request.url.clone());
        self.methods.lock().unwrap().push(request.method.clone());

        let (reply, delay) = {
            let replies = self.replies.lock().unwrap();
            match replies.get(&request.url) {
                Some((Reply::Respond(status, body), delay)) => {
                    (Ok((*status, body.clone())), *delay)
                }
                Some((Reply::Fail(message), delay)) => (Err(message.clone()), *delay),
                None => (Ok((404, format!("no script for {}", request.url))), None),
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Ok((status, body)) => Ok(HttpResponse {
                status,
                body: body.into_bytes(),
            }),
            Err(message) => Err(BbError::transport(request.url, message)),
        }
    }
}
