//! Scripted transport
//!
//! Replays canned responses in order and records every request it was
//! given. Lets the forge wire shapes be exercised without a network.

use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use repotable_core::{Error, Result};
use std::collections::VecDeque;

/// Transport double that answers from a queue
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport failure (no response)
    pub fn fail(self, reason: impl Into<String>) -> Self {
        self.responses.lock().push_back(Err(Error::Transport {
            status: None,
            reason: reason.into(),
        }));
        self
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(Error::Internal {
                reason: format!("no scripted response for {}", description),
            })
        })
    }
}
