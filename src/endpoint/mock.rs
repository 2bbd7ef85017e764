use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::form::FormData;

use super::{Endpoint, EndpointError, SummaryResult};

/// One canned answer, optionally delayed to simulate a slow network.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub delay: Duration,
    pub result: Result<SummaryResult, EndpointError>,
}

impl MockReply {
    pub fn ok(result: SummaryResult) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(result),
        }
    }

    pub fn err(error: EndpointError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

enum Script {
    /// Replies handed out in call order.
    Sequence(Vec<MockReply>),
    /// The same reply for every call.
    Always(MockReply),
    /// Reply chosen by the value of one text field.
    Keyed {
        field: String,
        replies: Vec<(String, MockReply)>,
    },
}

/// A scripted endpoint for tests. Records every payload it receives.
pub struct MockEndpoint {
    script: Script,
    index: AtomicUsize,
    received: Mutex<Vec<FormData>>,
}

impl MockEndpoint {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self::with_script(Script::Sequence(replies))
    }

    pub fn always(reply: MockReply) -> Self {
        Self::with_script(Script::Always(reply))
    }

    /// Pick the reply whose key equals the payload's `field` text value.
    /// Useful when concurrent calls may reach the mock in either order.
    pub fn keyed(field: &str, replies: Vec<(&str, MockReply)>) -> Self {
        Self::with_script(Script::Keyed {
            field: field.to_string(),
            replies: replies
                .into_iter()
                .map(|(k, r)| (k.to_string(), r))
                .collect(),
        })
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            index: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Payloads in the order calls arrived.
    pub fn received(&self) -> Vec<FormData> {
        self.received.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    fn pick(&self, i: usize, payload: &FormData) -> Result<MockReply, EndpointError> {
        let reply = match &self.script {
            Script::Sequence(replies) => replies.get(i),
            Script::Always(reply) => Some(reply),
            Script::Keyed { field, replies } => {
                let key = payload.get_text(field).unwrap_or_default();
                replies.iter().find(|(k, _)| k == key).map(|(_, r)| r)
            }
        };
        reply.cloned().ok_or_else(|| {
            EndpointError::Transport(format!(
                "MockEndpoint: no reply scripted (called {} times)",
                i + 1
            ))
        })
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    async fn submit(&self, payload: FormData) -> Result<SummaryResult, EndpointError> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        let reply = self.pick(i, &payload);
        self.received.lock().unwrap().push(payload);
        let reply = reply?;
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}
