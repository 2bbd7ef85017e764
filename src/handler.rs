//! The submission handler: turns a submit event into one request and one
//! display update.
//!
//! Each submit is a *cycle*. The handler stamps it with a sequence number
//! before anything asynchronous happens, spawns the request, and renders the
//! answer when it arrives. Under [`RenderPolicy::LatestSubmission`] a cycle
//! that resolves after a newer one has started is discarded, so a slow
//! response can never overwrite a fresher one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::Instrument;

use crate::display::Display;
use crate::endpoint::Endpoint;
use crate::events::{CycleOutcome, Event, EventBus, SubmitEvent, SubmitListener};
use crate::form::{Form, FormData};

/// Which resolved cycles may write to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPolicy {
    /// Only the most recently initiated cycle renders.
    #[default]
    LatestSubmission,
    /// Every cycle renders when it resolves; the last to resolve wins.
    LastWriterWins,
}

/// Submit listener that posts the form and renders the answer.
pub struct SubmissionHandler {
    endpoint: Arc<dyn Endpoint>,
    display: Arc<dyn Display>,
    bus: Arc<EventBus>,
    policy: RenderPolicy,
    latest: Arc<AtomicU64>,
    render_lock: Arc<Mutex<()>>,
}

impl SubmissionHandler {
    pub fn new(endpoint: Arc<dyn Endpoint>, display: Arc<dyn Display>, policy: RenderPolicy) -> Self {
        Self {
            endpoint,
            display,
            bus: Arc::new(EventBus::default()),
            policy,
            latest: Arc::new(AtomicU64::new(0)),
            render_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Publish lifecycle events on a bus shared with other components.
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn policy(&self) -> RenderPolicy {
        self.policy
    }

    /// Sequence number of the most recently initiated cycle (0 before any).
    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Register on `form` and return the shared handler.
    pub fn attach(self, form: &Form) -> Arc<Self> {
        let handler = Arc::new(self);
        form.on_submit(handler.clone());
        handler
    }

    fn cycle(&self) -> Cycle {
        Cycle {
            endpoint: Arc::clone(&self.endpoint),
            display: Arc::clone(&self.display),
            bus: Arc::clone(&self.bus),
            policy: self.policy,
            latest: Arc::clone(&self.latest),
            render_lock: Arc::clone(&self.render_lock),
        }
    }
}

impl SubmitListener for SubmissionHandler {
    /// Must be called from within a tokio runtime: the request runs on a
    /// spawned task deferred on the event.
    fn on_submit(&self, event: &SubmitEvent<'_>) {
        event.prevent_default();

        let payload = event.form().snapshot();
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let fields = payload.len();

        let span = tracing::info_span!("cycle", seq, form = event.form().id());
        span.in_scope(|| tracing::info!(fields, "submission started"));
        self.bus.emit(Event::CycleStarted { seq, fields });

        let cycle = self.cycle();
        event.defer(tokio::spawn(cycle.run(seq, payload).instrument(span)));
    }
}

/// Everything one in-flight cycle needs, detached from the handler.
struct Cycle {
    endpoint: Arc<dyn Endpoint>,
    display: Arc<dyn Display>,
    bus: Arc<EventBus>,
    policy: RenderPolicy,
    latest: Arc<AtomicU64>,
    /// Held from the staleness check through the display write.
    render_lock: Arc<Mutex<()>>,
}

impl Cycle {
    async fn run(self, seq: u64, payload: FormData) -> CycleOutcome {
        let text = match self.endpoint.submit(payload).await {
            Ok(result) => result.render(),
            Err(e) => {
                tracing::warn!(error = %e, "submission failed");
                self.bus.emit(Event::CycleFailed {
                    seq,
                    reason: e.to_string(),
                });
                e.render()
            }
        };

        let _render = self.render_lock.lock().await;
        if self.policy == RenderPolicy::LatestSubmission {
            let latest = self.latest.load(Ordering::SeqCst);
            if seq != latest {
                tracing::debug!(latest, "stale response discarded");
                self.bus.emit(Event::Discarded { seq, latest });
                return CycleOutcome::Discarded;
            }
        }

        self.display.set_text(&text);
        tracing::info!("result rendered");
        self.bus.emit(Event::Rendered {
            seq,
            text: text.clone(),
        });
        CycleOutcome::Rendered(text)
    }
}
