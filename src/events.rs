//! Submit events and the cycle lifecycle bus.
//!
//! A [`SubmitEvent`] is what [`Form::submit`](crate::form::Form::submit)
//! hands to each [`SubmitListener`]. Listeners that start asynchronous work
//! park its handle on the event with [`SubmitEvent::defer`], so whoever
//! fired the submit can wait with [`SubmitEvent::settled`].
//!
//! Cycle progress is announced separately on an [`EventBus`], built on
//! [`tokio::sync::broadcast`] so multiple observers can react independently.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::form::Form;

/// How one submit-to-render cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The display now holds this text.
    Rendered(String),
    /// A newer cycle had started, so this result was dropped.
    Discarded,
}

/// Something that reacts to a form being submitted. Called synchronously
/// during [`Form::submit`]; long-running work belongs in a spawned task.
pub trait SubmitListener: Send + Sync {
    fn on_submit(&self, event: &SubmitEvent<'_>);
}

/// A single submit interaction.
pub struct SubmitEvent<'a> {
    form: &'a Form,
    default_prevented: AtomicBool,
    pending: Mutex<Vec<JoinHandle<CycleOutcome>>>,
}

impl<'a> SubmitEvent<'a> {
    pub(crate) fn new(form: &'a Form) -> Self {
        Self {
            form,
            default_prevented: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The form that was submitted.
    pub fn form(&self) -> &'a Form {
        self.form
    }

    /// Suppress the default effect of submitting (page navigation).
    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }

    /// Attach a cycle started on behalf of this event.
    pub fn defer(&self, handle: JoinHandle<CycleOutcome>) {
        self.pending.lock().unwrap().push(handle);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Release the deferred cycles without waiting, ending the borrow of
    /// the form.
    pub fn into_pending(self) -> Vec<JoinHandle<CycleOutcome>> {
        self.pending.into_inner().unwrap_or_default()
    }

    /// Wait for every deferred cycle. Cycles that panicked are logged and
    /// left out.
    pub async fn settled(self) -> Vec<CycleOutcome> {
        settle(self.into_pending()).await
    }
}

/// Wait for a batch of cycles, dropping any that panicked.
pub async fn settle(handles: Vec<JoinHandle<CycleOutcome>>) -> Vec<CycleOutcome> {
    futures::future::join_all(handles)
        .await
        .into_iter()
        .filter_map(|joined| match joined {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(error = %e, "submission cycle did not complete");
                None
            }
        })
        .collect()
}

/// Lifecycle notifications for submission cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A cycle was initiated with this sequence number.
    CycleStarted { seq: u64, fields: usize },
    /// The endpoint call failed before yielding a result.
    CycleFailed { seq: u64, reason: String },
    /// The cycle wrote `text` into the display.
    Rendered { seq: u64, text: String },
    /// The cycle's result was dropped because `latest` had started since.
    Discarded { seq: u64, latest: u64 },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
