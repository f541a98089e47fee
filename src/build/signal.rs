//! Fatal-failure channel.
//!
//! Every failed job is raised here in addition to being recorded in the
//! pass's outcome list, so a host can treat any compile error as fatal
//! without inspecting the aggregate.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::compiler::CompileFailure;

/// Sender side of the fatal-failure channel. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct FailureSignal {
    tx: Arc<Mutex<Option<UnboundedSender<CompileFailure>>>>,
}

impl FailureSignal {
    /// Create a signal with no subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to failures. A new subscription replaces the previous one.
    pub fn subscribe(&self) -> UnboundedReceiver<CompileFailure> {
        let (tx, rx) = unbounded_channel();
        if let Ok(mut slot) = self.tx.lock() {
            *slot = Some(tx);
        }
        rx
    }

    /// Check if a live subscriber exists.
    pub fn has_subscriber(&self) -> bool {
        self.tx.lock().map(|slot| slot.as_ref().is_some_and(|tx| !tx.is_closed())).unwrap_or(false)
    }

    /// Raise a failure. Unobserved failures are logged instead of dropped.
    pub fn raise(&self, failure: CompileFailure) {
        let unsent = match self.tx.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(tx) => tx.send(failure).err().map(|e| e.0),
                None => Some(failure),
            },
            Err(_) => Some(failure),
        };

        if let Some(failure) = unsent {
            tracing::error!(
                file = %failure.file.display(),
                line = failure.line,
                column = failure.column,
                "unobserved compile failure: {}",
                failure.message
            );
        }
    }
}
