//! Notification mediator
//!
//! In-process correlation table between callers blocked on an execution and
//! callbacks arriving for it. A result delivered before anyone waits is kept
//! until [`NotificationMediator::cleanup`], so a late `wait` returns it
//! immediately.
//!
//! The table is process-local and not durable. After a restart, callers fall
//! back to polling the execution record.

use relay_domain::CallbackPayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Result of [`NotificationMediator::wait`]
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Delivered(CallbackPayload),
    TimedOut,
}

#[derive(Default)]
struct Table {
    waiters: HashMap<String, Arc<Notify>>,
    results: HashMap<String, CallbackPayload>,
}

#[derive(Default)]
pub struct NotificationMediator {
    table: Mutex<Table>,
}

impl NotificationMediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until a payload for `execution_id` is delivered or `timeout`
    /// elapses. Other callers are never blocked by this wait.
    pub async fn wait(&self, execution_id: &str, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let signal = {
            let mut table = self.lock();
            if let Some(payload) = table.results.get(execution_id) {
                return WaitOutcome::Delivered(payload.clone());
            }
            Arc::clone(
                table
                    .waiters
                    .entry(execution_id.to_string())
                    .or_insert_with(|| Arc::new(Notify::new())),
            )
        };
        let _guard = WaiterGuard {
            mediator: self,
            execution_id,
            signal: &signal,
        };

        loop {
            let woke = tokio::time::timeout_at(deadline, signal.notified()).await;
            if let Some(payload) = self.try_result(execution_id) {
                return WaitOutcome::Delivered(payload);
            }
            if woke.is_err() {
                debug!(execution_id, ?timeout, "Wait timed out");
                return WaitOutcome::TimedOut;
            }
            // Woken by a permit left over from a cleaned-up result; keep waiting.
        }
    }

    /// Store `payload` for its execution id and wake one waiter, if any.
    ///
    /// A second delivery for the same id overwrites the first. Returns
    /// whether a waiter was present.
    pub fn deliver(&self, payload: CallbackPayload) -> bool {
        let execution_id = payload.execution_id.clone();
        let mut table = self.lock();
        table.results.insert(execution_id.clone(), payload);
        match table.waiters.get(&execution_id) {
            Some(signal) => {
                signal.notify_one();
                debug!(execution_id = %execution_id, "Delivered to waiting caller");
                true
            }
            None => {
                debug!(execution_id = %execution_id, "Delivered with no waiter; result kept");
                false
            }
        }
    }

    /// Non-blocking peek at a delivered result
    pub fn try_result(&self, execution_id: &str) -> Option<CallbackPayload> {
        self.lock().results.get(execution_id).cloned()
    }

    /// Forget everything about `execution_id`: waiter entry and stored result.
    pub fn cleanup(&self, execution_id: &str) {
        let mut table = self.lock();
        table.waiters.remove(execution_id);
        table.results.remove(execution_id);
    }

    /// Number of execution ids with a blocked caller
    pub fn pending_waits(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Number of delivered results not yet cleaned up
    pub fn stored_results(&self) -> usize {
        self.lock().results.len()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // Plain maps; a poisoned lock is still consistent.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes the waiter entry when the wait ends, including when the waiting
/// future is dropped.
struct WaiterGuard<'a> {
    mediator: &'a NotificationMediator,
    execution_id: &'a str,
    signal: &'a Arc<Notify>,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let mut table = self.mediator.lock();
        // Only remove our own entry; a later wait may have replaced it.
        if table
            .waiters
            .get(self.execution_id)
            .is_some_and(|current| Arc::ptr_eq(current, self.signal))
        {
            table.waiters.remove(self.execution_id);
        }
    }
}
