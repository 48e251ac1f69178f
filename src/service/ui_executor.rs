//! Single-consumer execution context for observer callbacks.
//!
//! [`UiExecutor`] owns one dedicated thread (`lighthouse-ui`) draining an
//! unbounded FIFO queue. Producers on network or worker threads submit
//! closures without blocking; the closures run one at a time, in
//! submission order, always on that thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::error::LighthouseError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Name of the consumer thread.
pub const UI_THREAD_NAME: &str = "lighthouse-ui";

/// Cloneable handle to the UI execution context.
///
/// The consumer thread exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct UiExecutor {
    sender: mpsc::UnboundedSender<Task>,
    thread_id: ThreadId,
}

impl UiExecutor {
    /// Starts the consumer thread.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Internal`] if the thread cannot be
    /// spawned.
    pub fn start() -> Result<Self, LighthouseError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        let handle = thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(task) = receiver.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::error!("ui task panicked");
                    }
                }
                tracing::debug!("ui executor stopped");
            })
            .map_err(|e| LighthouseError::Internal(format!("spawning ui thread: {e}")))?;
        Ok(Self {
            sender,
            thread_id: handle.thread().id(),
        })
    }

    /// Queues `task`. Never blocks.
    ///
    /// Returns `false` if the consumer thread is gone and the task was
    /// dropped.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let queued = self.sender.send(Box::new(task)).is_ok();
        if !queued {
            tracing::warn!("ui executor stopped; task dropped");
        }
        queued
    }

    /// Waits until every task queued before this call has run.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Internal`] if the consumer thread is
    /// gone.
    pub async fn flush(&self) -> Result<(), LighthouseError> {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.submit(move || {
            let _ = done_tx.send(());
        }) {
            return Err(LighthouseError::Internal("ui executor stopped".to_string()));
        }
        done_rx
            .await
            .map_err(|_| LighthouseError::Internal("ui executor stopped".to_string()))
    }

    /// Returns `true` when called from the consumer thread.
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    fn executor() -> UiExecutor {
        let Ok(ui) = UiExecutor::start() else {
            panic!("ui executor should start");
        };
        ui
    }

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let ui = executor();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..50 {
            let seen = Arc::clone(&seen);
            ui.submit(move || seen.lock().push(i));
        }
        assert!(ui.flush().await.is_ok());
        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn tasks_run_on_the_ui_thread() {
        let ui = executor();
        assert!(!ui.is_ui_thread());
        let on_ui = Arc::new(Mutex::new(None));
        let handle = ui.clone();
        let slot = Arc::clone(&on_ui);
        ui.submit(move || {
            let name = thread::current().name().map(str::to_string);
            *slot.lock() = Some((handle.is_ui_thread(), name));
        });
        assert!(ui.flush().await.is_ok());
        assert_eq!(*on_ui.lock(), Some((true, Some(UI_THREAD_NAME.to_string()))));
    }

    #[tokio::test]
    async fn panicking_task_does_not_stop_the_queue() {
        let ui = executor();
        let ran = Arc::new(Mutex::new(false));
        ui.submit(|| panic!("boom"));
        let flag = Arc::clone(&ran);
        ui.submit(move || *flag.lock() = true);
        assert!(ui.flush().await.is_ok());
        assert!(*ran.lock());
    }
}
