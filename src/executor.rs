//! UI-owning execution context.
//!
//! Deliveries into the guest surface, navigation history mutations and UI
//! collaborator calls all run as [`UiJob`]s on one serialized executor.
//! Decoding and routing may happen on any thread; only the effects are
//! marshalled here.
//!
//! | Executor | Runs jobs on | Use |
//! |----------|--------------|-----|
//! | [`UiThread`] | a dedicated tokio task | hosts driven by a tokio runtime |
//! | [`InlineUi`] | the posting thread, as a trampoline | hosts that are their own UI thread, tests |
//!
//! Both executors run jobs strictly in post order and never run two jobs at
//! the same time. A job posted from inside a running job is appended to the
//! queue, it does not run recursively.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// A unit of work for the UI-owning context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

// ============================================================================
// UiExecutor
// ============================================================================

/// Serialized, FIFO executor owning the rendering surface.
pub trait UiExecutor: Send + Sync {
    /// Queues a job behind every job posted before it.
    ///
    /// Never blocks and never runs `job` recursively inside another job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UiClosed`] if the executor has shut down.
    fn post(&self, job: UiJob) -> Result<()>;
}

// ============================================================================
// UiHandle
// ============================================================================

/// Cloneable handle to the shell's UI executor.
#[derive(Clone)]
pub struct UiHandle {
    executor: Arc<dyn UiExecutor>,
}

impl UiHandle {
    /// Wraps an executor.
    #[must_use]
    pub fn new(executor: impl UiExecutor + 'static) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    /// Wraps a shared executor.
    #[must_use]
    pub fn from_arc(executor: Arc<dyn UiExecutor>) -> Self {
        Self { executor }
    }

    /// Posts a closure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UiClosed`] if the executor has shut down.
    pub fn run(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.executor.post(Box::new(job))
    }

    /// Posts a closure; a closed executor is logged and the job dropped.
    pub fn run_or_log(&self, what: &'static str, job: impl FnOnce() + Send + 'static) {
        if let Err(e) = self.run(job) {
            warn!(job = what, error = %e, "UI job dropped");
        }
    }
}

impl fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiHandle").finish_non_exhaustive()
    }
}

// ============================================================================
// UiThread
// ============================================================================

/// Internal commands for the UI task.
enum UiCommand {
    /// Run a job.
    Run(UiJob),
    /// Signal once every earlier job has run.
    Barrier(oneshot::Sender<()>),
    /// Stop the task.
    Shutdown,
}

/// Executor backed by one spawned tokio task.
///
/// Cloning shares the same task.
#[derive(Clone)]
pub struct UiThread {
    command_tx: mpsc::UnboundedSender<UiCommand>,
}

impl UiThread {
    /// Spawns the UI task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_loop(command_rx));
        Self { command_tx }
    }

    /// Waits until every job posted before this call has run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UiClosed`] if the task has shut down.
    pub async fn idle(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(UiCommand::Barrier(tx))
            .map_err(|_| Error::UiClosed)?;
        rx.await.map_err(|_| Error::UiClosed)
    }

    /// Stops the task after the jobs already queued.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(UiCommand::Shutdown);
    }

    /// Returns `true` once the task has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    async fn run_loop(mut command_rx: mpsc::UnboundedReceiver<UiCommand>) {
        while let Some(command) = command_rx.recv().await {
            match command {
                UiCommand::Run(job) => job(),
                UiCommand::Barrier(tx) => {
                    let _ = tx.send(());
                }
                UiCommand::Shutdown => {
                    debug!("UI task shutdown requested");
                    break;
                }
            }
        }

        debug!("UI task terminated");
    }
}

impl UiExecutor for UiThread {
    fn post(&self, job: UiJob) -> Result<()> {
        self.command_tx
            .send(UiCommand::Run(job))
            .map_err(|_| Error::UiClosed)
    }
}

// ============================================================================
// InlineUi
// ============================================================================

#[derive(Default)]
struct InlineState {
    queue: VecDeque<UiJob>,
    draining: bool,
}

/// Executor running jobs on the posting thread.
///
/// The first post drains the queue; posts made while draining (from a job or
/// from another thread) are appended and run by the draining thread.
#[derive(Clone, Default)]
pub struct InlineUi {
    state: Arc<Mutex<InlineState>>,
}

impl InlineUi {
    /// Creates an idle executor.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn drain(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(job) => job,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            job();
        }
    }
}

impl UiExecutor for InlineUi {
    fn post(&self, job: UiJob) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.queue.push_back(job);
            if state.draining {
                trace!(queued = state.queue.len(), "UI job appended to running drain");
                return Ok(());
            }
            state.draining = true;
        }

        self.drain();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_runs_immediately() {
        let ui = UiHandle::new(InlineUi::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        ui.run(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("post");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inline_nested_post_runs_after_current_job() {
        let ui = UiHandle::new(InlineUi::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let (inner_ui, inner_log) = (ui.clone(), Arc::clone(&log));
        ui.run(move || {
            inner_log.lock().push("outer:start");
            let nested_log = Arc::clone(&inner_log);
            inner_ui
                .run(move || nested_log.lock().push("nested"))
                .expect("post");
            inner_log.lock().push("outer:end");
        })
        .expect("post");

        assert_eq!(*log.lock(), vec!["outer:start", "outer:end", "nested"]);
    }

    #[tokio::test]
    async fn test_ui_thread_fifo() {
        let thread = UiThread::spawn();
        let ui = UiHandle::new(thread.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..50 {
            let log = Arc::clone(&log);
            ui.run(move || log.lock().push(i)).expect("post");
        }
        thread.idle().await.expect("idle");

        assert_eq!(*log.lock(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_ui_thread_shutdown_rejects_jobs() {
        let thread = UiThread::spawn();
        thread.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(thread.is_closed());
        assert!(matches!(thread.post(Box::new(|| {})), Err(Error::UiClosed)));
    }
}
