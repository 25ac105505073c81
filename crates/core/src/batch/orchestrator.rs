//! Batch orchestrator implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{EngineAdapter, EngineBackend, EngineConfig};
use crate::format::TargetFormat;
use crate::task::{ConversionTask, TaskStatus};

use super::types::{BatchError, BatchEvent, BatchReport, BatchState, CancelFlag};

/// Starts batches and enforces the single-active-batch invariant.
///
/// The engine is a single exclusive resource: at most one engine handle is
/// live process-wide, so at most one batch runs at a time. The worker runs
/// on a dedicated blocking thread because the engine's automation runtime is
/// thread-affine; it must be created, used, and destroyed on that thread.
pub struct BatchOrchestrator {
    engine_config: EngineConfig,
    active: Arc<AtomicBool>,
}

impl BatchOrchestrator {
    /// Creates an orchestrator with the given engine configuration.
    pub fn new(engine_config: EngineConfig) -> Self {
        Self {
            engine_config,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a batch is currently active.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Starts a batch over `tasks`, converting to `format` via `backend`.
    ///
    /// Returns immediately; processing happens on a worker thread and is
    /// observed through the returned handle's event stream.
    pub fn start<B>(
        &self,
        backend: B,
        tasks: Vec<ConversionTask>,
        format: TargetFormat,
    ) -> Result<BatchHandle, BatchError>
    where
        B: EngineBackend + Send + 'static,
    {
        if tasks.is_empty() {
            return Err(BatchError::Empty);
        }
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(BatchError::AlreadyRunning);
        }

        let batch_id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();
        let state = Arc::new(Mutex::new(BatchState::Idle));

        info!(%batch_id, tasks = tasks.len(), %format, "Starting batch");

        let engine_config = self.engine_config.clone();
        let worker_cancel = cancel.clone();
        let worker_state = Arc::clone(&state);
        let active = Arc::clone(&self.active);

        let join = tokio::task::spawn_blocking(move || {
            // Clears the active flag even if the worker panics.
            let _guard = ActiveGuard(active);
            run_batch(
                batch_id,
                backend,
                engine_config,
                tasks,
                format,
                worker_cancel,
                events_tx,
                worker_state,
            );
        });

        Ok(BatchHandle {
            id: batch_id,
            events: events_rx,
            cancel,
            state,
            join,
        })
    }
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to an active batch: event stream, cancellation, and completion.
pub struct BatchHandle {
    id: Uuid,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    cancel: CancelFlag,
    state: Arc<Mutex<BatchState>>,
    join: tokio::task::JoinHandle<()>,
}

impl BatchHandle {
    /// The batch id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Requests cooperative cancellation; observed at the next task boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The cancellation flag, for wiring into a UI.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Current lifecycle state. A poisoned lock still yields the last state
    /// the worker wrote.
    pub fn state(&self) -> BatchState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Receives the next event; `None` once the worker has finished and the
    /// stream is drained.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Waits for the worker thread to finish.
    pub async fn wait(self) {
        if let Err(e) = self.join.await {
            warn!(batch_id = %self.id, error = %e, "Batch worker terminated abnormally");
        }
    }
}

fn set_state(state: &Mutex<BatchState>, value: BatchState) {
    if let Ok(mut guard) = state.lock() {
        *guard = value;
    }
}

/// The worker body. Everything in here runs on one dedicated thread,
/// including engine connect, every per-document call, and cleanup.
#[allow(clippy::too_many_arguments)]
fn run_batch<B: EngineBackend>(
    batch_id: Uuid,
    backend: B,
    engine_config: EngineConfig,
    mut tasks: Vec<ConversionTask>,
    format: TargetFormat,
    cancel: CancelFlag,
    events: mpsc::UnboundedSender<BatchEvent>,
    state: Arc<Mutex<BatchState>>,
) {
    let mut adapter = EngineAdapter::new(backend, engine_config);

    set_state(&state, BatchState::Connecting);
    let _ = events.send(BatchEvent::Connecting);

    if let Err(e) = adapter.connect() {
        warn!(%batch_id, error = %e, "Batch aborted: no connection identity worked");
        set_state(&state, BatchState::Fatal);
        let _ = events.send(BatchEvent::Fatal {
            error: e.to_string(),
        });
        adapter.cleanup();
        return;
    }

    let identity = adapter.identity_used().unwrap_or_default().to_string();
    let _ = events.send(BatchEvent::Connected { identity });

    set_state(&state, BatchState::Running);
    let started_at = Utc::now();
    let total = tasks.len();
    let mut cancelled = false;
    let mut processed = 0usize;

    for index in 0..total {
        if cancel.is_cancelled() {
            info!(%batch_id, index, "Cancellation observed at task boundary");
            cancelled = true;
            break;
        }

        let _ = events.send(BatchEvent::Progress {
            index,
            total,
            file_name: tasks[index].file_name(),
        });

        process_task(&mut adapter, &mut tasks[index], format);
        processed += 1;

        let _ = events.send(BatchEvent::TaskFinished {
            index,
            task: tasks[index].clone(),
        });
    }

    let succeeded = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Succeeded)
        .count();
    let failed: Vec<ConversionTask> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .cloned()
        .collect();

    // Cleanup runs no matter how the loop terminated.
    adapter.cleanup();

    let report = BatchReport {
        batch_id,
        total,
        processed,
        succeeded,
        failed,
        started_at,
        finished_at: Utc::now(),
    };

    if cancelled {
        info!(%batch_id, processed, total, "Batch cancelled");
        set_state(&state, BatchState::Cancelled);
        let _ = events.send(BatchEvent::Cancelled { report });
    } else {
        info!(%batch_id, succeeded, total, "Batch completed");
        set_state(&state, BatchState::Completed);
        let _ = events.send(BatchEvent::Completed { report });
    }
}

/// Runs one task to a terminal status. Failures are local: the task is
/// marked Failed with a diagnostic and the batch moves on.
fn process_task<B: EngineBackend>(
    adapter: &mut EngineAdapter<B>,
    task: &mut ConversionTask,
    format: TargetFormat,
) {
    if let Some(parent) = task.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                task.mark_failed(format!(
                    "Failed to create output folder {}: {e}",
                    parent.display()
                ));
                return;
            }
        }
    }

    if !task.input_path.exists() {
        task.mark_failed(format!(
            "Input file not found: {}",
            task.input_path.display()
        ));
        return;
    }

    task.mark_running();
    match adapter.convert(&task.input_path, &task.output_path, format.engine_code()) {
        Ok(()) => task.mark_succeeded(),
        Err(e) => task.mark_failed(e.to_string()),
    }
}
