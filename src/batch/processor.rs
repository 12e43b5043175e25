//! Batch processor
//!
//! Executes a validated task batch on the tokio blocking pool with bounded
//! parallelism, live progress, and cooperative mid-flight cancellation.
//!
//! Dispatch is dependency-gated: a task is handed to the pool only after
//! every task it depends on has reached a terminal state. Dependents run
//! even when a dependency failed or was cancelled. Among ready tasks,
//! higher priority dispatches first; completion order follows OS
//! scheduling and is not guaranteed.

use crate::batch::error::BatchError;
use crate::batch::progress::{BatchProgress, BatchReport, ProcessorMetrics};
use crate::batch::schedule::{self, ReadyKey, Schedule};
use crate::batch::task::{BatchTask, CancellationMode, CancellationToken, CheckedCall, TaskFn, TaskOutcome};
use parking_lot::Mutex;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Callback invoked synchronously with a progress snapshot on every update
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// Per-batch execution options
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Worker cap; defaults to `min(32, cpus + 4)`
    pub max_workers: Option<usize>,
    pub cancellation: CancellationMode,
    callbacks: Vec<ProgressCallback>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: cap concurrent workers
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Builder: choose how cancellation is observed
    pub fn cancellation(mut self, mode: CancellationMode) -> Self {
        self.cancellation = mode;
        self
    }

    /// Builder: register a progress callback
    pub fn on_progress(mut self, callback: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.callbacks.push(Arc::new(callback));
        self
    }
}

#[derive(Clone)]
struct ActiveBatch {
    token: Arc<CancellationToken>,
    progress: Arc<Mutex<BatchProgress>>,
}

/// Generic dependency-aware batch executor
#[derive(Default)]
pub struct BatchProcessor {
    active: Mutex<HashMap<String, ActiveBatch>>,
    metrics: Mutex<ProcessorMetrics>,
}

impl BatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a batch to completion and return its report
    ///
    /// Fails fast on an empty batch or an invalid dependency graph;
    /// individual task failures are recorded per-task, never raised.
    pub async fn process_batch<T: Send + 'static>(
        &self,
        batch_id: &str,
        tasks: Vec<BatchTask<T>>,
        options: BatchOptions,
    ) -> Result<BatchReport<T>, BatchError> {
        if tasks.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let schedule = schedule::plan(&tasks)?;

        let token = Arc::new(CancellationToken::new());
        let progress = Arc::new(Mutex::new(BatchProgress::new(batch_id, tasks.len())));
        self.active.lock().insert(
            batch_id.to_string(),
            ActiveBatch {
                token: Arc::clone(&token),
                progress: Arc::clone(&progress),
            },
        );
        // Deregisters the batch on every exit path
        let _guard = ActiveGuard {
            processor: self,
            batch_id: batch_id.to_string(),
        };

        let started = Instant::now();
        tracing::info!(batch_id, tasks = progress.lock().total_tasks, "batch started");

        let report = self
            .run_batch(batch_id, tasks, schedule, token, progress, &options)
            .await;

        {
            let mut metrics = self.metrics.lock();
            metrics.batches_processed += 1;
            metrics.tasks_processed += report.progress.total_tasks as u64;
            metrics.total_processing_ms += started.elapsed().as_millis() as u64;
        }

        tracing::info!(
            batch_id,
            completed = report.progress.completed_tasks,
            failed = report.progress.failed_tasks,
            cancelled = report.progress.cancelled_tasks,
            "batch finished"
        );
        Ok(report)
    }

    async fn run_batch<T: Send + 'static>(
        &self,
        batch_id: &str,
        tasks: Vec<BatchTask<T>>,
        schedule: Schedule,
        token: Arc<CancellationToken>,
        progress: Arc<Mutex<BatchProgress>>,
        options: &BatchOptions,
    ) -> BatchReport<T> {
        let max_workers = options.max_workers.unwrap_or_else(default_worker_count).max(1);
        let total = tasks.len();

        let mut ids = Vec::with_capacity(total);
        let mut priorities = Vec::with_capacity(total);
        let mut runs: Vec<Option<TaskFn<T>>> = Vec::with_capacity(total);
        for task in tasks {
            let (id, priority, run) = task.into_parts();
            ids.push(id);
            priorities.push(priority);
            runs.push(Some(run));
        }

        tracing::debug!(
            batch_id,
            planned = ?schedule.order.iter().map(|&i| ids[i].as_str()).collect::<Vec<_>>(),
            "dependency order resolved"
        );

        let mut remaining = schedule.dependency_count.clone();
        let mut ready: BinaryHeap<ReadyKey> = (0..total)
            .filter(|&i| remaining[i] == 0)
            .map(|i| ReadyKey::new(priorities[i], i))
            .collect();

        let mut workers: JoinSet<(usize, TaskOutcome<T>)> = JoinSet::new();
        let mut in_flight = 0usize;
        let mut results: HashMap<String, T> = HashMap::new();
        let mut errors: HashMap<String, String> = HashMap::new();

        loop {
            while in_flight < max_workers {
                let Some(key) = ready.pop() else { break };
                let index = key.index;
                let Some(run) = runs[index].take() else { continue };

                if token.is_cancelled() {
                    // Undispatched work settles as cancelled without running
                    settle(
                        index,
                        TaskOutcome::Cancelled,
                        &ids,
                        &progress,
                        &options.callbacks,
                        &mut results,
                        &mut errors,
                    );
                    release(index, &schedule.dependents, &mut remaining, &priorities, &mut ready);
                    continue;
                }

                let call = CheckedCall::new(Arc::clone(&token), options.cancellation, run);
                workers.spawn_blocking(move || (index, call.invoke()));
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            match workers.join_next().await {
                Some(Ok((index, outcome))) => {
                    in_flight -= 1;
                    settle(
                        index,
                        outcome,
                        &ids,
                        &progress,
                        &options.callbacks,
                        &mut results,
                        &mut errors,
                    );
                    release(index, &schedule.dependents, &mut remaining, &priorities, &mut ready);
                }
                Some(Err(join_error)) => {
                    in_flight -= 1;
                    tracing::error!(batch_id, error = %join_error, "batch worker failed to join");
                }
                None => break,
            }
        }

        let final_progress = {
            let mut locked = progress.lock();
            locked.finish();
            locked.clone()
        };

        BatchReport {
            batch_id: batch_id.to_string(),
            progress: final_progress,
            results,
            errors,
        }
    }

    /// Request cancellation of an active batch
    ///
    /// Cooperative and best-effort: dispatched work finishes its current
    /// unit before the flag is observed. Returns whether an active batch
    /// with this id was found; completed batches always return `false`.
    pub fn cancel_batch(&self, batch_id: &str, reason: Option<&str>) -> bool {
        let active = self.active.lock();
        match active.get(batch_id) {
            Some(batch) => {
                batch.token.cancel(reason.map(str::to_string));
                tracing::info!(batch_id, reason, "batch cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Snapshot of an active batch's progress
    pub fn progress(&self, batch_id: &str) -> Option<BatchProgress> {
        let active = self.active.lock();
        active.get(batch_id).map(|batch| batch.progress.lock().clone())
    }

    /// Lifetime totals across batches
    pub fn metrics(&self) -> ProcessorMetrics {
        self.metrics.lock().clone()
    }

    /// Zero the lifetime totals
    pub fn reset_metrics(&self) {
        *self.metrics.lock() = ProcessorMetrics::default();
    }
}

struct ActiveGuard<'a> {
    processor: &'a BatchProcessor,
    batch_id: String,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.processor.active.lock().remove(&self.batch_id);
    }
}

fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

fn settle<T>(
    index: usize,
    outcome: TaskOutcome<T>,
    ids: &[String],
    progress: &Arc<Mutex<BatchProgress>>,
    callbacks: &[ProgressCallback],
    results: &mut HashMap<String, T>,
    errors: &mut HashMap<String, String>,
) {
    let task_id = &ids[index];
    let snapshot = {
        let mut locked = progress.lock();
        match outcome {
            TaskOutcome::Completed(value) => {
                locked.completed_tasks += 1;
                results.insert(task_id.clone(), value);
            }
            TaskOutcome::Failed(message) => {
                locked.failed_tasks += 1;
                locked.errors.push(format!("{}: {}", task_id, message));
                errors.insert(task_id.clone(), message);
            }
            TaskOutcome::Cancelled => {
                locked.cancelled_tasks += 1;
            }
        }
        if locked.is_complete() {
            locked.finish();
        }
        locked.clone()
    };

    // Callbacks run outside the lock, synchronously, in registration order
    for callback in callbacks {
        callback(&snapshot);
    }
}

fn release(
    index: usize,
    dependents: &[Vec<usize>],
    remaining: &mut [usize],
    priorities: &[i32],
    ready: &mut BinaryHeap<ReadyKey>,
) {
    for &dependent in &dependents[index] {
        remaining[dependent] -= 1;
        if remaining[dependent] == 0 {
            ready.push(ReadyKey::new(priorities[dependent], dependent));
        }
    }
}
