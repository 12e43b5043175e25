//! Batch progress tracking and processor metrics

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

/// Live counters for one running batch
///
/// Mutated under the processor's lock as tasks settle; snapshots are
/// handed to progress callbacks and returned in the final report.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub batch_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub cancelled_tasks: usize,
    /// One formatted entry per failed task
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when the last task settles
    pub finished_at: Option<DateTime<Utc>>,
    started: Instant,
}

impl BatchProgress {
    pub(crate) fn new(batch_id: &str, total_tasks: usize) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            total_tasks,
            completed_tasks: 0,
            failed_tasks: 0,
            cancelled_tasks: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            started: Instant::now(),
        }
    }

    /// Tasks that reached any terminal state
    pub fn terminal_tasks(&self) -> usize {
        self.completed_tasks + self.failed_tasks + self.cancelled_tasks
    }

    /// Whether every task has settled
    pub fn is_complete(&self) -> bool {
        self.terminal_tasks() >= self.total_tasks
    }

    /// Terminal tasks as a percentage of the total
    pub fn progress_percentage(&self) -> f64 {
        if self.total_tasks == 0 {
            100.0
        } else {
            self.terminal_tasks() as f64 / self.total_tasks as f64 * 100.0
        }
    }

    /// Completed fraction among settled tasks
    pub fn success_rate(&self) -> f64 {
        let terminal = self.terminal_tasks();
        if terminal == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / terminal as f64
        }
    }

    /// Remaining-time estimate extrapolated from completions so far
    pub fn eta_seconds(&self) -> Option<f64> {
        if self.completed_tasks == 0 || self.is_complete() {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let per_task = elapsed / self.completed_tasks as f64;
        Some(per_task * (self.total_tasks - self.terminal_tasks()) as f64)
    }

    /// Stamp the end time; later calls are no-ops
    pub(crate) fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }
}

/// Final result of one batch run
///
/// Always returned, even for a cancelled batch - the counters describe
/// whatever settled before the flag was observed.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub batch_id: String,
    pub progress: BatchProgress,
    /// Successful task outputs keyed by task id
    pub results: HashMap<String, T>,
    /// Failure messages keyed by task id
    pub errors: HashMap<String, String>,
}

/// Running totals across a processor's lifetime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessorMetrics {
    pub batches_processed: u64,
    pub tasks_processed: u64,
    pub total_processing_ms: u64,
}

impl ProcessorMetrics {
    /// Mean wall-clock per batch in milliseconds
    pub fn avg_batch_ms(&self) -> f64 {
        if self.batches_processed == 0 {
            0.0
        } else {
            self.total_processing_ms as f64 / self.batches_processed as f64
        }
    }

    /// Mean tasks per batch
    pub fn avg_tasks_per_batch(&self) -> f64 {
        if self.batches_processed == 0 {
            0.0
        } else {
            self.tasks_processed as f64 / self.batches_processed as f64
        }
    }
}
