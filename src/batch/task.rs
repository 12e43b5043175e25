//! Batch task model
//!
//! A `BatchTask` pairs a unique id with a callable and its scheduling
//! metadata. Execution goes through `CheckedCall`, which consults the
//! batch's `CancellationToken` and reports a tagged `TaskOutcome` - the
//! dispatch loop pattern-matches outcomes instead of filtering exceptions.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Boxed task callable
pub type TaskFn<T> = Box<dyn FnOnce() -> anyhow::Result<T> + Send + 'static>;

/// One unit of batch work
pub struct BatchTask<T> {
    /// Unique id within the batch
    pub task_id: String,
    /// Higher runs first among ready tasks
    pub priority: i32,
    /// Optional duration estimate, informational only
    pub estimated_duration: Option<Duration>,
    /// Ids of tasks that must reach a terminal state before this one starts
    pub dependencies: HashSet<String>,
    run: TaskFn<T>,
}

impl<T> BatchTask<T> {
    /// Create a task with default priority and no dependencies
    pub fn new(
        task_id: impl Into<String>,
        run: impl FnOnce() -> anyhow::Result<T> + Send + 'static,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            priority: 0,
            estimated_duration: None,
            dependencies: HashSet::new(),
            run: Box::new(run),
        }
    }

    /// Builder: set priority (higher runs first)
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: add a dependency
    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.insert(task_id.into());
        self
    }

    /// Builder: attach a duration estimate
    pub fn estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = Some(duration);
        self
    }

    /// Split into (id, priority, callable) for the dispatcher
    pub(crate) fn into_parts(self) -> (String, i32, TaskFn<T>) {
        (self.task_id, self.priority, self.run)
    }
}

impl<T> fmt::Debug for BatchTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchTask")
            .field("task_id", &self.task_id)
            .field("priority", &self.priority)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// One-way cancellation latch with an optional reason
///
/// `cancel` is irreversible; running tasks observe it cooperatively.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the token; the first caller's reason wins
    pub fn cancel(&self, reason: Option<String>) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            if let Some(reason) = reason {
                *self.reason.lock() = Some(reason);
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Reason supplied at cancellation, if any
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }
}

/// When running work observes the cancellation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancellationMode {
    /// Token consulted before and after each task callable
    #[default]
    Cooperative,
    /// Token consulted only by the dispatch loop; a dispatched callable
    /// always runs to completion and keeps its result. The weaker
    /// guarantee of executors that cannot interrupt submitted work.
    DispatchOnly,
}

/// Terminal state of one task's execution
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(String),
    Cancelled,
}

/// Uniform checked-call wrapper around a task callable
///
/// Holds the token and the wrapped operation explicitly rather than
/// capturing them in a closure; `invoke` is the single execution path for
/// every task.
pub struct CheckedCall<T> {
    token: Arc<CancellationToken>,
    mode: CancellationMode,
    run: TaskFn<T>,
}

impl<T> CheckedCall<T> {
    pub fn new(token: Arc<CancellationToken>, mode: CancellationMode, run: TaskFn<T>) -> Self {
        Self { token, mode, run }
    }

    /// Run the wrapped callable, reporting a tagged outcome
    ///
    /// A panicking callable is recorded as `Failed`, not propagated.
    pub fn invoke(self) -> TaskOutcome<T> {
        let Self { token, mode, run } = self;

        if mode == CancellationMode::Cooperative && token.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        match catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(value)) => {
                if mode == CancellationMode::Cooperative && token.is_cancelled() {
                    TaskOutcome::Cancelled
                } else {
                    TaskOutcome::Completed(value)
                }
            }
            Ok(Err(error)) => TaskOutcome::Failed(format!("{:#}", error)),
            Err(panic) => TaskOutcome::Failed(panic_message(panic.as_ref())),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {}", message)
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_one_way() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel(Some("first".to_string()));
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("first"));

        // Second cancel cannot overwrite the reason or un-latch
        token.cancel(Some("second".to_string()));
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("first"));
    }

    #[test]
    fn test_checked_call_completes() {
        let token = Arc::new(CancellationToken::new());
        let call = CheckedCall::new(token, CancellationMode::Cooperative, Box::new(|| Ok(41 + 1)));

        match call.invoke() {
            TaskOutcome::Completed(value) => assert_eq!(value, 42),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_checked_call_pre_cancelled() {
        let token = Arc::new(CancellationToken::new());
        token.cancel(None);
        let call: CheckedCall<i32> =
            CheckedCall::new(token, CancellationMode::Cooperative, Box::new(|| Ok(1)));

        assert!(matches!(call.invoke(), TaskOutcome::Cancelled));
    }

    #[test]
    fn test_checked_call_post_cancelled() {
        let token = Arc::new(CancellationToken::new());
        let inner = Arc::clone(&token);
        let call = CheckedCall::new(
            token,
            CancellationMode::Cooperative,
            Box::new(move || {
                inner.cancel(None);
                Ok(1)
            }),
        );

        // The callable ran, but the post-call check converts the result
        assert!(matches!(call.invoke(), TaskOutcome::Cancelled));
    }

    #[test]
    fn test_dispatch_only_keeps_result_despite_cancel() {
        let token = Arc::new(CancellationToken::new());
        let inner = Arc::clone(&token);
        let call = CheckedCall::new(
            token,
            CancellationMode::DispatchOnly,
            Box::new(move || {
                inner.cancel(None);
                Ok(7)
            }),
        );

        assert!(matches!(call.invoke(), TaskOutcome::Completed(7)));
    }

    #[test]
    fn test_checked_call_failure() {
        let token = Arc::new(CancellationToken::new());
        let call: CheckedCall<()> = CheckedCall::new(
            token,
            CancellationMode::Cooperative,
            Box::new(|| anyhow::bail!("boom")),
        );

        match call.invoke() {
            TaskOutcome::Failed(message) => assert!(message.contains("boom")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_checked_call_panic_becomes_failure() {
        let token = Arc::new(CancellationToken::new());
        let call: CheckedCall<()> = CheckedCall::new(
            token,
            CancellationMode::Cooperative,
            Box::new(|| panic!("exploded")),
        );

        match call.invoke() {
            TaskOutcome::Failed(message) => {
                assert!(message.contains("task panicked"));
                assert!(message.contains("exploded"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_task_builder() {
        let task = BatchTask::new("t1", || Ok(()))
            .priority(5)
            .depends_on("t0")
            .estimated_duration(Duration::from_secs(2));

        assert_eq!(task.task_id, "t1");
        assert_eq!(task.priority, 5);
        assert!(task.dependencies.contains("t0"));
        assert_eq!(task.estimated_duration, Some(Duration::from_secs(2)));
    }
}
