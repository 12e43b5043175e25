//! Dependency scheduling
//!
//! Validates a batch's dependency graph and derives the structures the
//! dispatcher needs: per-task dependents, initial dependency counts, and a
//! priority-stable topological order. The sort is an explicit worklist
//! (Kahn's algorithm) over integer task handles - no recursion, no shared
//! visited-set closures.

use crate::batch::error::BatchError;
use crate::batch::task::BatchTask;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Heap key that pops the highest priority first, input order as tiebreak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadyKey {
    pub priority: i32,
    pub index: usize,
}

impl ReadyKey {
    pub fn new(priority: i32, index: usize) -> Self {
        Self { priority, index }
    }
}

impl Ord for ReadyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins, then earlier input index
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for ReadyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Validated dispatch structures for one batch
#[derive(Debug)]
pub(crate) struct Schedule {
    /// For each task index, the indexes that depend on it
    pub dependents: Vec<Vec<usize>>,
    /// For each task index, how many dependencies must settle first
    pub dependency_count: Vec<usize>,
    /// DAG-respecting order, descending priority among ready tasks
    pub order: Vec<usize>,
}

/// Validate ids and dependencies, then derive the schedule
///
/// Fails on duplicate task ids, references to unknown dependency ids, and
/// dependency cycles - all before any task runs.
pub(crate) fn plan<T>(tasks: &[BatchTask<T>]) -> Result<Schedule, BatchError> {
    let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        if by_id.insert(task.task_id.as_str(), index).is_some() {
            return Err(BatchError::DuplicateTaskId(task.task_id.clone()));
        }
    }

    let mut dependents = vec![Vec::new(); tasks.len()];
    let mut dependency_count = vec![0usize; tasks.len()];
    for (index, task) in tasks.iter().enumerate() {
        for dependency in &task.dependencies {
            let Some(&dep_index) = by_id.get(dependency.as_str()) else {
                return Err(BatchError::MissingDependency {
                    task_id: task.task_id.clone(),
                    dependency: dependency.clone(),
                });
            };
            dependents[dep_index].push(index);
            dependency_count[index] += 1;
        }
    }

    // Kahn's algorithm with a priority heap over the ready set
    let mut remaining = dependency_count.clone();
    let mut ready: BinaryHeap<ReadyKey> = (0..tasks.len())
        .filter(|&i| remaining[i] == 0)
        .map(|i| ReadyKey::new(tasks[i].priority, i))
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(key) = ready.pop() {
        order.push(key.index);
        for &dependent in &dependents[key.index] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(ReadyKey::new(tasks[dependent].priority, dependent));
            }
        }
    }

    if order.len() != tasks.len() {
        let blocked = (0..tasks.len())
            .find(|&i| remaining[i] > 0)
            .unwrap_or(0);
        return Err(BatchError::DependencyCycle(tasks[blocked].task_id.clone()));
    }

    Ok(Schedule {
        dependents,
        dependency_count,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> BatchTask<()> {
        BatchTask::new(id, || Ok(()))
    }

    fn order_of(tasks: &[BatchTask<()>]) -> Vec<String> {
        let schedule = plan(tasks).unwrap();
        schedule
            .order
            .iter()
            .map(|&i| tasks[i].task_id.clone())
            .collect()
    }

    #[test]
    fn test_dependency_chain_orders_correctly() {
        // C depends on B depends on A, submitted in reverse with adverse priorities
        let tasks = vec![
            task("c").depends_on("b").priority(100),
            task("b").depends_on("a").priority(50),
            task("a").priority(0),
        ];

        assert_eq!(order_of(&tasks), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_orders_independent_tasks() {
        let tasks = vec![
            task("low").priority(1),
            task("high").priority(10),
            task("mid").priority(5),
        ];

        assert_eq!(order_of(&tasks), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_priority_ties_preserve_input_order() {
        let tasks = vec![task("first"), task("second"), task("third")];
        assert_eq!(order_of(&tasks), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_missing_dependency() {
        let tasks = vec![task("a").depends_on("ghost")];
        match plan(&tasks) {
            Err(BatchError::MissingDependency { task_id, dependency }) => {
                assert_eq!(task_id, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_detection() {
        let tasks = vec![
            task("a").depends_on("b"),
            task("b").depends_on("a"),
        ];
        assert!(matches!(plan(&tasks), Err(BatchError::DependencyCycle(_))));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![task("a").depends_on("a")];
        assert!(matches!(plan(&tasks), Err(BatchError::DependencyCycle(_))));
    }

    #[test]
    fn test_duplicate_id() {
        let tasks = vec![task("a"), task("a")];
        assert!(matches!(plan(&tasks), Err(BatchError::DuplicateTaskId(_))));
    }

    #[test]
    fn test_diamond_dependencies() {
        // b and c both depend on a; d depends on both
        let tasks = vec![
            task("d").depends_on("b").depends_on("c"),
            task("b").depends_on("a"),
            task("c").depends_on("a").priority(10),
            task("a"),
        ];

        let order = order_of(&tasks);
        let position = |id: &str| order.iter().position(|t| t == id).unwrap();
        assert!(position("a") < position("b"));
        assert!(position("a") < position("c"));
        assert!(position("b") < position("d"));
        assert!(position("c") < position("d"));
        // Higher priority sibling runs first
        assert!(position("c") < position("b"));
    }
}
