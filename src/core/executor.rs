//! Queue executor: sequential leaves, concurrent branches.
//!
//! One executor instance walks one queue in order on its own thread.
//! Branch nodes are handed to a pool worker and run concurrently with
//! whatever follows, until the next leaf: a leaf first waits for every
//! branch launched earlier in the same queue, then runs. Branch
//! outcomes are advisory for the enclosing queue; only a failing leaf
//! fails the queue and stops it. Branches still in flight when the
//! queue runs out of nodes are left to the pool drain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::ScriptBackend;
use crate::core::node::TaskNode;
use crate::core::pool::{TaskHandle, WorkerPool};
use crate::core::queue::TaskQueue;
use crate::core::result::TaskResult;
use crate::{script, sflog, sflog_debug, sflog_error, sflog_warn, Result};

/// How often a leaf barrier re-checks pending branch handles.
const BARRIER_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    /// Log statements instead of running them; every leaf succeeds.
    pub dry_run: bool,
    /// How often a barrier wait logs pool health.
    pub poll_interval: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Walks a queue and executes its nodes.
///
/// Cheap to clone; branch workers get their own clone to run the
/// branch's sub-queue.
#[derive(Clone)]
pub struct TaskExecutor {
    pool: Arc<WorkerPool>,
    backend: Arc<dyn ScriptBackend>,
    options: ExecOptions,
}

impl TaskExecutor {
    pub fn new(pool: Arc<WorkerPool>, backend: Arc<dyn ScriptBackend>, options: ExecOptions) -> Self {
        Self {
            pool,
            backend,
            options,
        }
    }

    /// Execute the queue front to back.
    ///
    /// Returns `Success` when every leaf that ran succeeded (including
    /// the empty queue), `Failure` as soon as a leaf fails, and
    /// `ExecutionError` when a branch worker cannot be acquired; nodes
    /// after the failing item are never started.
    pub fn run(&self, queue: &Arc<TaskQueue>) -> TaskResult {
        if queue.is_empty() {
            sflog!("Queue '{}' is empty, nothing to do", queue.label());
            return TaskResult::Success;
        }
        sflog!(
            "Running queue '{}' (depth {}, {} item(s))",
            queue.label(),
            queue.depth(),
            queue.len()
        );

        let mut pending: Vec<TaskHandle> = Vec::new();
        for (index, node) in queue.iter().enumerate() {
            if node.is_branch() {
                match self.launch_branch(queue, index, node) {
                    Ok(handle) => pending.push(handle),
                    Err(e) => {
                        // Worker acquisition is a resource fault, not a
                        // script failure: it aborts the queue so the
                        // driver sees it.
                        sflog_error!(
                            "Cannot launch branch '{}', halting queue '{}': {}",
                            node.label(),
                            queue.label(),
                            e
                        );
                        node.set_result(TaskResult::ExecutionError);
                        return TaskResult::ExecutionError;
                    }
                }
            } else if !node.has_script() {
                // Empty directory: nothing to launch, nothing to run.
                sflog_debug!("Skipping '{}', no script content", node.label());
            } else {
                self.join_pending(&mut pending, queue.label());
                let result = self.run_leaf(node, queue.params());
                if !result.is_success() {
                    sflog_error!(
                        "Leaf '{}' failed, halting queue '{}'",
                        node.label(),
                        queue.label()
                    );
                    return TaskResult::Failure;
                }
            }
        }

        // Trailing branches run on; the pool drain picks them up.
        sflog!("Queue '{}' completed", queue.label());
        TaskResult::Success
    }

    /// Hand a branch node to a pool worker. The worker runs the branch's
    /// sub-queue with its own executor clone and publishes the outcome
    /// on the node.
    fn launch_branch(
        &self,
        queue: &Arc<TaskQueue>,
        index: usize,
        node: &TaskNode,
    ) -> Result<TaskHandle> {
        sflog!("Launching branch '{}'", node.label());
        let context = self.pool.acquire(node.label())?;
        node.set_result(TaskResult::Running);

        let executor = self.clone();
        let parent = Arc::clone(queue);
        Ok(context.submit(move || {
            let Some(node) = parent.get(index) else {
                return TaskResult::ExecutionError;
            };
            let outcome = executor.run(node.children());
            node.set_result(outcome);
            outcome
        }))
    }

    /// Barrier before a leaf: wait for every branch launched earlier in
    /// this queue and log their outcomes. Branch failures are reported
    /// but do not stop the queue.
    fn join_pending(&self, pending: &mut Vec<TaskHandle>, queue_label: &str) {
        if pending.is_empty() {
            return;
        }
        sflog_debug!(
            "Queue '{}': waiting for {} pending branch(es)",
            queue_label,
            pending.len()
        );
        let mut last_monitor = Instant::now();
        while pending.iter().any(|h| !h.is_finished()) {
            std::thread::sleep(BARRIER_POLL);
            if last_monitor.elapsed() >= self.options.poll_interval {
                self.pool.monitor();
                last_monitor = Instant::now();
            }
        }
        let outcomes: Vec<(String, TaskResult)> = pending
            .iter()
            .map(|h| (h.label().to_string(), h.outcome()))
            .collect();
        for (label, outcome) in &outcomes {
            if outcome.is_success() {
                sflog_debug!("Branch '{}' completed: {}", label, outcome);
            } else {
                sflog_warn!("Branch '{}' did not succeed: {}", label, outcome);
            }
        }
        if let Some(summary) = join_summary(queue_label, &outcomes) {
            sflog_warn!("{}", summary);
        }
        pending.clear();
    }

    /// Run one leaf to completion on the current thread.
    fn run_leaf(&self, node: &TaskNode, params: &HashMap<String, String>) -> TaskResult {
        sflog!("Running leaf '{}'", node.label());
        node.set_result(TaskResult::Running);

        let text = match node.script() {
            Ok(text) => text,
            Err(e) => {
                sflog_error!("Cannot read script for '{}': {}", node.label(), e);
                node.set_result(TaskResult::ExecutionError);
                return TaskResult::ExecutionError;
            }
        };

        let result = if self.options.dry_run {
            for stmt in script::split_statements(text) {
                sflog!("[dry-run] {}: {}", node.label(), script::substitute(&stmt, params));
            }
            TaskResult::Success
        } else if self.backend.run_script(text, params) {
            TaskResult::Success
        } else {
            TaskResult::Failure
        };

        node.set_result(result);
        sflog!("Leaf '{}' finished: {}", node.label(), result);
        result
    }
}

/// Aggregate barrier warning for a queue, `None` when every joined
/// branch succeeded.
fn join_summary(queue_label: &str, outcomes: &[(String, TaskResult)]) -> Option<String> {
    let failed = outcomes.iter().filter(|(_, r)| !r.is_success()).count();
    if failed == 0 {
        return None;
    }
    Some(format!(
        "Queue '{}': {} of {} joined branch(es) did not succeed",
        queue_label,
        failed,
        outcomes.len()
    ))
}
