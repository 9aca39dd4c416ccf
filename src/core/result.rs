//! Task outcomes and the atomic cell that publishes them.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Outcome of a task node or a whole queue execution.
///
/// A node's result moves monotonically from `NotStarted` through
/// `Running` to exactly one terminal state. The three non-Success,
/// non-Failure terminals describe how a branch future ended: cancelled
/// before it ran, died from an unexpected fault, or had its result
/// handoff interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskResult {
    NotStarted = 0,
    Running = 1,
    Success = 2,
    Failure = 3,
    Cancelled = 4,
    ExecutionError = 5,
    Interrupted = 6,
}

impl TaskResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskResult::NotStarted => "not_started",
            TaskResult::Running => "running",
            TaskResult::Success => "success",
            TaskResult::Failure => "failure",
            TaskResult::Cancelled => "cancelled",
            TaskResult::ExecutionError => "execution_error",
            TaskResult::Interrupted => "interrupted",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success)
    }

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskResult::NotStarted | TaskResult::Running)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskResult::NotStarted,
            1 => TaskResult::Running,
            2 => TaskResult::Success,
            3 => TaskResult::Failure,
            4 => TaskResult::Cancelled,
            5 => TaskResult::ExecutionError,
            _ => TaskResult::Interrupted,
        }
    }
}

impl std::fmt::Display for TaskResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lock-free result slot on a task node.
///
/// Written only by the executor thread that owns the node; read by
/// ancestor threads checking aggregate success and by reporting after
/// the run.
#[derive(Debug)]
pub struct ResultCell(AtomicU8);

impl ResultCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(TaskResult::NotStarted as u8))
    }

    pub fn get(&self) -> TaskResult {
        TaskResult::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, result: TaskResult) {
        self.0.store(result as u8, Ordering::Release);
    }
}

impl Default for ResultCell {
    fn default() -> Self {
        Self::new()
    }
}
