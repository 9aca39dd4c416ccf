//! Task node: a single schedulable unit in the tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::OnceLock;

use serde::Serialize;

use crate::core::queue::TaskQueue;
use crate::core::result::{ResultCell, TaskResult};
use crate::{fsutil, sflog_trace, Error, Result};

/// Where a leaf's script text comes from.
///
/// File-backed scripts are read on first access and cached for the
/// node's lifetime.
#[derive(Debug)]
enum ScriptSource {
    Inline(String),
    File {
        path: PathBuf,
        cached: OnceLock<String>,
    },
    None,
}

/// A single schedulable unit: a leaf wrapping one script, or a branch
/// wrapping an ordered sub-queue.
///
/// A node is a branch iff its children queue is non-empty; branches
/// never expose script content. The result is written only by the
/// executor thread that owns the node.
#[derive(Debug)]
pub struct TaskNode {
    label: String,
    source: ScriptSource,
    children: Arc<TaskQueue>,
    result: ResultCell,
}

/// Serializable snapshot of a node for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub label: String,
    pub kind: &'static str,
    pub result: TaskResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeReport>,
}

impl TaskNode {
    /// Create a leaf node with inline script text.
    pub fn leaf_inline(label: &str, script: &str) -> Self {
        sflog_trace!("Building leaf node '{}' (inline)", label);
        Self {
            label: label.to_string(),
            source: ScriptSource::Inline(script.to_string()),
            children: Arc::new(TaskQueue::empty()),
            result: ResultCell::new(),
        }
    }

    /// Create a leaf node backed by a script file; the text is read
    /// lazily on first access.
    pub fn leaf_file(path: &Path) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sflog_trace!("Building leaf node '{}' from {}", label, path.display());
        Self {
            label,
            source: ScriptSource::File {
                path: path.to_path_buf(),
                cached: OnceLock::new(),
            },
            children: Arc::new(TaskQueue::empty()),
            result: ResultCell::new(),
        }
    }

    /// Create a branch node over a sub-queue.
    pub fn branch(label: &str, children: Arc<TaskQueue>) -> Self {
        sflog_trace!(
            "Building branch node '{}' with {} item(s)",
            label,
            children.len()
        );
        Self {
            label: label.to_string(),
            source: ScriptSource::None,
            children,
            result: ResultCell::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_branch()
    }

    /// Whether this node carries script content to run. False for
    /// branches and for nodes built from empty directories.
    pub fn has_script(&self) -> bool {
        !matches!(self.source, ScriptSource::None)
    }

    /// The node's sub-queue (empty for leaves).
    pub fn children(&self) -> &Arc<TaskQueue> {
        &self.children
    }

    /// Resolve this leaf's script text, reading and caching file-backed
    /// content on first access.
    ///
    /// # Errors
    ///
    /// Returns `MissingScript` for branches and sourceless nodes, or the
    /// underlying read error for file-backed leaves.
    pub fn script(&self) -> Result<&str> {
        if self.is_branch() {
            return Err(Error::MissingScript(self.label.clone()));
        }
        match &self.source {
            ScriptSource::Inline(text) => Ok(text),
            ScriptSource::File { path, cached } => {
                if let Some(text) = cached.get() {
                    return Ok(text);
                }
                let text = fsutil::read_text(path)?;
                // Single owner thread; a lost race cannot happen, and a
                // set after another set would return the first value anyway.
                let _ = cached.set(text);
                Ok(cached.get().ok_or_else(|| Error::MissingScript(self.label.clone()))?)
            }
            ScriptSource::None => Err(Error::MissingScript(self.label.clone())),
        }
    }

    pub fn result(&self) -> TaskResult {
        self.result.get()
    }

    pub fn set_result(&self, result: TaskResult) {
        sflog_trace!(
            "Node '{}' result {} -> {}",
            self.label,
            self.result.get(),
            result
        );
        self.result.set(result);
    }

    /// Snapshot this node and its subtree for reporting.
    pub fn report(&self) -> NodeReport {
        NodeReport {
            label: self.label.clone(),
            kind: if self.is_branch() { "branch" } else { "leaf" },
            result: self.result(),
            children: self.children.iter().map(TaskNode::report).collect(),
        }
    }
}

impl std::fmt::Display for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.label,
            if self.is_branch() { "branch" } else { "leaf" },
            self.result()
        )
    }
}
