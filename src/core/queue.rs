//! Ordered, tree-shaped collection of task nodes.
//!
//! A queue is built once from a directory snapshot before execution
//! starts and is read-only afterwards; `push` exists for assembling
//! queues by hand in tests. Node order is the lexicographic order of
//! the entry names at that directory level, files and subdirectories
//! sorted together.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::core::node::{NodeReport, TaskNode};
use crate::{fsutil, sflog_trace, Result};

/// Label used for a queue with no backing directory.
pub const EMPTY_LABEL: &str = "Empty";

#[derive(Debug)]
pub struct TaskQueue {
    label: String,
    depth: usize,
    params: Arc<HashMap<String, String>>,
    items: Vec<TaskNode>,
}

/// Serializable snapshot of a queue for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    pub label: String,
    pub items: Vec<NodeReport>,
}

impl TaskQueue {
    /// The sentinel queue for an absent root: label "Empty", no items.
    pub fn empty() -> Self {
        sflog_trace!("Building empty task queue");
        Self {
            label: EMPTY_LABEL.to_string(),
            depth: 0,
            params: Arc::new(HashMap::new()),
            items: Vec::new(),
        }
    }

    /// Create a bare queue for hand assembly (tests only; execution
    /// always uses queues built from a directory snapshot).
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            depth: 0,
            params: Arc::new(HashMap::new()),
            items: Vec::new(),
        }
    }

    /// As `new`, with a parameter map attached.
    pub fn with_params(label: &str, params: HashMap<String, String>) -> Self {
        Self {
            label: label.to_string(),
            depth: 0,
            params: Arc::new(params),
            items: Vec::new(),
        }
    }

    /// Build a queue tree from a directory root.
    ///
    /// Every entry at a level that is a directory or whose name ends
    /// with `suffix` (case-insensitive) becomes exactly one node, in
    /// lexicographic name order; anything else is silently skipped.
    /// Subdirectories become branch nodes one depth deeper. An absent
    /// root yields the sentinel empty queue. Enumeration failure is an
    /// error for the whole build, never a partial tree.
    pub fn from_root(
        root: Option<&Path>,
        params: HashMap<String, String>,
        suffix: &str,
    ) -> Result<Self> {
        match root {
            None => Ok(Self::empty()),
            Some(dir) => Self::from_dir(dir, Arc::new(params), 0, suffix),
        }
    }

    fn from_dir(
        dir: &Path,
        params: Arc<HashMap<String, String>>,
        depth: usize,
        suffix: &str,
    ) -> Result<Self> {
        let label = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        sflog_trace!("Depth {}: building task queue from {}", depth, dir.display());

        let suffix_lc = suffix.to_lowercase();
        let mut entries: Vec<_> = fsutil::list_entries(dir)?
            .into_iter()
            .filter(|p| {
                fsutil::is_directory(p)
                    || p.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase().ends_with(&suffix_lc))
                        .unwrap_or(false)
            })
            .collect();
        entries.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            if fsutil::is_directory(&entry) {
                let child = Self::from_dir(&entry, Arc::clone(&params), depth + 1, suffix)?;
                let child_label = child.label.clone();
                items.push(TaskNode::branch(&child_label, Arc::new(child)));
            } else {
                items.push(TaskNode::leaf_file(&entry));
            }
        }

        Ok(Self {
            label,
            depth,
            params,
            items,
        })
    }

    /// Append a node (test construction only).
    pub fn push(&mut self, node: TaskNode) {
        self.items.push(node);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn params(&self) -> &Arc<HashMap<String, String>> {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TaskNode> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskNode> {
        self.items.iter()
    }

    /// Snapshot the queue and all results for reporting.
    pub fn report(&self) -> QueueReport {
        QueueReport {
            label: self.label.clone(),
            items: self.items.iter().map(TaskNode::report).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TaskQueue {
    type Item = &'a TaskNode;
    type IntoIter = std::slice::Iter<'a, TaskNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl std::fmt::Display for TaskQueue {
    /// Indented tree rendering, one line per node.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.depth == 0 && !self.params.is_empty() {
            let mut keys: Vec<_> = self.params.keys().collect();
            keys.sort();
            write!(f, "Params:")?;
            for k in keys {
                write!(f, " {}={}", k, self.params[k])?;
            }
            writeln!(f)?;
        }
        for node in &self.items {
            writeln!(f, "{}- {}", "   ".repeat(self.depth), node)?;
            if node.is_branch() {
                write!(f, "{}", node.children())?;
            }
        }
        Ok(())
    }
}
