//! Top-level run driver.
//!
//! Owns the pool, backend, and notifier for one run: validates the
//! root, builds the queue tree, hands the root queue to a pool worker,
//! polls until it settles, drains the pool, and reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;

use crate::backend::{ProcessBackend, ScriptBackend};
use crate::config::Config;
use crate::core::{ExecOptions, QueueReport, TaskExecutor, TaskQueue, TaskResult, WorkerPool};
use crate::notify::Notifier;
use crate::{fsutil, sflog, sflog_error, Error, Result};

/// Handle-polling granularity; pool monitoring runs at the configured
/// poll interval on top of this.
const RUN_POLL: Duration = Duration::from_millis(100);

/// Placeholder backend for dry runs, which never execute statements.
struct DryRunBackend;

impl ScriptBackend for DryRunBackend {
    fn run_statement(&self, _statement: &str) -> Result<()> {
        Err(Error::NoBackend)
    }
}

/// Outcome of a whole run, serializable for `--json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub result: TaskResult,
    pub started_at: chrono::DateTime<Local>,
    pub duration_secs: f64,
    pub tree: QueueReport,
}

pub struct Driver {
    config: Config,
    pool: Arc<WorkerPool>,
    backend: Arc<dyn ScriptBackend>,
    notifier: Notifier,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").finish_non_exhaustive()
    }
}

impl Driver {
    /// Build a driver from configuration, constructing a process backend
    /// from `backend_command`.
    ///
    /// # Errors
    ///
    /// `NoBackend` when no backend command is configured and this is not
    /// a dry run.
    pub fn from_config(config: Config) -> Result<Self> {
        let backend: Arc<dyn ScriptBackend> = match &config.backend_command {
            Some(command) => Arc::new(ProcessBackend::new(command)?),
            None if config.dry_run => Arc::new(DryRunBackend),
            None => return Err(Error::NoBackend),
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Build a driver around an existing backend.
    pub fn with_backend(config: Config, backend: Arc<dyn ScriptBackend>) -> Self {
        let notifier = Notifier::new(config.notify.clone());
        Self {
            config,
            pool: Arc::new(WorkerPool::new()),
            backend,
            notifier,
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Validate the root and build the queue tree, without running it.
    pub fn build_queue(&self) -> Result<TaskQueue> {
        let root = match &self.config.root {
            None => None,
            Some(root) => {
                if !fsutil::exists(root) {
                    return Err(Error::RootNotFound(root.display().to_string()));
                }
                if !fsutil::is_directory(root) {
                    return Err(Error::NotADirectory(root.display().to_string()));
                }
                Some(root.as_path())
            }
        };
        TaskQueue::from_root(root, self.run_params(), &self.config.script_suffix)
    }

    /// Configured parameters plus `run_date` (today, `YYYY-MM-DD`) when
    /// not already set.
    fn run_params(&self) -> HashMap<String, String> {
        let mut params = self.config.params.clone();
        params
            .entry("run_date".to_string())
            .or_insert_with(|| Local::now().format("%Y-%m-%d").to_string());
        params
    }

    /// Execute the whole tree and report.
    ///
    /// The root queue runs on a pool worker like any branch; the driver
    /// thread polls its handle, logging pool status at the configured
    /// interval, then drains the pool before reporting. The drain runs
    /// whether or not the root queue succeeded.
    pub fn run(&self) -> Result<RunReport> {
        let started_at = Local::now();
        let started = Instant::now();

        let queue = Arc::new(self.build_queue()?);
        sflog!("Task tree:\n{}", queue);
        if self.config.dry_run {
            sflog!("Dry run: statements will be logged, not executed");
        }

        let executor = TaskExecutor::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.backend),
            ExecOptions {
                dry_run: self.config.dry_run,
                poll_interval: self.config.poll_interval(),
            },
        );
        let context = self.pool.acquire(queue.label())?;
        let root_queue = Arc::clone(&queue);
        let handle = context.submit(move || executor.run(&root_queue));

        let interval = self.config.poll_interval();
        let mut last_monitor = Instant::now();
        while !handle.is_finished() {
            std::thread::sleep(RUN_POLL);
            if last_monitor.elapsed() >= interval {
                self.pool.monitor();
                last_monitor = Instant::now();
            }
        }

        self.pool.drain();

        let result = handle.outcome();
        let report = RunReport {
            result,
            started_at,
            duration_secs: started.elapsed().as_secs_f64(),
            tree: queue.report(),
        };

        let subject = format!("scriptflow run {}: {}", result, queue.label());
        let body = format!("{}", queue);
        if result.is_success() {
            sflog!("Run completed: {}", result);
            self.notifier.notify_success(&subject, &body);
        } else {
            sflog_error!("Run completed: {}", result);
            self.notifier.notify_failure(&subject, &body);
        }

        Ok(report)
    }
}
