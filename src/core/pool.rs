//! Worker pool: one dedicated thread per concurrent branch.
//!
//! `acquire` spawns a named worker thread parked on a one-slot channel
//! and hands back a context; `submit` sends the job across and returns
//! a handle the caller can poll. The pool keeps a registry of every
//! handle it ever produced so `drain` can wait for the whole run to
//! settle, including branches nobody awaited individually.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};

use crate::core::result::TaskResult;
use crate::{sflog, sflog_debug, sflog_error, sflog_warn, Error, Result};

type Job = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// How often `drain` re-checks outstanding workers.
const DRAIN_POLL: Duration = Duration::from_millis(50);

struct HandleInner {
    finished: AtomicBool,
    outcome: Mutex<Option<TaskResult>>,
}

/// Shared view of one worker's completion state.
///
/// `outcome` is meaningful only after `is_finished` returns true; until
/// then it reads as `Running`.
#[derive(Clone)]
pub struct TaskHandle {
    label: String,
    inner: Arc<HandleInner>,
}

impl TaskHandle {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            inner: Arc::new(HandleInner {
                finished: AtomicBool::new(false),
                outcome: Mutex::new(None),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// The worker's final outcome, `Running` while still in flight.
    ///
    /// A poisoned outcome slot reads as `Interrupted`.
    pub fn outcome(&self) -> TaskResult {
        if !self.is_finished() {
            return TaskResult::Running;
        }
        match self.inner.outcome.lock() {
            Ok(slot) => slot.unwrap_or(TaskResult::Interrupted),
            Err(_) => TaskResult::Interrupted,
        }
    }

    fn finish(&self, result: TaskResult) {
        if let Ok(mut slot) = self.inner.outcome.lock() {
            *slot = Some(result);
        }
        self.inner.finished.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("label", &self.label)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// An acquired worker awaiting exactly one job.
///
/// Dropping the context without submitting closes the channel; the
/// worker then records `Cancelled` and exits.
#[derive(Debug)]
pub struct WorkerContext {
    label: String,
    sender: Sender<Job>,
    handle: TaskHandle,
}

impl WorkerContext {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Hand the job to the worker thread and return its handle.
    pub fn submit<F>(self, job: F) -> TaskHandle
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        sflog_debug!("Submitting job to worker '{}'", self.label);
        if self.sender.send(Box::new(job)).is_err() {
            // Worker died before taking the job; it already recorded a
            // terminal outcome on its way out.
            sflog_error!("Worker '{}' unavailable at submit", self.label);
        }
        self.handle
    }
}

struct PoolWorker {
    label: String,
    handle: TaskHandle,
    join: Option<JoinHandle<()>>,
}

/// Registry of branch workers for one run.
pub struct WorkerPool {
    workers: Mutex<Vec<PoolWorker>>,
    limit: Option<usize>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            limit: None,
        }
    }

    /// A pool that refuses to register more than `limit` workers.
    /// Acquisition beyond the limit fails the way thread-spawn failure
    /// does (tests use this to exercise that path).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            limit: Some(limit),
        }
    }

    /// Spawn a dedicated worker thread named after `label` and register
    /// it. The thread blocks until the returned context submits a job
    /// or is dropped.
    ///
    /// # Errors
    ///
    /// `Worker` when the thread cannot be spawned or the pool's worker
    /// limit is reached.
    pub fn acquire(&self, label: &str) -> Result<WorkerContext> {
        if let Some(limit) = self.limit {
            if self.registered() >= limit {
                return Err(Error::Worker(format!(
                    "worker limit ({}) reached acquiring '{}'",
                    limit, label
                )));
            }
        }

        let (tx, rx) = bounded::<Job>(1);
        let handle = TaskHandle::new(label);
        let thread_handle = handle.clone();
        let thread_label = label.to_string();

        let join = std::thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                let result = match rx.recv() {
                    Ok(job) => match catch_unwind(AssertUnwindSafe(job)) {
                        Ok(result) => result,
                        Err(_) => {
                            sflog_error!("Worker '{}' job panicked", thread_label);
                            TaskResult::ExecutionError
                        }
                    },
                    Err(_) => {
                        sflog_warn!("Worker '{}' cancelled before any job arrived", thread_label);
                        TaskResult::Cancelled
                    }
                };
                sflog_debug!("Worker '{}' finished: {}", thread_label, result);
                thread_handle.finish(result);
            })
            .map_err(|e| Error::Worker(format!("cannot spawn worker '{}': {}", label, e)))?;

        let mut workers = self
            .workers
            .lock()
            .map_err(|_| Error::Worker("worker registry poisoned".to_string()))?;
        workers.push(PoolWorker {
            label: label.to_string(),
            handle: handle.clone(),
            join: Some(join),
        });
        sflog_debug!(
            "Acquired worker '{}' ({} registered)",
            label,
            workers.len()
        );

        Ok(WorkerContext {
            label: label.to_string(),
            sender: tx,
            handle,
        })
    }

    /// Number of workers ever registered this run.
    pub fn registered(&self) -> usize {
        self.workers.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Number of registered workers not yet finished.
    pub fn outstanding(&self) -> usize {
        self.workers
            .lock()
            .map(|w| w.iter().filter(|p| !p.handle.is_finished()).count())
            .unwrap_or(0)
    }

    /// Log a snapshot of the registry.
    pub fn monitor(&self) {
        let Ok(workers) = self.workers.lock() else {
            sflog_warn!("Worker registry poisoned, skipping monitor");
            return;
        };
        let outstanding = workers.iter().filter(|p| !p.handle.is_finished()).count();
        sflog!(
            "Pool: {} worker(s) registered, {} outstanding",
            workers.len(),
            outstanding
        );
        for worker in workers.iter() {
            sflog_debug!("  worker '{}': {}", worker.label, worker.handle.outcome());
        }
    }

    /// Block until every registered worker has finished, then join the
    /// threads.
    ///
    /// New workers can only be acquired by threads that are themselves
    /// still running, so once every registered worker is finished the
    /// registry cannot grow and the wait terminates.
    pub fn drain(&self) {
        sflog!("Draining worker pool ({} registered)", self.registered());
        loop {
            if self.outstanding() == 0 {
                break;
            }
            std::thread::sleep(DRAIN_POLL);
        }

        let Ok(mut workers) = self.workers.lock() else {
            sflog_warn!("Worker registry poisoned, skipping join");
            return;
        };
        for worker in workers.iter_mut() {
            if let Some(join) = worker.join.take() {
                if join.join().is_err() {
                    sflog_error!("Worker thread '{}' terminated abnormally", worker.label);
                }
            }
        }
        sflog!("Pool drained: {} worker(s) completed", workers.len());
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
