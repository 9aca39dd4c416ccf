//! Scriptflow: a hierarchical script-tree scheduler.
//!
//! A run takes a directory of scripts and turns it into a task tree:
//! files become leaf tasks and subdirectories become branch tasks, all
//! ordered by name. Leaves run sequentially on their queue's thread;
//! branches run concurrently on pool workers, and a leaf waits for
//! every branch launched before it in the same queue. For example:
//!
//! ```text
//! jobs/
//!   00_init.sql        runs first
//!   10_dims/           launched concurrently...
//!     00_load.sql
//!   20_facts/          ...with this branch
//!     00_load.sql
//!   30_publish.sql     waits for both, then runs
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod fsutil;
pub mod log;
pub mod notify;
pub mod script;

pub use config::Config;
pub use driver::{Driver, RunReport};
pub use error::{Error, Result};

pub use self::core::{TaskNode, TaskQueue, TaskResult, WorkerPool};
