//! Scheduling core: nodes, queues, outcomes, workers, execution.

pub mod executor;
pub mod node;
pub mod pool;
pub mod queue;
pub mod result;

pub use executor::{ExecOptions, TaskExecutor};
pub use node::{NodeReport, TaskNode};
pub use pool::{TaskHandle, WorkerContext, WorkerPool};
pub use queue::{QueueReport, TaskQueue};
pub use result::{ResultCell, TaskResult};
