//! External task workers.
//!
//! A worker receives one positional input (the URL for the download task, the
//! downloaded artifact path otherwise) and, on success, reports the path of
//! the artifact it produced. `CommandWorker` runs a configured program;
//! tests use `testing::MockWorker`.

mod command;
mod error;
mod traits;
mod types;

pub use command::CommandWorker;
pub use error::WorkerError;
pub use traits::TaskWorker;
pub use types::{TaskInput, TaskRequest, WorkerOutput};
