//! Per-artifact task lifecycle and the ordered task registry.

mod registry;
mod state;

pub use registry::{InputKind, TaskDescriptor, TaskRegistry};
pub use state::{TaskMap, TaskState, UpdateOutcome};
