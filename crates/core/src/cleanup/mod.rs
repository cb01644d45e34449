//! Token-based cleanup of everything associated with a URL.
//!
//! A plan is computed first (index entries, documents, raw captures, partial
//! downloads, sidecars); a dry run reports the plan, a real run executes it.

mod cleaner;
mod planner;
mod tokens;
mod types;

pub use cleaner::Cleaner;
pub use planner::CleanupPlanner;
pub use tokens::{TokenSet, MIN_TOKEN_LEN};
pub use types::{CleanupError, CleanupFailure, CleanupPlan, CleanupReport, CleanupRequest};
