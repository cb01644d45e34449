//! Structured event journal.
//!
//! Components emit `JournalEvent`s through a `JournalHandle`; a single
//! `JournalWriter` task appends them to a JSONL file.

mod events;
mod handle;
mod writer;

pub use events::*;
pub use handle::*;
pub use writer::*;
