//! Metadata documents: one persisted JSON object per artifact.

mod fields;
mod store;
mod types;

pub use fields::ArtifactFields;
pub use store::{DocumentError, DocumentStore, LocatedDocument, ScannedDocument};
pub use types::{Document, TaskFailure};
