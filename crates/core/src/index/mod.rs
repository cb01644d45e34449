//! URL index: a line-delimited log of URL -> document pointers.

mod record;
mod store;

pub use record::IndexRecord;
pub use store::{IndexError, UrlIndex};
