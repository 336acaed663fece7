//! Result types for a conversion run.
//!
//! A run produces one [`PageResult`] per page, collected in page order into a
//! [`DocumentText`], which renders the final string.

mod document;
mod page;

pub use document::{DocumentText, ExtractionStats};
pub use page::PageResult;
