//! Content diffing for dirmirror
//!
//! Turns two versions of a file into an ordered list of edits. The
//! change log keeps only the [`DiffRecord`] (insertions and deletions);
//! the full [`Edit`] script, equal spans included, is available for
//! callers that need the unchanged context too.

pub mod diff;
pub mod error;

pub use diff::{DiffEngine, DiffRecord, DiffSpan, Edit, EditKind, SpanKind, apply};
pub use error::{Error, Result};
