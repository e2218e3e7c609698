//! Per-part diagnostics outcomes.
//!
//! Several failure paths around file persistence are deliberately absorbed:
//! a declined `handle`, a pre-existing destination, a swallowed I/O error.
//! The decoder reports each part's fate on an optional channel so those
//! silent paths stay observable without changing the caller-facing result.

use std::path::PathBuf;

/// Why a file part was not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The `handle` policy resolved to `false`.
    Declined,
    /// The part carried no filename and no `save_as` hook supplied one.
    Unnamed,
    /// The destination already existed as a file or directory.
    AlreadyExists,
    /// Opening or writing the destination failed.
    Io(String),
}

/// The fate of one file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    /// The part was streamed to disk and recorded in the result.
    Written {
        /// The form field name the file was submitted under.
        field_name: String,
        /// The destination the file was written to.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// The part was drained and discarded.
    Skipped {
        /// The form field name the file was submitted under.
        field_name: String,
        /// Why the part was not persisted.
        reason: SkipReason,
    },
}
