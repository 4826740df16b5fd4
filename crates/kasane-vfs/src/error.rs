//! Error types for virtual filesystem operations.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = VfsError> = std::result::Result<T, E>;

/// Errors that can occur during resource and reader operations.
///
/// "Not found" is never an error: path lookups return `Ok(None)` and glob
/// queries return an empty list. The variants here are contract violations
/// surfaced to the direct caller, or I/O failures propagated from the
/// operation that touched the backing store.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A virtual path must be absolute (start with `/`).
    #[error("virtual path is not absolute: {0}")]
    PathNotAbsolute(String),

    /// A virtual base path must be absolute and end with `/`.
    #[error("invalid virtual base path: {0}")]
    InvalidBasePath(String),

    /// More than one content source supplied at construction.
    #[error("conflicting content parameters for resource {0}")]
    ContentConflict(String),

    /// Content was vended as a single-use stream and not replaced since.
    #[error("content of resource {0} has been drained")]
    ContentDrained(String),

    /// A content read on a resource that never had content set.
    #[error("resource {0} has no content")]
    NoContent(String),

    /// A resource already belongs to a different project.
    #[error("resource {path} is already associated with project {current}")]
    ProjectReassigned { path: String, current: String },

    /// `read_only` and `drain` are mutually exclusive write options.
    #[error("write options read_only and drain are mutually exclusive")]
    OptionConflict,

    /// No configured writer prefix matches the resource path.
    #[error("no writer configured for path {0}")]
    NoWriterForPath(String),

    /// A write addressed a path outside the adapter's base path.
    #[error("path {path} is outside the writable namespace {base}")]
    WriteOutsideNamespace { path: String, base: String },

    /// Pattern parsing failed.
    #[error(transparent)]
    Pattern(#[from] kasane_glob::PatternError),

    /// String content read on non-UTF-8 bytes.
    #[error("resource content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
