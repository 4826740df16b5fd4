//! kasane-glob: Glob pattern decomposition and matching for virtual paths.
//!
//! Provides:
//! - **expand_braces**: `{a,b}` brace expansion, including nested groups
//! - **segment_match**: shell-style matching within a single path segment
//!   (`*`, `?`, `[abc]`, `[a-z]`, `[!abc]`, `\` escapes)
//! - **PathPattern**: a parsed pattern — negation prefix plus one segment
//!   list per brace alternative — with `**` (globstar) path matching
//! - **PatternSet**: evaluation of a pattern list where `!`-prefixed
//!   patterns subtract from the positive matches
//!
//! Patterns are decomposed into per-segment sets so that consumers can walk
//! them against a directory prefix one segment at a time; path matching is
//! built on top of the same decomposition.

mod brace;
mod pattern;
mod segment;

pub use brace::expand_braces;
pub use pattern::{PathPattern, PatternSet};
pub use segment::{contains_meta, segment_match, Segment};

use thiserror::Error;

/// Errors from pattern parsing.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Brace expansion produced an unreasonable number of alternatives.
    #[error("pattern expands into too many alternatives: {0}")]
    TooManyAlternatives(usize),
}
