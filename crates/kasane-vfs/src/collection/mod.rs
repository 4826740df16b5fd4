//! Collections: readers and writers composed from other readers and writers.
//!
//! Collections hold no resource state — they are pure orchestration over
//! their members, and members compose recursively (a collection is itself a
//! reader). Four composition strategies exist:
//!
//! - [`ReaderCollection`] — parallel fan-out, results unioned without
//!   deduplication
//! - [`PriorityCollection`] — deterministic precedence with first-path-wins
//!   deduplication
//! - [`OverlayCollection`] — a writable overlay in front of a read-only
//!   source
//! - [`WriteRouter`] — writes routed by longest matching base path, reads
//!   fanned out

mod overlay;
mod priority;
mod reader_collection;
mod write_router;

pub use overlay::OverlayCollection;
pub use priority::PriorityCollection;
pub use reader_collection::ReaderCollection;
pub use write_router::WriteRouter;
