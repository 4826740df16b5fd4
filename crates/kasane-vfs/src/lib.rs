//! Layered virtual filesystem for build tooling.
//!
//! Locates, reads, and writes named byte-content objects ("resources") that
//! may live on a real disk, purely in memory, or be synthesized on demand —
//! without callers knowing which. Multiple content sources compose into one
//! addressable namespace: project sources, generated output, and dependency
//! libraries each get an adapter, collections merge them, and an overlay
//! provides a writable scratch area on top of read-only sources.
//!
//! # Building blocks
//!
//! - [`Resource`] — content + metadata, addressed by an absolute POSIX-style
//!   virtual path
//! - [`DiskAdapter`] / [`MemoryAdapter`] — one backing store per namespace
//!   prefix
//! - [`ReaderCollection`] / [`PriorityCollection`] / [`OverlayCollection`] /
//!   [`WriteRouter`] — composition strategies over any [`Reader`]s
//! - [`FsInterface`] — conventional `stat`/`read_file`/`read_dir` facade
//! - [`LinkReader`] / [`FilterReader`] — prefix re-mapping and predicate
//!   decorators
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kasane_vfs::{
//!     MemoryAdapter, OverlayCollection, Reader, ResolveOptions, Resource,
//!     WriteOptions, Writer,
//! };
//!
//! # async fn example() -> kasane_vfs::Result<()> {
//! let sources = Arc::new(MemoryAdapter::with_base("/app/")?);
//! let scratch = Arc::new(MemoryAdapter::with_base("/app/")?);
//! let workspace = OverlayCollection::new("workspace", sources, scratch);
//!
//! let mut generated = Resource::from_string("/app/build-info.json", "{}")?;
//! workspace.write(&mut generated, WriteOptions::default()).await?;
//!
//! for mut resource in workspace.by_glob(&["/app/**/*.json"], ResolveOptions::default()).await? {
//!     let content = resource.as_buffer().await?;
//!     println!("{}: {} bytes", resource.path(), content.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Glob result order is deliberately unstable across calls; do not depend
//! on it.

mod adapter;
mod collection;
mod decorators;
mod error;
mod fs_interface;
pub mod path;
mod reader;
mod resource;
mod trace;

pub use adapter::{DiskAdapter, DiskAdapterConfig, MemoryAdapter, MemoryAdapterConfig};
pub use collection::{OverlayCollection, PriorityCollection, ReaderCollection, WriteRouter};
pub use decorators::{FilterCallback, FilterReader, LinkReader};
pub use error::{Result, VfsError};
pub use fs_interface::FsInterface;
pub use reader::{Reader, ResolveOptions, WriteOptions, Writer};
pub use resource::{
    ContentStream, Resource, ResourceBuilder, SourceMetadata, StatInfo, StreamFactory,
};
pub use trace::QueryTrace;
