//! Reader/Writer capability traits.
//!
//! Everything that can resolve resources — adapters and collections alike —
//! implements [`Reader`]; writable components additionally implement
//! [`Writer`]. Readers compose recursively: a collection's members are just
//! other readers.
//!
//! The required `resolve_*` methods carry the [`QueryTrace`] of the logical
//! query; collections forward it to their members. The provided
//! `by_path`/`by_glob` wrappers are the public entry points: they open the
//! trace, and `by_glob` deliberately swaps a random element into the first
//! position of multi-result responses so that callers cannot come to depend
//! on any result ordering. Only the first element is randomized — a full
//! shuffle would change observable semantics downstream.

use async_trait::async_trait;
use rand::Rng;

use crate::error::{Result, VfsError};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// Options for path and glob resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Also resolve directories. Defaults to false: only files match.
    pub match_directories: bool,
}

/// Options for [`Writer::write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Make the destination non-writable after the write and rebind the
    /// resource's content to a lazy stream over the written file, releasing
    /// the in-memory buffer.
    pub read_only: bool,
    /// Empty the resource's content after the write. The caller asserts it
    /// will not read the resource again.
    pub drain: bool,
}

impl WriteOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.read_only && self.drain {
            return Err(VfsError::OptionConflict);
        }
        Ok(())
    }
}

/// A source of resources addressed by virtual path or glob pattern.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Name used in diagnostics and collection annotations.
    fn name(&self) -> &str;

    /// Resolve a single absolute virtual path.
    ///
    /// `Ok(None)` means "no resource here" — including "this path is not
    /// handled by this reader at all". Never an error.
    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>>;

    /// Resolve glob patterns to all matching resources.
    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>>;

    /// Public path lookup.
    async fn by_path(
        &self,
        virtual_path: &str,
        options: ResolveOptions,
    ) -> Result<Option<Resource>> {
        let trace = QueryTrace::new(format!("by_path {virtual_path}"));
        let resource = self.resolve_path(virtual_path, &options, &trace).await?;
        trace.report();
        Ok(resource)
    }

    /// Public glob query. Result order is deliberately unstable.
    async fn by_glob(&self, patterns: &[&str], options: ResolveOptions) -> Result<Vec<Resource>> {
        let trace = QueryTrace::new(format!("by_glob {patterns:?}"));
        let mut resources = self.resolve_glob(patterns, &options, &trace).await?;
        if resources.len() > 1 {
            let index = rand::thread_rng().gen_range(0..resources.len());
            resources.swap(0, index);
        }
        trace.report();
        Ok(resources)
    }
}

/// A [`Reader`] that also accepts writes.
#[async_trait]
pub trait Writer: Reader {
    /// Persist a resource into this writer's backing store.
    ///
    /// Mutates the resource only as the options demand: `read_only` rebinds
    /// the content handle, `drain` empties it.
    async fn write(&self, resource: &mut Resource, options: WriteOptions) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_write_options_rejected() {
        let options = WriteOptions {
            read_only: true,
            drain: true,
        };
        assert!(matches!(
            options.validate(),
            Err(VfsError::OptionConflict)
        ));
        assert!(WriteOptions::default().validate().is_ok());
    }
}
