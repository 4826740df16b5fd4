//! Overlay (duplex) collection: a writable scratch area in front of a
//! read-only source.

use std::sync::Arc;

use async_trait::async_trait;

use super::PriorityCollection;
use crate::error::Result;
use crate::reader::{Reader, ResolveOptions, WriteOptions, Writer};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// One writable overlay composed over one read-only source.
///
/// All reads go through an internal [`PriorityCollection`] with the overlay
/// first, so in-progress edits always win. Writes target the overlay only —
/// the source is never touched.
pub struct OverlayCollection {
    name: String,
    reader: Arc<dyn Reader>,
    writer: Arc<dyn Writer>,
    merged: PriorityCollection,
}

impl OverlayCollection {
    pub fn new(name: impl Into<String>, reader: Arc<dyn Reader>, writer: Arc<dyn Writer>) -> Self {
        let name = name.into();
        let overlay_as_reader: Arc<dyn Reader> = writer.clone();
        let merged = PriorityCollection::new(
            name.clone(),
            vec![overlay_as_reader, reader.clone()],
        );
        Self {
            name,
            reader,
            writer,
            merged,
        }
    }

    /// The read-only source.
    pub fn reader(&self) -> &Arc<dyn Reader> {
        &self.reader
    }

    /// The writable overlay.
    pub fn writer(&self) -> &Arc<dyn Writer> {
        &self.writer
    }

    /// Enumerate from the *source*, substituting the overlay's version for
    /// every path present in both.
    ///
    /// Used when a caller needs the canonical enumeration of original files
    /// while still seeing in-progress edits. Paths that exist only in the
    /// overlay do not appear.
    pub async fn by_glob_source(
        &self,
        patterns: &[&str],
        options: ResolveOptions,
    ) -> Result<Vec<Resource>> {
        let trace = QueryTrace::new(format!("by_glob_source {patterns:?}"));
        let originals = self.reader.resolve_glob(patterns, &options, &trace).await?;

        let substituted = futures::future::join_all(originals.into_iter().map(|original| {
            let trace = &trace;
            let options = &options;
            async move {
                match self
                    .writer
                    .resolve_path(original.path(), options, trace)
                    .await?
                {
                    Some(overlay) => Ok(overlay),
                    None => Ok(original),
                }
            }
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let mut resources = substituted;
        for resource in &mut resources {
            resource.push_collection(&self.name);
        }
        trace.report();
        Ok(resources)
    }
}

#[async_trait]
impl Reader for OverlayCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        self.merged.resolve_path(virtual_path, options, trace).await
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        self.merged.resolve_glob(patterns, options, trace).await
    }
}

#[async_trait]
impl Writer for OverlayCollection {
    async fn write(&self, resource: &mut Resource, options: WriteOptions) -> Result<()> {
        self.writer.write(resource, options).await
    }
}
