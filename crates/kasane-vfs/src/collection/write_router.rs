//! Write routing by longest matching base path.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::ReaderCollection;
use crate::error::{Result, VfsError};
use crate::path;
use crate::reader::{Reader, ResolveOptions, WriteOptions, Writer};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// Routes each write to exactly one of several writers, selected by the
/// longest configured base-path prefix matching the resource path. Reads
/// fan out to all writers through a [`ReaderCollection`] — their namespaces
/// are assumed disjoint for reads.
///
/// Construction compiles the sorted prefixes into a single anchored
/// alternation, longest first, so one regex match yields the longest
/// matching prefix. A write whose path matches no prefix fails loudly.
pub struct WriteRouter {
    name: String,
    routes: Vec<(String, Arc<dyn Writer>)>,
    prefix_regex: Regex,
    reader: ReaderCollection,
}

impl WriteRouter {
    /// `mapping`: base-path prefix (absolute, trailing slash) → writer.
    pub fn new(
        name: impl Into<String>,
        mapping: Vec<(String, Arc<dyn Writer>)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut routes = mapping;
        for (prefix, _) in &routes {
            path::validate_base(prefix)?;
        }
        routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let alternation = routes
            .iter()
            .map(|(prefix, _)| regex::escape(prefix))
            .collect::<Vec<_>>()
            .join("|");
        let prefix_regex = Regex::new(&format!("^(?:{alternation})"))
            .expect("alternation of escaped literals is a valid regex");

        let members = routes
            .iter()
            .map(|(_, writer)| {
                let reader: Arc<dyn Reader> = writer.clone();
                reader
            })
            .collect();
        let reader = ReaderCollection::new(name.clone(), members);

        Ok(Self {
            name,
            routes,
            prefix_regex,
            reader,
        })
    }

    fn route(&self, virtual_path: &str) -> Option<&Arc<dyn Writer>> {
        let matched = self.prefix_regex.find(virtual_path)?;
        if matched.as_str().is_empty() {
            return None;
        }
        self.routes
            .iter()
            .find(|(prefix, _)| prefix == matched.as_str())
            .map(|(_, writer)| writer)
    }
}

#[async_trait]
impl Reader for WriteRouter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        self.reader.resolve_path(virtual_path, options, trace).await
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        self.reader.resolve_glob(patterns, options, trace).await
    }
}

#[async_trait]
impl Writer for WriteRouter {
    async fn write(&self, resource: &mut Resource, options: WriteOptions) -> Result<()> {
        let normalized = path::normalize(resource.path())?;
        let Some(writer) = self.route(&normalized) else {
            return Err(VfsError::NoWriterForPath(normalized));
        };
        writer.write(resource, options).await
    }
}
