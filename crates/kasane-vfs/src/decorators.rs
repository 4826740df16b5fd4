//! Decorator readers: thin wrappers that re-map or filter an inner reader.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::path;
use crate::reader::{Reader, ResolveOptions};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// Predicate deciding whether a resolved resource is visible.
pub type FilterCallback = Arc<dyn Fn(&Resource) -> bool + Send + Sync>;

/// Re-maps a virtual path prefix onto another namespace without copying any
/// data.
///
/// Queries under `link_path` are forwarded to the inner reader with the
/// prefix swapped for `target_path`; resolved resources are re-addressed
/// back into the link namespace. Queries outside the link prefix resolve to
/// nothing.
pub struct LinkReader {
    name: String,
    reader: Arc<dyn Reader>,
    link_path: String,
    target_path: String,
}

impl LinkReader {
    /// Both paths must be absolute with trailing slash.
    pub fn new(
        name: impl Into<String>,
        reader: Arc<dyn Reader>,
        link_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Result<Self> {
        let link_path = link_path.into();
        let target_path = target_path.into();
        path::validate_base(&link_path)?;
        path::validate_base(&target_path)?;
        Ok(Self {
            name: name.into(),
            reader,
            link_path,
            target_path,
        })
    }

    fn to_target(&self, virtual_path: &str) -> Option<String> {
        let relative = virtual_path.strip_prefix(&self.link_path)?;
        Some(format!("{}{relative}", self.target_path))
    }

    fn relink(&self, resource: &mut Resource) -> Result<()> {
        if let Some(relative) = resource.path().strip_prefix(&self.target_path) {
            let linked = format!("{}{relative}", self.link_path);
            resource.set_path(linked)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Reader for LinkReader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        let normalized = path::normalize(virtual_path)?;
        let Some(target) = self.to_target(&normalized) else {
            return Ok(None);
        };
        match self.reader.resolve_path(&target, options, trace).await? {
            Some(mut resource) => {
                self.relink(&mut resource)?;
                Ok(Some(resource))
            }
            None => Ok(None),
        }
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        let rewritten: Vec<String> = patterns
            .iter()
            .filter_map(|pattern| self.to_target(pattern))
            .collect();
        if rewritten.is_empty() {
            return Ok(Vec::new());
        }
        let rewritten_refs: Vec<&str> = rewritten.iter().map(String::as_str).collect();
        let mut resources = self
            .reader
            .resolve_glob(&rewritten_refs, options, trace)
            .await?;
        for resource in &mut resources {
            self.relink(resource)?;
        }
        Ok(resources)
    }
}

/// Hides resources a caller-supplied predicate rejects.
pub struct FilterReader {
    name: String,
    reader: Arc<dyn Reader>,
    callback: FilterCallback,
}

impl FilterReader {
    pub fn new(
        name: impl Into<String>,
        reader: Arc<dyn Reader>,
        callback: FilterCallback,
    ) -> Self {
        Self {
            name: name.into(),
            reader,
            callback,
        }
    }
}

#[async_trait]
impl Reader for FilterReader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        match self.reader.resolve_path(virtual_path, options, trace).await? {
            Some(resource) if (self.callback)(&resource) => Ok(Some(resource)),
            _ => Ok(None),
        }
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        let mut resources = self.reader.resolve_glob(patterns, options, trace).await?;
        resources.retain(|resource| (self.callback)(resource));
        Ok(resources)
    }
}
