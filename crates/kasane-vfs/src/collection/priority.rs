//! Ordered-precedence collection.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::reader::{Reader, ResolveOptions};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// Queries members with deterministic precedence: earlier members win.
///
/// Glob queries still fan out concurrently, but the merge preserves member
/// order and drops later duplicates of a virtual path already seen. Path
/// lookups are strictly sequential — correctness requires respecting the
/// order, so there is nothing to gain from racing.
pub struct PriorityCollection {
    name: String,
    members: Vec<Arc<dyn Reader>>,
}

impl PriorityCollection {
    /// `members` in priority order, highest first.
    pub fn new(name: impl Into<String>, members: Vec<Arc<dyn Reader>>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

#[async_trait]
impl Reader for PriorityCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        trace.collection(&self.name);
        for member in &self.members {
            if let Some(mut resource) = member.resolve_path(virtual_path, options, trace).await? {
                resource.push_collection(&self.name);
                return Ok(Some(resource));
            }
        }
        Ok(None)
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        trace.collection(&self.name);
        let member_results = futures::future::join_all(
            self.members
                .iter()
                .map(|member| member.resolve_glob(patterns, options, trace)),
        )
        .await;

        let mut seen: HashSet<String> = HashSet::new();
        let mut resources = Vec::new();
        for result in member_results {
            for mut resource in result? {
                if seen.insert(resource.path().to_string()) {
                    resource.push_collection(&self.name);
                    resources.push(resource);
                }
            }
        }
        Ok(resources)
    }
}
