//! Parallel fan-out collection.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::Result;
use crate::reader::{Reader, ResolveOptions};
use crate::resource::Resource;
use crate::trace::QueryTrace;

/// Queries all members concurrently and unions the results.
///
/// Members are expected to own disjoint namespaces; when they overlap, glob
/// duplicates are intentional and surfaced — there is no deduplication here.
/// Path lookups resolve as soon as *any* member reports a hit; a global miss
/// is only declared once every member has spoken, so a fast miss never
/// blocks on a slow source.
pub struct ReaderCollection {
    name: String,
    members: Vec<Arc<dyn Reader>>,
}

impl ReaderCollection {
    pub fn new(name: impl Into<String>, members: Vec<Arc<dyn Reader>>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

#[async_trait]
impl Reader for ReaderCollection {
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
        let mut pending: FuturesUnordered<_> = self
            .members
            .iter()
            .map(|member| member.resolve_path(virtual_path, options, trace))
            .collect();

        while let Some(result) = pending.next().await {
            if let Some(mut resource) = result? {
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

        let mut resources = Vec::new();
        for result in member_results {
            resources.extend(result?);
        }
        for resource in &mut resources {
            resource.push_collection(&self.name);
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::reader::{WriteOptions, Writer};
    use std::time::Duration;

    async fn seeded(base: &str, paths: &[(&str, &str)]) -> Arc<MemoryAdapter> {
        let adapter = MemoryAdapter::with_base(base).unwrap();
        for (path, content) in paths {
            let mut res = Resource::from_string(*path, *content).unwrap();
            adapter.write(&mut res, WriteOptions::default()).await.unwrap();
        }
        Arc::new(adapter)
    }

    #[tokio::test]
    async fn glob_unions_without_dedup() {
        let a = seeded("/x/", &[("/x/shared.js", "from a")]).await;
        let b = seeded("/x/", &[("/x/shared.js", "from b")]).await;
        let collection = ReaderCollection::new("union", vec![a as _, b as _]);

        let resources = collection
            .by_glob(&["/x/**"], ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources.iter().all(|r| r.path() == "/x/shared.js"));
        assert!(resources.iter().all(|r| r.collections() == ["union"]));
    }

    #[tokio::test]
    async fn path_hit_from_any_member() {
        let a = seeded("/a/", &[("/a/only.js", "a")]).await;
        let b = seeded("/b/", &[("/b/only.js", "b")]).await;
        let collection = ReaderCollection::new("union", vec![a as _, b as _]);

        let mut found = collection
            .by_path("/b/only.js", ResolveOptions::default())
            .await
            .unwrap()
            .expect("hit");
        assert_eq!(found.as_string().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn fast_hit_does_not_wait_for_slow_miss() {
        struct SlowMiss;
        #[async_trait]
        impl Reader for SlowMiss {
            fn name(&self) -> &str {
                "slow-miss"
            }
            async fn resolve_path(
                &self,
                _virtual_path: &str,
                _options: &ResolveOptions,
                _trace: &QueryTrace,
            ) -> Result<Option<Resource>> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
            async fn resolve_glob(
                &self,
                _patterns: &[&str],
                _options: &ResolveOptions,
                _trace: &QueryTrace,
            ) -> Result<Vec<Resource>> {
                Ok(Vec::new())
            }
        }

        let fast = seeded("/x/", &[("/x/hit.js", "fast")]).await;
        let collection = ReaderCollection::new("union", vec![Arc::new(SlowMiss) as _, fast as _]);

        // Must resolve well before the slow member's 30s sleep.
        let found = tokio::time::timeout(
            Duration::from_secs(5),
            collection.by_path("/x/hit.js", ResolveOptions::default()),
        )
        .await
        .expect("resolved without waiting for the slow miss")
        .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn miss_requires_all_members_to_report() {
        let a = seeded("/a/", &[]).await;
        let b = seeded("/b/", &[]).await;
        let collection = ReaderCollection::new("union", vec![a as _, b as _]);

        let found = collection
            .by_path("/a/none.js", ResolveOptions::default())
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
