//! Memory-backed adapter.
//!
//! The two maps (files, directories) are the actual storage; they mutate
//! only on write. Every resource handed out is a deep clone, so callers can
//! never observe or mutate a stored master copy.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::AdapterBase;
use crate::error::{Result, VfsError};
use crate::path;
use crate::reader::{Reader, ResolveOptions, WriteOptions, Writer};
use crate::resource::{Resource, StatInfo};
use crate::trace::QueryTrace;

/// Construction parameters for [`MemoryAdapter`].
#[derive(Debug, Default)]
pub struct MemoryAdapterConfig {
    /// Namespace prefix this adapter is responsible for. Absolute, trailing
    /// slash. Required.
    pub virtual_base_path: String,
    /// Glob patterns excluded from all queries.
    pub exclude_patterns: Vec<String>,
    /// Opaque back-reference assigned as the project of every produced
    /// resource.
    pub owner_tag: Option<String>,
}

#[derive(Default)]
struct MemoryIndex {
    files: HashMap<String, Resource>,
    dirs: HashMap<String, Resource>,
}

/// Adapter storing resources in process memory. State is process-lifetime
/// only.
pub struct MemoryAdapter {
    base: AdapterBase,
    index: RwLock<MemoryIndex>,
}

impl MemoryAdapter {
    pub fn new(config: MemoryAdapterConfig) -> Result<Self> {
        let base = AdapterBase::new(
            "memory",
            &config.virtual_base_path,
            &config.exclude_patterns,
            config.owner_tag,
        )?;
        Ok(Self {
            base,
            index: RwLock::new(MemoryIndex::default()),
        })
    }

    /// Shorthand for an adapter with no excludes and no owner tag.
    pub fn with_base(virtual_base_path: impl Into<String>) -> Result<Self> {
        Self::new(MemoryAdapterConfig {
            virtual_base_path: virtual_base_path.into(),
            ..Default::default()
        })
    }

    fn root_resource(&self) -> Result<Resource> {
        self.synthesize_dir(self.base.root_path())
    }

    fn synthesize_dir(&self, virtual_path: &str) -> Result<Resource> {
        let mut builder = Resource::builder(virtual_path).stat_info(StatInfo::dir_now());
        if let Some(tag) = self.base.owner_tag() {
            builder = builder.project(tag);
        }
        builder.build()
    }

    /// Deep-clone a stored master for hand-out, restoring the owner tag the
    /// clone dropped.
    async fn clone_out(&self, master: &mut Resource) -> Result<Resource> {
        let mut clone = master.clone_resource().await?;
        if let Some(tag) = self.base.owner_tag() {
            clone.set_project(tag)?;
        }
        Ok(clone)
    }
}

#[async_trait]
impl Reader for MemoryAdapter {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn resolve_path(
        &self,
        virtual_path: &str,
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Option<Resource>> {
        trace.path_call();
        let normalized = path::normalize(virtual_path)?;
        if self.base.is_excluded(&normalized) {
            return Ok(None);
        }
        let Some(relative) = self.base.to_relative(&normalized) else {
            return Ok(None);
        };
        if relative.is_empty() {
            return if options.match_directories {
                Ok(Some(self.root_resource()?))
            } else {
                Ok(None)
            };
        }

        let mut index = self.index.write().await;
        if let Some(master) = index.files.get_mut(relative) {
            return Ok(Some(self.clone_out(master).await?));
        }
        if options.match_directories {
            if let Some(master) = index.dirs.get_mut(relative) {
                return Ok(Some(self.clone_out(master).await?));
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
        trace.glob_call();
        let plan = self.base.prepare_glob(patterns)?;
        let mut resources = Vec::new();

        if options.match_directories {
            if plan.include_root {
                resources.push(self.root_resource()?);
            }
            for stub in &plan.virtual_dirs {
                resources.push(self.synthesize_dir(stub)?);
            }
        }

        if plan.set.is_empty() {
            return Ok(resources);
        }

        let mut index = self.index.write().await;
        let file_keys: Vec<String> = index
            .files
            .keys()
            .filter(|key| plan.set.matches(key))
            .cloned()
            .collect();
        for key in file_keys {
            let master = index.files.get_mut(&key).expect("key just collected");
            resources.push(self.clone_out(master).await?);
        }

        if options.match_directories {
            let dir_keys: Vec<String> = index
                .dirs
                .keys()
                .filter(|key| plan.set.matches(key))
                .cloned()
                .collect();
            for key in dir_keys {
                let master = index.dirs.get_mut(&key).expect("key just collected");
                resources.push(self.clone_out(master).await?);
            }
        }

        Ok(resources)
    }
}

#[async_trait]
impl Writer for MemoryAdapter {
    async fn write(&self, resource: &mut Resource, options: WriteOptions) -> Result<()> {
        options.validate()?;
        let normalized = path::normalize(resource.path())?;
        let Some(relative) = self.base.to_relative(&normalized) else {
            return Err(VfsError::WriteOutsideNamespace {
                path: normalized,
                base: self.base.virtual_base_path().to_string(),
            });
        };
        let relative = relative.to_string();

        // Deep clone so later mutations of the caller's instance cannot
        // reach the stored master.
        let master = resource.clone_resource().await?;

        let mut index = self.index.write().await;
        index.files.insert(relative.clone(), master);

        // Merge directory stubs for every ancestor of the written path.
        let segments = path::segments(&relative);
        let mut ancestor = String::new();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(segment);
            if !index.dirs.contains_key(&ancestor) {
                let stub = self.synthesize_dir(&self.base.to_virtual(&ancestor))?;
                index.dirs.insert(ancestor.clone(), stub);
            }
        }
        drop(index);

        if options.drain {
            resource.clear_content();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> MemoryAdapter {
        MemoryAdapter::with_base("/app/").unwrap()
    }

    async fn seed(adapter: &MemoryAdapter, path: &str, content: &str) {
        let mut res = Resource::from_string(path, content).unwrap();
        adapter.write(&mut res, WriteOptions::default()).await.unwrap();
    }

    #[tokio::test]
    async fn write_then_read() {
        let adapter = adapter();
        seed(&adapter, "/app/src/main.js", "content").await;

        let mut found = adapter
            .by_path("/app/src/main.js", ResolveOptions::default())
            .await
            .unwrap()
            .expect("resource");
        assert_eq!(found.as_string().await.unwrap(), "content");
    }

    #[tokio::test]
    async fn readers_get_independent_clones() {
        let adapter = adapter();
        seed(&adapter, "/app/a.js", "original").await;

        let mut first = adapter
            .by_path("/app/a.js", ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        first.set_string("mutated");

        let mut second = adapter
            .by_path("/app/a.js", ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.as_string().await.unwrap(), "original");
    }

    #[tokio::test]
    async fn stored_master_is_independent_of_the_written_instance() {
        let adapter = adapter();
        let mut res = Resource::from_string("/app/a.js", "original").unwrap();
        adapter.write(&mut res, WriteOptions::default()).await.unwrap();
        res.set_string("mutated after write");

        let mut found = adapter
            .by_path("/app/a.js", ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.as_string().await.unwrap(), "original");
    }

    #[tokio::test]
    async fn paths_outside_base_are_not_handled() {
        let adapter = adapter();
        seed(&adapter, "/app/a.js", "x").await;

        let found = adapter
            .by_path("/other/a.js", ResolveOptions::default())
            .await
            .unwrap();
        assert!(found.is_none());

        let mut res = Resource::from_string("/other/a.js", "x").unwrap();
        assert!(matches!(
            adapter.write(&mut res, WriteOptions::default()).await,
            Err(VfsError::WriteOutsideNamespace { .. })
        ));
    }

    #[tokio::test]
    async fn glob_matches_rewritten_patterns() {
        let adapter = adapter();
        seed(&adapter, "/app/src/main.js", "a").await;
        seed(&adapter, "/app/src/util/helper.js", "b").await;
        seed(&adapter, "/app/index.html", "c").await;

        let resources = adapter
            .by_glob(&["/app/src/**/*.js"], ResolveOptions::default())
            .await
            .unwrap();
        let mut paths: Vec<_> = resources.iter().map(|r| r.path().to_string()).collect();
        paths.sort();
        assert_eq!(paths, ["/app/src/main.js", "/app/src/util/helper.js"]);
    }

    #[tokio::test]
    async fn glob_with_directories_includes_stubs() {
        let adapter = adapter();
        seed(&adapter, "/app/src/main.js", "a").await;

        let resources = adapter
            .by_glob(
                &["/**"],
                ResolveOptions {
                    match_directories: true,
                },
            )
            .await
            .unwrap();
        let mut paths: Vec<_> = resources.iter().map(|r| r.path().to_string()).collect();
        paths.sort();
        // Root stub, synthesized src dir, and the file itself.
        assert_eq!(paths, ["/app", "/app/src", "/app/src/main.js"]);
        let root = resources.iter().find(|r| r.path() == "/app").unwrap();
        assert!(root.stat_info().is_dir);
    }

    #[tokio::test]
    async fn ancestor_pattern_yields_virtual_directory() {
        let adapter = MemoryAdapter::with_base("/app/one/two/").unwrap();
        let resources = adapter
            .by_glob(
                &["/app/*"],
                ResolveOptions {
                    match_directories: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].path(), "/app/one");
        assert!(resources[0].stat_info().is_dir);
    }

    #[tokio::test]
    async fn excludes_apply_to_both_query_kinds() {
        let adapter = MemoryAdapter::new(MemoryAdapterConfig {
            virtual_base_path: "/app/".into(),
            exclude_patterns: vec!["/app/test/**".into()],
            ..Default::default()
        })
        .unwrap();
        seed(&adapter, "/app/main.js", "a").await;
        seed(&adapter, "/app/test/helper.js", "b").await;

        let found = adapter
            .by_path("/app/test/helper.js", ResolveOptions::default())
            .await
            .unwrap();
        assert!(found.is_none());

        let resources = adapter
            .by_glob(&["/app/**"], ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].path(), "/app/main.js");
    }

    #[tokio::test]
    async fn drain_option_empties_the_written_instance() {
        let adapter = adapter();
        let mut res = Resource::from_string("/app/a.js", "x").unwrap();
        adapter
            .write(
                &mut res,
                WriteOptions {
                    drain: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(res.as_buffer().await.is_err());

        // The stored master still carries the content.
        let mut found = adapter
            .by_path("/app/a.js", ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.as_string().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn conflicting_write_options_rejected() {
        let adapter = adapter();
        let mut res = Resource::from_string("/app/a.js", "x").unwrap();
        let result = adapter
            .write(
                &mut res,
                WriteOptions {
                    read_only: true,
                    drain: true,
                },
            )
            .await;
        assert!(matches!(result, Err(VfsError::OptionConflict)));
    }

    #[tokio::test]
    async fn owner_tag_becomes_project() {
        let adapter = MemoryAdapter::new(MemoryAdapterConfig {
            virtual_base_path: "/app/".into(),
            owner_tag: Some("library.a".into()),
            ..Default::default()
        })
        .unwrap();
        seed(&adapter, "/app/a.js", "x").await;

        let found = adapter
            .by_path("/app/a.js", ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.project(), Some("library.a"));
    }
}
