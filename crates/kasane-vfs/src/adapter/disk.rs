//! Disk-backed adapter.
//!
//! Resolution binds lazy stream factories to physical paths, so content is
//! only read when a caller actually drains it. Writes compare the incoming
//! resource's provenance against the destination and shortcut to an OS-level
//! file copy — or to nothing at all — when the content never diverged from
//! its origin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use kasane_glob::PathPattern;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;

use super::AdapterBase;
use crate::error::{Result, VfsError};
use crate::path;
use crate::reader::{Reader, ResolveOptions, WriteOptions, Writer};
use crate::resource::{Resource, SourceMetadata, StatInfo, StreamFactory};
use crate::trace::QueryTrace;

/// File name of the optional per-root ignore file.
const IGNORE_FILE: &str = ".kasaneignore";

/// Construction parameters for [`DiskAdapter`].
#[derive(Debug, Default)]
pub struct DiskAdapterConfig {
    /// Namespace prefix this adapter is responsible for. Absolute, trailing
    /// slash. Required.
    pub virtual_base_path: String,
    /// Directory on the host filesystem backing the namespace. Required.
    pub physical_base_path: PathBuf,
    /// Glob patterns excluded from all queries.
    pub exclude_patterns: Vec<String>,
    /// Load additional excludes from a `.kasaneignore` file at the physical
    /// root: one glob per line, `#` starts a comment.
    pub use_ignore_file: bool,
    /// Opaque back-reference assigned as the project of every produced
    /// resource.
    pub owner_tag: Option<String>,
}

/// Adapter backed by a directory on the host filesystem.
pub struct DiskAdapter {
    base: AdapterBase,
    physical_root: PathBuf,
    use_ignore_file: bool,
    ignores: OnceCell<Vec<PathPattern>>,
}

impl DiskAdapter {
    pub fn new(config: DiskAdapterConfig) -> Result<Self> {
        let base = AdapterBase::new(
            "disk",
            &config.virtual_base_path,
            &config.exclude_patterns,
            config.owner_tag,
        )?;
        if config.physical_base_path.as_os_str().is_empty() {
            return Err(VfsError::InvalidBasePath(String::new()));
        }
        Ok(Self {
            base,
            physical_root: config.physical_base_path,
            use_ignore_file: config.use_ignore_file,
            ignores: OnceCell::new(),
        })
    }

    /// The physical directory backing this adapter.
    pub fn physical_root(&self) -> &Path {
        &self.physical_root
    }

    fn physical_path(&self, relative: &str) -> PathBuf {
        if relative.is_empty() {
            self.physical_root.clone()
        } else {
            self.physical_root.join(relative)
        }
    }

    /// Ignore-file patterns, loaded once. Stored in negated form so they
    /// slot directly into a glob plan; `matches` ignores the prefix.
    async fn ignore_patterns(&self) -> Result<&[PathPattern]> {
        let patterns = self
            .ignores
            .get_or_try_init(|| async {
                if !self.use_ignore_file {
                    return Ok(Vec::new());
                }
                match fs::read_to_string(self.physical_root.join(IGNORE_FILE)).await {
                    Ok(text) => text
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(|line| Ok(PathPattern::parse(&format!("!{line}"))?))
                        .collect::<Result<Vec<_>>>(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(patterns)
    }

    fn build_resource(
        &self,
        virtual_path: String,
        physical: PathBuf,
        meta: &std::fs::Metadata,
    ) -> Result<Resource> {
        let mut builder = Resource::builder(virtual_path)
            .stat_info(StatInfo::from_fs(meta))
            .source_metadata(SourceMetadata::new(self.base.kind(), physical.clone()));
        if meta.is_file() {
            builder = builder.stream_factory(file_factory(physical));
        }
        if let Some(tag) = self.base.owner_tag() {
            builder = builder.project(tag);
        }
        builder.build()
    }

    fn synthesize_dir(&self, virtual_path: &str) -> Result<Resource> {
        let mut builder = Resource::builder(virtual_path).stat_info(StatInfo::dir_now());
        if let Some(tag) = self.base.owner_tag() {
            builder = builder.project(tag);
        }
        builder.build()
    }

    /// Collect all (root-relative path, is_dir) entries under the physical
    /// root. Directories that vanish mid-walk are skipped.
    async fn walk_entries(&self) -> Result<Vec<(String, bool)>> {
        let mut entries = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let physical = self.physical_path(&dir);
            let mut read_dir = match fs::read_dir(&physical).await {
                Ok(read_dir) => read_dir,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let relative = if dir.is_empty() {
                    name
                } else {
                    format!("{dir}/{name}")
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(relative.clone());
                    entries.push((relative, true));
                } else {
                    entries.push((relative, false));
                }
            }
        }
        Ok(entries)
    }

    /// Stream or copy the resource's content into the destination file.
    async fn write_content(
        &self,
        resource: &mut Resource,
        destination: &Path,
        options: &WriteOptions,
    ) -> Result<()> {
        if options.drain || options.read_only {
            // Stream out so the in-memory content can be released.
            let mut stream = resource.as_stream()?;
            let mut file = fs::File::create(destination).await?;
            while let Some(chunk) = stream.try_next().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
        } else {
            let buffer = resource.as_buffer().await?;
            fs::write(destination, &buffer).await?;
        }
        Ok(())
    }
}

/// A factory producing lazy read streams over a physical file. Nothing is
/// opened until the stream is first polled.
fn file_factory(physical: PathBuf) -> StreamFactory {
    Arc::new(move || {
        let physical = physical.clone();
        Box::pin(
            futures::stream::once(async move { fs::File::open(physical).await })
                .map_ok(ReaderStream::new)
                .try_flatten(),
        )
    })
}

#[async_trait]
impl Reader for DiskAdapter {
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
        if self
            .ignore_patterns()
            .await?
            .iter()
            .any(|p| p.matches(relative))
        {
            return Ok(None);
        }

        let physical = self.physical_path(relative);
        let meta = match fs::metadata(&physical).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() && !options.match_directories {
            return Ok(None);
        }
        Ok(Some(self.build_resource(normalized, physical, &meta)?))
    }

    async fn resolve_glob(
        &self,
        patterns: &[&str],
        options: &ResolveOptions,
        trace: &QueryTrace,
    ) -> Result<Vec<Resource>> {
        trace.glob_call();
        let mut plan = self.base.prepare_glob(patterns)?;
        for ignore in self.ignore_patterns().await? {
            plan.set.push(ignore.clone());
        }

        let mut resources = Vec::new();
        if options.match_directories {
            if plan.include_root {
                // Pseudo-match of the adapter's own root, no I/O.
                resources.push(self.synthesize_dir(self.base.root_path())?);
            }
            for stub in &plan.virtual_dirs {
                resources.push(self.synthesize_dir(stub)?);
            }
        }

        if plan.set.is_empty() {
            return Ok(resources);
        }

        for (relative, is_dir) in self.walk_entries().await? {
            if is_dir && !options.match_directories {
                continue;
            }
            if !plan.set.matches(&relative) {
                continue;
            }
            // Matches are re-stat'ed: the walk snapshot is not trusted as
            // fresh, and a candidate that vanished contributes nothing.
            let physical = self.physical_path(&relative);
            let meta = match fs::metadata(&physical).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            resources.push(self.build_resource(
                self.base.to_virtual(&relative),
                physical,
                &meta,
            )?);
        }
        Ok(resources)
    }
}

#[async_trait]
impl Writer for DiskAdapter {
    #[tracing::instrument(skip(self, resource), fields(path = resource.path()))]
    async fn write(&self, resource: &mut Resource, options: WriteOptions) -> Result<()> {
        options.validate()?;
        let normalized = path::normalize(resource.path())?;
        let Some(relative) = self.base.to_relative(&normalized) else {
            return Err(VfsError::WriteOutsideNamespace {
                path: normalized,
                base: self.base.virtual_base_path().to_string(),
            });
        };
        let destination = self.physical_path(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let origin = resource.source_metadata().and_then(|meta| {
            (meta.adapter == self.base.kind())
                .then(|| (meta.fs_path.clone(), meta.content_modified()))
        });

        match origin {
            // Same file, never modified: already correct on disk.
            Some((origin_path, false)) if origin_path == destination => {
                tracing::debug!(?destination, "write skipped, content unchanged");
            }
            // Different file, never modified: OS-level copy, content is
            // never pulled into memory.
            Some((origin_path, false)) => {
                fs::copy(&origin_path, &destination).await?;
            }
            // Overwriting the origin with modified content: materialize
            // first — streaming out of the file being replaced would
            // corrupt it.
            Some((origin_path, true)) if origin_path == destination => {
                let buffer = resource.as_buffer().await?;
                fs::write(&destination, &buffer).await?;
            }
            // Foreign or absent provenance: full write.
            _ => {
                self.write_content(resource, &destination, &options).await?;
            }
        }

        if options.read_only {
            let mut perms = fs::metadata(&destination).await?.permissions();
            perms.set_readonly(true);
            fs::set_permissions(&destination, perms).await?;
            // Release the in-memory content: rebind to a lazy stream over
            // the file that was just written.
            resource.rebind_factory(file_factory(destination));
        } else if options.drain {
            resource.clear_content();
        }
        Ok(())
    }
}
