//! The resource: a unit of byte content plus metadata, addressed by an
//! absolute virtual path.
//!
//! Content is one of four states: empty, an in-memory buffer, an externally
//! supplied single-use stream, or a factory producing fresh streams on
//! demand. Taking the stream moves it out of the state, so a second drain of
//! the same stream is unrepresentable; a `drained` flag additionally poisons
//! all content reads after *any* stream was vended — even from a buffer —
//! until new content is set, because the caller may mutate or exhaust
//! whatever it was handed.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self};
use futures::{Stream, TryStreamExt};

use crate::error::{Result, VfsError};
use crate::path;

/// A single-use stream of content chunks.
pub type ContentStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static>>;

/// A factory producing a fresh content stream per invocation.
pub type StreamFactory = Arc<dyn Fn() -> ContentStream + Send + Sync>;

/// Platform-stat-like record attached to every resource.
///
/// Resources that never touched a real filesystem get a synthetic
/// "regular file, now" record.
#[derive(Debug, Clone)]
pub struct StatInfo {
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// Size in bytes as reported by the backing store, if known.
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl StatInfo {
    /// Synthetic record for in-memory file resources.
    pub fn file_now() -> Self {
        Self {
            is_file: true,
            is_dir: false,
            is_symlink: false,
            size: None,
            modified: Some(SystemTime::now()),
        }
    }

    /// Synthetic record for directory stub resources.
    pub fn dir_now() -> Self {
        Self {
            is_file: false,
            is_dir: true,
            is_symlink: false,
            size: None,
            modified: Some(SystemTime::now()),
        }
    }

    /// Convert from host filesystem metadata.
    pub fn from_fs(meta: &std::fs::Metadata) -> Self {
        Self {
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            size: Some(meta.len()),
            modified: meta.modified().ok(),
        }
    }
}

/// Provenance record attached by the adapter that produced a resource.
///
/// `content_modified` is shared across every clone descending from the same
/// origin: once any of them replaces its content, the flag is sticky-true
/// for all. It answers "have this logical resource's bytes diverged from
/// what is on disk", which is what the disk adapter's write shortcuts need.
/// The per-instance [`Resource::is_modified`] flag only reflects the
/// instance's own setter calls.
#[derive(Clone)]
pub struct SourceMetadata {
    /// Name of the adapter that produced the resource.
    pub adapter: String,
    /// Physical path the content was resolved from.
    pub fs_path: PathBuf,
    content_modified: Arc<AtomicBool>,
}

impl SourceMetadata {
    pub fn new(adapter: impl Into<String>, fs_path: impl Into<PathBuf>) -> Self {
        Self {
            adapter: adapter.into(),
            fs_path: fs_path.into(),
            content_modified: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once any instance descending from this origin replaced its
    /// content.
    pub fn content_modified(&self) -> bool {
        self.content_modified.load(Ordering::Acquire)
    }

    fn mark_modified(&self) {
        self.content_modified.store(true, Ordering::Release);
    }
}

impl fmt::Debug for SourceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMetadata")
            .field("adapter", &self.adapter)
            .field("fs_path", &self.fs_path)
            .field("content_modified", &self.content_modified())
            .finish()
    }
}

enum Content {
    Empty,
    Buffer(Bytes),
    Stream(ContentStream),
    Factory(StreamFactory),
}

impl Content {
    fn kind(&self) -> &'static str {
        match self {
            Content::Empty => "empty",
            Content::Buffer(_) => "buffer",
            Content::Stream(_) => "stream",
            Content::Factory(_) => "factory",
        }
    }
}

/// The content + metadata unit addressed by a virtual path.
pub struct Resource {
    vpath: String,
    stat: StatInfo,
    source: Option<SourceMetadata>,
    project: Option<String>,
    collections: Vec<String>,
    modified: bool,
    content: Content,
    drained: bool,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.vpath)
            .field("content", &self.content.kind())
            .field("drained", &self.drained)
            .field("modified", &self.modified)
            .finish()
    }
}

impl Resource {
    /// Start building a resource at the given virtual path.
    pub fn builder(path: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(path)
    }

    /// A buffer-backed resource with a synthetic stat record.
    pub fn from_buffer(path: impl Into<String>, content: impl Into<Bytes>) -> Result<Self> {
        Self::builder(path).buffer(content).build()
    }

    /// A string-backed resource with a synthetic stat record.
    pub fn from_string(path: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        Self::builder(path).string(content).build()
    }

    /// The absolute virtual path.
    pub fn path(&self) -> &str {
        &self.vpath
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        path::name(&self.vpath)
    }

    /// Re-address the resource. The path is normalized and must be absolute.
    pub fn set_path(&mut self, path: impl AsRef<str>) -> Result<()> {
        self.vpath = path::normalize(path.as_ref())?;
        Ok(())
    }

    pub fn stat_info(&self) -> &StatInfo {
        &self.stat
    }

    pub fn source_metadata(&self) -> Option<&SourceMetadata> {
        self.source.as_ref()
    }

    /// True if a setter was invoked on *this* instance.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// The owning project, if assigned.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Associate the resource with an owning project. Set-once: assigning a
    /// different project later is a contract error, re-assigning the same
    /// one is a no-op.
    pub fn set_project(&mut self, project: impl Into<String>) -> Result<()> {
        let project = project.into();
        match &self.project {
            Some(current) if *current != project => Err(VfsError::ProjectReassigned {
                path: self.vpath.clone(),
                current: current.clone(),
            }),
            _ => {
                self.project = Some(project);
                Ok(())
            }
        }
    }

    /// Collections that handled this instance, oldest first. Diagnostics
    /// only — never affects resolution.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn push_collection(&mut self, name: impl Into<String>) {
        self.collections.push(name.into());
    }

    /// The content as a byte buffer.
    ///
    /// Stream- or factory-backed content is materialized on first call and
    /// cached, so repeated calls are idempotent until new content is set.
    pub async fn as_buffer(&mut self) -> Result<Bytes> {
        if self.drained {
            return Err(VfsError::ContentDrained(self.vpath.clone()));
        }
        self.materialize().await
    }

    /// The content as a UTF-8 string.
    pub async fn as_string(&mut self) -> Result<String> {
        let buffer = self.as_buffer().await?;
        Ok(String::from_utf8(buffer.to_vec())?)
    }

    /// The content as a single-use stream.
    ///
    /// Every call marks the resource drained — buffer-backed reads included,
    /// since the caller may mutate or exhaust whatever it is handed.
    pub fn as_stream(&mut self) -> Result<ContentStream> {
        if self.drained {
            return Err(VfsError::ContentDrained(self.vpath.clone()));
        }
        let stream: ContentStream = match std::mem::replace(&mut self.content, Content::Empty) {
            Content::Empty => return Err(VfsError::NoContent(self.vpath.clone())),
            Content::Buffer(buffer) => {
                self.content = Content::Buffer(buffer.clone());
                Box::pin(stream::once(async move { Ok(buffer) }))
            }
            Content::Stream(stream) => stream,
            Content::Factory(factory) => {
                let stream = factory();
                self.content = Content::Factory(factory);
                stream
            }
        };
        self.drained = true;
        Ok(stream)
    }

    /// Replace the content with a buffer.
    pub fn set_buffer(&mut self, content: impl Into<Bytes>) {
        self.replace_content(Content::Buffer(content.into()));
    }

    /// Replace the content with a UTF-8 string.
    pub fn set_string(&mut self, content: impl Into<String>) {
        self.set_buffer(content.into().into_bytes());
    }

    /// Replace the content with a single-use stream.
    pub fn set_stream(&mut self, stream: ContentStream) {
        self.replace_content(Content::Stream(stream));
    }

    /// Replace the content with a stream factory.
    pub fn set_stream_factory(&mut self, factory: StreamFactory) {
        self.replace_content(Content::Factory(factory));
    }

    fn replace_content(&mut self, content: Content) {
        self.content = content;
        self.drained = false;
        self.modified = true;
        if let Some(source) = &self.source {
            source.mark_modified();
        }
    }

    /// Byte length of the content: 0 if none was ever set, otherwise the
    /// length of the materialized buffer.
    pub async fn size(&mut self) -> Result<u64> {
        if matches!(self.content, Content::Empty) && !self.drained {
            return Ok(0);
        }
        let buffer = self.as_buffer().await?;
        Ok(buffer.len() as u64)
    }

    /// Clone into an independent resource.
    ///
    /// Stat and source metadata are deep copies (the sticky
    /// `content_modified` flag stays shared with the origin); a buffer is
    /// shared by reference since it is immutable; a live stream is
    /// materialized into the original first, because a stream cannot be
    /// forked; a factory is copied by reference since it is re-invocable.
    /// The clone carries no project and no collection annotations.
    pub async fn clone_resource(&mut self) -> Result<Resource> {
        let content = match &self.content {
            Content::Empty => Content::Empty,
            Content::Buffer(buffer) => Content::Buffer(buffer.clone()),
            Content::Factory(factory) => Content::Factory(Arc::clone(factory)),
            Content::Stream(_) => {
                if self.drained {
                    return Err(VfsError::ContentDrained(self.vpath.clone()));
                }
                Content::Buffer(self.materialize().await?)
            }
        };
        Ok(Resource {
            vpath: self.vpath.clone(),
            stat: self.stat.clone(),
            source: self.source.clone(),
            project: None,
            collections: Vec::new(),
            modified: false,
            content,
            drained: false,
        })
    }

    /// Drop the content entirely. Used after a write with the `drain`
    /// option, when the caller asserts the resource will not be read again.
    pub(crate) fn clear_content(&mut self) {
        self.content = Content::Empty;
        self.drained = true;
    }

    /// Rebind the content without touching modification flags. Used by the
    /// disk adapter to swap a written-out buffer for a lazy factory over the
    /// destination file.
    pub(crate) fn rebind_factory(&mut self, factory: StreamFactory) {
        self.content = Content::Factory(factory);
        self.drained = false;
    }

    /// Materialize stream/factory content into the cached buffer.
    async fn materialize(&mut self) -> Result<Bytes> {
        let mut stream = match std::mem::replace(&mut self.content, Content::Empty) {
            Content::Empty => return Err(VfsError::NoContent(self.vpath.clone())),
            Content::Buffer(buffer) => {
                self.content = Content::Buffer(buffer.clone());
                return Ok(buffer);
            }
            Content::Stream(stream) => stream,
            Content::Factory(factory) => factory(),
        };

        let mut collected = BytesMut::new();
        while let Some(chunk) = stream.try_next().await? {
            collected.extend_from_slice(&chunk);
        }
        let buffer = collected.freeze();
        self.content = Content::Buffer(buffer.clone());
        Ok(buffer)
    }
}

/// Builds a [`Resource`]. At most one content source may be supplied;
/// a second is a contract error at `build` time.
pub struct ResourceBuilder {
    path: String,
    content: Option<Content>,
    conflicting: bool,
    stat: Option<StatInfo>,
    source: Option<SourceMetadata>,
    project: Option<String>,
}

impl ResourceBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            conflicting: false,
            stat: None,
            source: None,
            project: None,
        }
    }

    pub fn buffer(self, content: impl Into<Bytes>) -> Self {
        self.content(Content::Buffer(content.into()))
    }

    pub fn string(self, content: impl Into<String>) -> Self {
        self.content(Content::Buffer(content.into().into_bytes().into()))
    }

    pub fn stream(self, stream: ContentStream) -> Self {
        self.content(Content::Stream(stream))
    }

    pub fn stream_factory(self, factory: StreamFactory) -> Self {
        self.content(Content::Factory(factory))
    }

    pub fn stat_info(mut self, stat: StatInfo) -> Self {
        self.stat = Some(stat);
        self
    }

    pub fn source_metadata(mut self, source: SourceMetadata) -> Self {
        self.source = Some(source);
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    fn content(mut self, content: Content) -> Self {
        if self.content.is_some() {
            self.conflicting = true;
        }
        self.content = Some(content);
        self
    }

    pub fn build(self) -> Result<Resource> {
        let vpath = path::normalize(&self.path)?;
        if self.conflicting {
            return Err(VfsError::ContentConflict(vpath));
        }
        Ok(Resource {
            vpath,
            stat: self.stat.unwrap_or_else(StatInfo::file_now),
            source: self.source,
            project: self.project,
            collections: Vec::new(),
            modified: false,
            content: self.content.unwrap_or(Content::Empty),
            drained: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn stream_of(chunks: Vec<&'static [u8]>) -> ContentStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    #[tokio::test]
    async fn buffer_roundtrip() {
        let mut res = Resource::from_buffer("/app/a.txt", &b"hello"[..]).unwrap();
        assert_eq!(res.as_buffer().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(res.size().await.unwrap(), 5);
        assert_eq!(res.name(), "a.txt");
        assert!(!res.is_modified());

        res.set_buffer(&b"world!"[..]);
        assert!(res.is_modified());
        assert_eq!(res.size().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn path_is_normalized() {
        let res = Resource::from_string("/app/./sub/../b.txt", "x").unwrap();
        assert_eq!(res.path(), "/app/b.txt");
        assert!(Resource::from_string("relative/path", "x").is_err());
    }

    #[tokio::test]
    async fn stream_content_materializes_once() {
        let mut res = Resource::builder("/s")
            .stream(stream_of(vec![b"ab", b"cd"]))
            .build()
            .unwrap();
        assert_eq!(res.as_buffer().await.unwrap(), Bytes::from_static(b"abcd"));
        // Cached: a second read must not touch the (consumed) stream.
        assert_eq!(res.as_buffer().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn factory_content_rereadable_until_streamed() {
        let factory: StreamFactory = Arc::new(|| {
            Box::pin(stream::once(async { Ok(Bytes::from_static(b"fresh")) }))
        });
        let mut res = Resource::builder("/f")
            .stream_factory(factory)
            .build()
            .unwrap();
        assert_eq!(res.as_buffer().await.unwrap(), Bytes::from_static(b"fresh"));
        assert_eq!(res.size().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn any_stream_read_drains() {
        // Buffer-backed: the buffer itself survives, but reads are poisoned.
        let mut res = Resource::from_string("/d", "data").unwrap();
        let mut stream = res.as_stream().unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            Bytes::from_static(b"data")
        );
        assert!(matches!(
            res.as_buffer().await,
            Err(VfsError::ContentDrained(_))
        ));
        assert!(matches!(res.as_stream(), Err(VfsError::ContentDrained(_))));

        // New content clears the drain.
        res.set_string("again");
        assert_eq!(res.as_string().await.unwrap(), "again");
    }

    #[tokio::test]
    async fn stream_backed_drain() {
        let mut res = Resource::builder("/s")
            .stream(stream_of(vec![b"xy"]))
            .build()
            .unwrap();
        let _stream = res.as_stream().unwrap();
        assert!(matches!(
            res.as_buffer().await,
            Err(VfsError::ContentDrained(_))
        ));
    }

    #[tokio::test]
    async fn factory_backed_drain() {
        let factory: StreamFactory =
            Arc::new(|| Box::pin(stream::once(async { Ok(Bytes::from_static(b"f")) })));
        let mut res = Resource::builder("/f")
            .stream_factory(factory)
            .build()
            .unwrap();
        let _stream = res.as_stream().unwrap();
        // The factory could produce a fresh stream, but the contract says
        // reads fail until new content is set.
        assert!(matches!(
            res.as_buffer().await,
            Err(VfsError::ContentDrained(_))
        ));
        res.set_string("reset");
        assert_eq!(res.as_string().await.unwrap(), "reset");
    }

    #[tokio::test]
    async fn no_content() {
        let mut res = Resource::builder("/none").build().unwrap();
        assert_eq!(res.size().await.unwrap(), 0);
        assert!(matches!(res.as_buffer().await, Err(VfsError::NoContent(_))));
        assert!(matches!(res.as_stream(), Err(VfsError::NoContent(_))));
    }

    #[tokio::test]
    async fn builder_rejects_conflicting_content() {
        let result = Resource::builder("/x").string("a").buffer(&b"b"[..]).build();
        assert!(matches!(result, Err(VfsError::ContentConflict(_))));
    }

    #[tokio::test]
    async fn clone_is_structurally_independent() {
        let mut original = Resource::builder("/app/x")
            .string("original")
            .source_metadata(SourceMetadata::new("disk", "/tmp/x"))
            .build()
            .unwrap();
        let mut copy = original.clone_resource().await.unwrap();

        copy.set_string("changed");
        assert_eq!(original.as_string().await.unwrap(), "original");
        assert!(!original.is_modified());
        assert!(copy.is_modified());
        assert!(copy.collections().is_empty());
    }

    #[tokio::test]
    async fn content_modified_is_sticky_across_clones() {
        let mut original = Resource::builder("/app/x")
            .string("original")
            .source_metadata(SourceMetadata::new("disk", "/tmp/x"))
            .build()
            .unwrap();
        let mut copy = original.clone_resource().await.unwrap();
        assert!(!original.source_metadata().unwrap().content_modified());

        copy.set_string("changed");
        assert!(original.source_metadata().unwrap().content_modified());
        assert!(copy.source_metadata().unwrap().content_modified());
    }

    #[tokio::test]
    async fn clone_materializes_stream() {
        let mut original = Resource::builder("/s")
            .stream(stream_of(vec![b"st", b"re", b"am"]))
            .build()
            .unwrap();
        let mut copy = original.clone_resource().await.unwrap();
        assert_eq!(copy.as_string().await.unwrap(), "stream");
        // The original's stream was folded into a cached buffer.
        assert_eq!(original.as_string().await.unwrap(), "stream");
    }

    #[tokio::test]
    async fn project_is_set_once() {
        let mut res = Resource::from_string("/p", "x").unwrap();
        res.set_project("library.a").unwrap();
        res.set_project("library.a").unwrap();
        assert!(matches!(
            res.set_project("library.b"),
            Err(VfsError::ProjectReassigned { .. })
        ));
        assert_eq!(res.project(), Some("library.a"));
    }

    #[tokio::test]
    async fn clone_does_not_inherit_project() {
        let mut res = Resource::from_string("/p", "x").unwrap();
        res.set_project("library.a").unwrap();
        let copy = res.clone_resource().await.unwrap();
        assert_eq!(copy.project(), None);
    }

    #[tokio::test]
    async fn collection_annotations_append() {
        let mut res = Resource::from_string("/c", "x").unwrap();
        res.push_collection("overlay");
        res.push_collection("prioritized");
        assert_eq!(res.collections(), ["overlay", "prioritized"]);
    }
}
