//! Conventional file-API shim over any reader.
//!
//! Maps `by_path`/`by_glob` onto a classic `stat`/`read_file`/`read_dir`
//! calling convention with `std::io::Error` semantics, for interoperability
//! with code expecting that surface. Pure delegation — no new logic.

use std::io;
use std::sync::Arc;

use crate::error::VfsError;
use crate::reader::{Reader, ResolveOptions};
use crate::resource::StatInfo;

/// Thin facade presenting a reader as a conventional filesystem.
pub struct FsInterface {
    reader: Arc<dyn Reader>,
}

impl FsInterface {
    pub fn new(reader: Arc<dyn Reader>) -> Self {
        Self { reader }
    }

    /// Stat a file or directory. Absent paths are `NotFound`.
    pub async fn stat(&self, virtual_path: &str) -> io::Result<StatInfo> {
        let options = ResolveOptions {
            match_directories: true,
        };
        match self.reader.by_path(virtual_path, options).await {
            Ok(Some(resource)) => Ok(resource.stat_info().clone()),
            Ok(None) => Err(not_found(virtual_path)),
            Err(e) => Err(into_io(e)),
        }
    }

    /// Read a file's full content.
    pub async fn read_file(&self, virtual_path: &str) -> io::Result<Vec<u8>> {
        match self.reader.by_path(virtual_path, ResolveOptions::default()).await {
            Ok(Some(mut resource)) => {
                let buffer = resource.as_buffer().await.map_err(into_io)?;
                Ok(buffer.to_vec())
            }
            Ok(None) => Err(not_found(virtual_path)),
            Err(e) => Err(into_io(e)),
        }
    }

    /// List the names of a directory's direct children, sorted. The
    /// underlying glob order is deliberately unstable, so the shim sorts.
    pub async fn read_dir(&self, virtual_path: &str) -> io::Result<Vec<String>> {
        let pattern = format!("{}/*", virtual_path.trim_end_matches('/'));
        let options = ResolveOptions {
            match_directories: true,
        };
        let resources = self
            .reader
            .by_glob(&[&pattern], options)
            .await
            .map_err(into_io)?;
        let mut names: Vec<String> = resources
            .iter()
            .map(|resource| resource.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Deliberate no-op: this system has no explicit empty-directory
    /// creation step outside of what `write` implies.
    pub async fn mkdir(&self, _virtual_path: &str) -> io::Result<()> {
        Ok(())
    }
}

fn not_found(virtual_path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {virtual_path}"))
}

fn into_io(error: VfsError) -> io::Error {
    match error {
        VfsError::Io(e) => e,
        other => io::Error::other(other),
    }
}
