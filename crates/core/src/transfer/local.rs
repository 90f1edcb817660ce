//! Local source files of an upload

use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jiff::Timestamp;

use crate::error::{Error, Result};

/// Kind of a local filesystem entry, without following links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    File,
    Directory,
    Symlink,
}

/// Snapshot of the attributes of a local entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAttributes {
    pub kind: LocalKind,
    /// Size of the entry itself; the link length for symlinks
    pub size: u64,
    /// POSIX mode bits, when the platform has them
    pub mode: Option<u32>,
    pub created: Option<Timestamp>,
    pub modified: Option<Timestamp>,
    pub accessed: Option<Timestamp>,
}

impl LocalAttributes {
    fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            LocalKind::Symlink
        } else if file_type.is_dir() {
            LocalKind::Directory
        } else {
            LocalKind::File
        };
        Self {
            kind,
            size: metadata.len(),
            mode: mode_of(metadata),
            created: metadata.created().ok().and_then(timestamp),
            modified: metadata.modified().ok().and_then(timestamp),
            accessed: metadata.accessed().ok().and_then(timestamp),
        }
    }
}

#[cfg(unix)]
fn mode_of(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn mode_of(_metadata: &Metadata) -> Option<u32> {
    None
}

fn timestamp(time: SystemTime) -> Option<Timestamp> {
    Timestamp::try_from(time).ok()
}

/// Local file or directory to upload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// True when the entry exists; a dangling link exists
    pub async fn exists(&self) -> bool {
        tokio::fs::symlink_metadata(&self.path).await.is_ok()
    }

    /// Attributes of the entry itself, links are not followed
    pub async fn attributes(&self) -> Result<LocalAttributes> {
        let metadata = tokio::fs::symlink_metadata(&self.path)
            .await
            .map_err(|e| self.error(e))?;
        Ok(LocalAttributes::from_metadata(&metadata))
    }

    /// Attributes of the link target
    pub async fn target_attributes(&self) -> Result<LocalAttributes> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| self.error(e))?;
        Ok(LocalAttributes::from_metadata(&metadata))
    }

    /// Destination of a symbolic link
    pub async fn link_target(&self) -> Result<PathBuf> {
        tokio::fs::read_link(&self.path)
            .await
            .map_err(|e| self.error(e))
    }

    fn error(&self, err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(self.path.display().to_string()),
            _ => Error::Io(err),
        }
    }
}

impl fmt::Display for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
