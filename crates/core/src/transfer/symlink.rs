//! Symbolic link resolution policies for uploads

use std::path::{Component, Path, PathBuf};

use crate::transfer::local::LocalFile;

/// Decides how a local symbolic link is uploaded
pub trait SymlinkPolicy: Send + Sync {
    /// Upload the contents of the link target in place of the link
    fn dereference(&self, local: &LocalFile, target: &Path) -> bool;

    /// Upload a link that is not dereferenced as a link
    fn include(&self, local: &LocalFile, target: &Path) -> bool;
}

/// Fixed link handling, independent of the link target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkMode {
    /// Always upload the target contents
    #[default]
    Follow,
    /// Upload links as links
    Preserve,
    /// Leave links out of the upload
    Skip,
}

impl SymlinkPolicy for SymlinkMode {
    fn dereference(&self, _local: &LocalFile, _target: &Path) -> bool {
        matches!(self, SymlinkMode::Follow)
    }

    fn include(&self, _local: &LocalFile, _target: &Path) -> bool {
        matches!(self, SymlinkMode::Preserve)
    }
}

/// Keeps links pointing inside the uploaded tree, follows the others
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithinRoot {
    root: PathBuf,
}

impl WithinRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn inside(&self, local: &LocalFile, target: &Path) -> bool {
        let absolute = if target.is_absolute() {
            target.to_path_buf()
        } else {
            local
                .path()
                .parent()
                .map(|parent| parent.join(target))
                .unwrap_or_else(|| target.to_path_buf())
        };
        normalize(&absolute).starts_with(normalize(&self.root))
    }
}

impl SymlinkPolicy for WithinRoot {
    fn dereference(&self, local: &LocalFile, target: &Path) -> bool {
        !self.inside(local, target)
    }

    fn include(&self, local: &LocalFile, target: &Path) -> bool {
        self.inside(local, target)
    }
}

/// Lexical normalization of `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
