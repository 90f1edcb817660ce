//! Capability traits and the per-session capability table
//!
//! Each remote operation is a narrow trait with one implementation per
//! protocol. A session builds its [`Capabilities`] table once, choosing the
//! implementations of its protocol; optional operations are `None` when the
//! protocol cannot perform them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use url::Url;

use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::{Acl, Attributes, Entry, Permission};
use crate::error::{Completion, Error, Result};
use crate::listing::AttributedList;

/// Delete a batch of entries
#[async_trait]
pub trait DeleteFeature: Send + Sync {
    /// Delete entries in order, failing fast on the first unexpected error.
    ///
    /// `prompt` is only used by nested auxiliary operations. Best-effort
    /// cleanup failures are reported through [`Completion::Degraded`].
    async fn delete(
        &self,
        entries: &[Entry],
        prompt: &dyn LoginCallback,
        listener: &dyn ProgressListener,
        cancel: &dyn CancelCallback,
    ) -> Result<Completion>;
}

/// Server side copy
#[async_trait]
pub trait CopyFeature: Send + Sync {
    async fn copy(&self, source: &Entry, target: &Entry) -> Result<()>;
}

/// Rename or move an entry
#[async_trait]
pub trait MoveFeature: Send + Sync {
    /// Move `source` to `target`, replacing an existing target when `overwrite`
    async fn rename(
        &self,
        source: &Entry,
        target: &Entry,
        overwrite: bool,
        listener: &dyn ProgressListener,
    ) -> Result<()>;
}

/// Existence probe
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FindFeature: Send + Sync {
    async fn find(&self, entry: &Entry) -> Result<bool>;
}

/// Read the authoritative attributes of a remote entry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributesFeature: Send + Sync {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes>;
}

/// List the children of a directory
#[async_trait]
pub trait ListFeature: Send + Sync {
    async fn list(
        &self,
        directory: &Entry,
        listener: &dyn ProgressListener,
    ) -> Result<AttributedList>;
}

/// Enumerate the segments of a segmented (large) object
#[async_trait]
pub trait SegmentFeature: Send + Sync {
    /// Segments ordered by index; empty when `manifest` is not segmented
    async fn segments(&self, manifest: &Entry) -> Result<Vec<Entry>>;
}

/// Time-boxed access URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: Url,
    pub expires: Timestamp,
}

/// Signed URL generation
#[async_trait]
pub trait UrlFeature: Send + Sync {
    /// `Ok(None)` when no signing secret is available for the entry's region
    async fn signed_url(&self, entry: &Entry, expiry: Duration) -> Result<Option<SignedUrl>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnixPermissionFeature: Send + Sync {
    async fn set_permission(&self, entry: &Entry, permission: &Permission) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AclFeature: Send + Sync {
    async fn set_acl(&self, entry: &Entry, acl: &Acl) -> Result<()>;
}

/// Timestamps to write to a remote entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    pub created: Option<Timestamp>,
    pub modified: Option<Timestamp>,
    pub accessed: Option<Timestamp>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimestampFeature: Send + Sync {
    async fn set_timestamp(&self, entry: &Entry, times: &Timestamps) -> Result<()>;
}

/// Capability table of one session
///
/// Built once at session construction by `protocol::<name>::capabilities`.
#[derive(Clone)]
pub struct Capabilities {
    /// Protocol identifier, e.g. `swift`
    pub protocol: &'static str,
    pub delete: Arc<dyn DeleteFeature>,
    pub rename: Arc<dyn MoveFeature>,
    pub find: Arc<dyn FindFeature>,
    pub attributes: Arc<dyn AttributesFeature>,
    pub list: Option<Arc<dyn ListFeature>>,
    pub copy: Option<Arc<dyn CopyFeature>>,
    pub segments: Option<Arc<dyn SegmentFeature>>,
    pub url: Option<Arc<dyn UrlFeature>>,
    pub unix_permission: Option<Arc<dyn UnixPermissionFeature>>,
    pub acl: Option<Arc<dyn AclFeature>>,
    pub timestamp: Option<Arc<dyn TimestampFeature>>,
}

impl Capabilities {
    pub fn list(&self) -> Result<&Arc<dyn ListFeature>> {
        self.list.as_ref().ok_or_else(|| self.unsupported("list"))
    }

    pub fn copy(&self) -> Result<&Arc<dyn CopyFeature>> {
        self.copy.as_ref().ok_or_else(|| self.unsupported("copy"))
    }

    pub fn url(&self) -> Result<&Arc<dyn UrlFeature>> {
        self.url.as_ref().ok_or_else(|| self.unsupported("signed URL"))
    }

    fn unsupported(&self, operation: &str) -> Error {
        Error::Unsupported(format!("{operation} is not available for {}", self.protocol))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("protocol", &self.protocol)
            .field("list", &self.list.is_some())
            .field("copy", &self.copy.is_some())
            .field("segments", &self.segments.is_some())
            .field("url", &self.url.is_some())
            .field("unix_permission", &self.unix_permission.is_some())
            .field("acl", &self.acl.is_some())
            .field("timestamp", &self.timestamp.is_some())
            .finish()
    }
}
