use async_trait::async_trait;
use tracing::debug;

use super::SftpHandle;
use crate::callback::ProgressListener;
use crate::entry::{Entry, Permission};
use crate::error::{Error, Result};
use crate::features::{MoveFeature, TimestampFeature, Timestamps, UnixPermissionFeature};
use crate::mapping::map_for;
use crate::protocol::renaming;
use crate::session::Session;

const CANNOT_RENAME: &str = "Cannot rename";

/// Rename replacing an existing target
///
/// An existing target is removed first; the rename then prefers the
/// `posix-rename@openssh.com` extension and falls back to plain rename when
/// the server does not support it.
pub struct SftpMove<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpMove<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> MoveFeature for SftpMove<H> {
    async fn rename(
        &self,
        source: &Entry,
        target: &Entry,
        _overwrite: bool,
        listener: &dyn ProgressListener,
    ) -> Result<()> {
        renaming(listener, source, target);
        let from = source.path().to_string();
        let to = target.path().to_string();
        let handle = self.session.lock().await;

        match handle.stat(&to).await {
            Ok(stat) => {
                debug!(target = %to, "Remove existing target");
                let result = if stat.directory {
                    handle.rmdir(&to).await
                } else {
                    handle.remove(&to).await
                };
                result.map_err(|e| map_for(CANNOT_RENAME, &e, target))?;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(map_for(CANNOT_RENAME, &e, target)),
        }

        match handle.posix_rename(&from, &to).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(crate::mapping::map(&e), Error::Unsupported(_)) => {
                debug!(source = %from, "posix-rename unsupported, falling back to rename");
                handle
                    .rename(&from, &to)
                    .await
                    .map_err(|e| map_for(CANNOT_RENAME, &e, source))
            }
            Err(e) => Err(map_for(CANNOT_RENAME, &e, source)),
        }
    }
}

/// `setstat` of the permission bits
pub struct SftpUnixPermission<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpUnixPermission<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> UnixPermissionFeature for SftpUnixPermission<H> {
    async fn set_permission(&self, entry: &Entry, permission: &Permission) -> Result<()> {
        self.session
            .lock()
            .await
            .set_permissions(&entry.path().to_string(), permission.mode())
            .await
            .map_err(|e| map_for("Cannot change permissions of", &e, entry))
    }
}

/// `setstat` of access and modification time
pub struct SftpTimestamp<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpTimestamp<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> TimestampFeature for SftpTimestamp<H> {
    async fn set_timestamp(&self, entry: &Entry, times: &Timestamps) -> Result<()> {
        let Some(modified) = times.modified else {
            return Ok(());
        };
        let accessed = times.accessed.unwrap_or(modified);
        self.session
            .lock()
            .await
            .set_times(&entry.path().to_string(), accessed, modified)
            .await
            .map_err(|e| map_for("Cannot change timestamp of", &e, entry))
    }
}
