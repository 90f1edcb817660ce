use async_trait::async_trait;
use tracing::debug;

use super::FtpHandle;
use crate::callback::ProgressListener;
use crate::entry::{Entry, Permission};
use crate::error::Result;
use crate::features::{MoveFeature, TimestampFeature, Timestamps, UnixPermissionFeature};
use crate::mapping::map_for;
use crate::protocol::renaming;
use crate::session::Session;

/// `RNFR`/`RNTO`, deleting an existing target first when overwriting
pub struct FtpMove<H> {
    session: Session<H>,
}

impl<H: FtpHandle + 'static> FtpMove<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> MoveFeature for FtpMove<H> {
    async fn rename(
        &self,
        source: &Entry,
        target: &Entry,
        overwrite: bool,
        listener: &dyn ProgressListener,
    ) -> Result<()> {
        renaming(listener, source, target);
        let handle = self.session.lock().await;
        if overwrite {
            let path = target.path().to_string();
            let result = if target.is_directory() {
                handle.remove_directory(&path).await
            } else {
                handle.delete_file(&path).await
            };
            match result {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!(target = %path, "No target to replace"),
                Err(e) => return Err(map_for("Cannot rename", &e, source)),
            }
        }
        handle
            .rename(&source.path().to_string(), &target.path().to_string())
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))
    }
}

/// `SITE CHMOD`
pub struct FtpUnixPermission<H> {
    session: Session<H>,
}

impl<H: FtpHandle + 'static> FtpUnixPermission<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> UnixPermissionFeature for FtpUnixPermission<H> {
    async fn set_permission(&self, entry: &Entry, permission: &Permission) -> Result<()> {
        self.session
            .lock()
            .await
            .chmod(&entry.path().to_string(), &permission.octal())
            .await
            .map_err(|e| map_for("Cannot change permissions of", &e, entry))
    }
}

/// `MFMT`; only the modification time can be written
pub struct FtpTimestamp<H> {
    session: Session<H>,
}

impl<H: FtpHandle + 'static> FtpTimestamp<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> TimestampFeature for FtpTimestamp<H> {
    async fn set_timestamp(&self, entry: &Entry, times: &Timestamps) -> Result<()> {
        let Some(modified) = times.modified else {
            return Ok(());
        };
        self.session
            .lock()
            .await
            .set_modified(&entry.path().to_string(), modified)
            .await
            .map_err(|e| map_for("Cannot change timestamp of", &e, entry))
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::entry::EntryPath;
    use crate::error::Error;
    use crate::mapping::WireError;
    use crate::protocol::ftp::fake::FakeFtp;
    use crate::protocol::testing::RecordingListener;

    fn session(fake: FakeFtp) -> Session<FakeFtp> {
        Session::new("ftp.example.net", "anonymous", fake)
    }

    #[tokio::test]
    async fn test_rename_without_overwrite() {
        let session = session(FakeFtp::new());
        FtpMove::new(session.clone())
            .rename(
                &Entry::file(EntryPath::parse("/a")),
                &Entry::file(EntryPath::parse("/b")),
                false,
                &RecordingListener::default(),
            )
            .await
            .unwrap();
        assert_eq!(session.lock().await.calls(), vec!["RNFR /a RNTO /b"]);
    }

    #[tokio::test]
    async fn test_rename_overwrite_deletes_target() {
        let session = session(
            FakeFtp::new().with_failure("DELE /b", WireError::ftp(550, "No such file")),
        );
        FtpMove::new(session.clone())
            .rename(
                &Entry::file(EntryPath::parse("/a")),
                &Entry::file(EntryPath::parse("/b")),
                true,
                &RecordingListener::default(),
            )
            .await
            .unwrap();
        assert_eq!(session.lock().await.calls(), vec!["DELE /b", "RNFR /a RNTO /b"]);
    }

    #[tokio::test]
    async fn test_rename_overwrite_denied() {
        let session = session(
            FakeFtp::new().with_failure("DELE /b", WireError::ftp(530, "Not logged in")),
        );
        let err = FtpMove::new(session.clone())
            .rename(
                &Entry::file(EntryPath::parse("/a")),
                &Entry::file(EntryPath::parse("/b")),
                true,
                &RecordingListener::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::AccessDenied(_)));
        assert_eq!(session.lock().await.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_site_chmod() {
        let session = session(FakeFtp::new());
        FtpUnixPermission::new(session.clone())
            .set_permission(
                &Entry::file(EntryPath::parse("/a")),
                &Permission::from_mode(0o640),
            )
            .await
            .unwrap();
        assert_eq!(session.lock().await.calls(), vec!["SITE CHMOD 640 /a"]);
    }

    #[tokio::test]
    async fn test_mfmt() {
        let session = session(FakeFtp::new());
        let timestamp = FtpTimestamp::new(session.clone());
        let file = Entry::file(EntryPath::parse("/a"));
        timestamp
            .set_timestamp(&file, &Timestamps::default())
            .await
            .unwrap();
        timestamp
            .set_timestamp(
                &file,
                &Timestamps {
                    modified: Some(Timestamp::from_second(1_234_567_890).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(session.lock().await.calls(), vec!["MFMT 20090213233130 /a"]);
    }
}
