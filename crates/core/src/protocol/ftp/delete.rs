use async_trait::async_trait;

use super::FtpHandle;
use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::Entry;
use crate::error::{Completion, Result};
use crate::features::DeleteFeature;
use crate::mapping::map_for;
use crate::protocol::deleting;
use crate::session::Session;

/// `DELE` for files and links, `RMD` for directories
pub struct FtpDelete<H> {
    session: Session<H>,
}

impl<H: FtpHandle + 'static> FtpDelete<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> DeleteFeature for FtpDelete<H> {
    async fn delete(
        &self,
        entries: &[Entry],
        _prompt: &dyn LoginCallback,
        listener: &dyn ProgressListener,
        cancel: &dyn CancelCallback,
    ) -> Result<Completion> {
        for entry in entries {
            cancel.verify()?;
            deleting(listener, entry);
            let path = entry.path().to_string();
            let handle = self.session.lock().await;
            let result = if entry.is_directory() {
                handle.remove_directory(&path).await
            } else {
                handle.delete_file(&path).await
            };
            result.map_err(|e| map_for("Cannot delete", &e, entry))?;
        }
        Ok(Completion::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CancelFlag, DisabledLoginCallback};
    use crate::entry::EntryPath;
    use crate::error::Error;
    use crate::mapping::WireError;
    use crate::protocol::ftp::fake::FakeFtp;
    use crate::protocol::testing::RecordingListener;

    #[tokio::test]
    async fn test_dele_and_rmd() {
        let session = Session::new("ftp.example.net", "anonymous", FakeFtp::new());
        let delete = FtpDelete::new(session.clone());
        delete
            .delete(
                &[
                    Entry::file(EntryPath::parse("/pub/a.txt")),
                    Entry::symlink(EntryPath::parse("/pub/link")),
                    Entry::directory(EntryPath::parse("/pub")),
                ],
                &DisabledLoginCallback,
                &RecordingListener::default(),
                &CancelFlag::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            session.lock().await.calls(),
            vec!["DELE /pub/a.txt", "DELE /pub/link", "RMD /pub"]
        );
    }

    #[tokio::test]
    async fn test_failure_stops_batch() {
        let session = Session::new(
            "ftp.example.net",
            "anonymous",
            FakeFtp::new().with_failure("RMD /pub", WireError::ftp(550, "Directory not empty")),
        );
        let delete = FtpDelete::new(session.clone());
        let err = delete
            .delete(
                &[
                    Entry::directory(EntryPath::parse("/pub")),
                    Entry::file(EntryPath::parse("/b")),
                ],
                &DisabledLoginCallback,
                &RecordingListener::default(),
                &CancelFlag::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::NotFound(_)));
        assert_eq!(err.path(), Some("/pub"));
        assert_eq!(session.lock().await.calls().len(), 1);
    }
}
