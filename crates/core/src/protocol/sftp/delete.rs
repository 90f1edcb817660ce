use async_trait::async_trait;

use super::SftpHandle;
use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::Entry;
use crate::error::{Completion, Result};
use crate::features::DeleteFeature;
use crate::mapping::map_for;
use crate::protocol::deleting;
use crate::session::Session;

/// `remove` for files and links, `rmdir` for directories
pub struct SftpDelete<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpDelete<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> DeleteFeature for SftpDelete<H> {
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
                handle.rmdir(&path).await
            } else {
                handle.remove(&path).await
            };
            result.map_err(|e| map_for("Cannot delete", &e, entry))?;
        }
        Ok(Completion::Full)
    }
}
