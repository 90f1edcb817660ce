use async_trait::async_trait;
use tracing::debug;

use super::{S3Handle, bucket_and_key};
use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::Entry;
use crate::error::{Completion, Result};
use crate::features::DeleteFeature;
use crate::mapping::map_for;
use crate::protocol::deleting;
use crate::region::RegionResolver;
use crate::session::Session;

const CANNOT_DELETE: &str = "Cannot delete";

/// Deletes objects, placeholders and buckets
pub struct S3Delete<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Delete<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }

    async fn delete_entry(&self, entry: &Entry) -> Result<()> {
        let region = self
            .regions
            .resolve(entry)
            .await
            .map_err(|e| e.for_entry(CANNOT_DELETE, entry.path().to_string()))?;
        let (bucket, key) = bucket_and_key(entry)?;

        if entry.is_container() {
            self.session
                .lock()
                .await
                .delete_bucket(&region, bucket)
                .await
                .map_err(|e| map_for(CANNOT_DELETE, &e, entry))?;
            self.regions.invalidate(entry).await;
            return Ok(());
        }

        let result = self
            .session
            .lock()
            .await
            .delete_object(&region, bucket, &key)
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() && entry.is_directory() => {
                debug!(entry = %entry.path(), "Ignore missing placeholder object");
                Ok(())
            }
            Err(e) => Err(map_for(CANNOT_DELETE, &e, entry)),
        }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> DeleteFeature for S3Delete<H> {
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
            self.delete_entry(entry).await?;
        }
        Ok(Completion::Full)
    }
}
