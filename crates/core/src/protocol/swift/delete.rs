use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{SwiftHandle, SwiftSegments, container_and_key};
use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::Entry;
use crate::error::{Completion, Result};
use crate::features::DeleteFeature;
use crate::mapping::map_for;
use crate::protocol::deleting;
use crate::region::RegionResolver;
use crate::session::Session;

const CANNOT_DELETE: &str = "Cannot delete";

/// Deletes Swift objects, placeholders and containers
///
/// The segments of a large object are enumerated before its manifest is
/// deleted and removed afterwards on a best-effort basis.
pub struct SwiftDelete<H> {
    session: Session<H>,
    regions: RegionResolver,
    segments: Arc<SwiftSegments<H>>,
}

impl<H: SwiftHandle + 'static> SwiftDelete<H> {
    pub fn new(session: Session<H>, regions: RegionResolver, segments: Arc<SwiftSegments<H>>) -> Self {
        Self {
            session,
            regions,
            segments,
        }
    }

    async fn delete_entry(&self, entry: &Entry) -> Result<Completion> {
        let region = self
            .regions
            .resolve(entry)
            .await
            .map_err(|e| e.for_entry(CANNOT_DELETE, entry.path().to_string()))?;
        let (container, key) = container_and_key(entry)?;

        if entry.is_container() {
            self.session
                .lock()
                .await
                .delete_container(&region, container)
                .await
                .map_err(|e| map_for(CANNOT_DELETE, &e, entry))?;
            self.regions.invalidate(entry).await;
            return Ok(Completion::Full);
        }

        if entry.is_directory() {
            let result = self
                .session
                .lock()
                .await
                .delete_object(&region, container, &key)
                .await;
            return match result {
                Ok(()) => Ok(Completion::Full),
                Err(e) if e.is_not_found() => {
                    warn!(entry = %entry.path(), "Ignore missing placeholder object");
                    Ok(Completion::Full)
                }
                Err(e) => Err(map_for(CANNOT_DELETE, &e, entry)),
            };
        }

        // Segments must be collected while the manifest still exists
        let segments = self.segments.list(&region, entry).await?;
        self.session
            .lock()
            .await
            .delete_object(&region, container, &key)
            .await
            .map_err(|e| map_for(CANNOT_DELETE, &e, entry))?;
        if segments.is_empty() {
            return Ok(Completion::Full);
        }
        debug!(entry = %entry.path(), segments = segments.len(), "Delete segments");
        let degradations = self.segments.delete(&region, entry, &segments).await;
        Ok(Completion::from_degradations(degradations))
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> DeleteFeature for SwiftDelete<H> {
    async fn delete(
        &self,
        entries: &[Entry],
        _prompt: &dyn LoginCallback,
        listener: &dyn ProgressListener,
        cancel: &dyn CancelCallback,
    ) -> Result<Completion> {
        let mut completion = Completion::Full;
        for entry in entries {
            cancel.verify()?;
            deleting(listener, entry);
            completion = completion.merge(self.delete_entry(entry).await?);
        }
        Ok(completion)
    }
}
