use async_trait::async_trait;
use tracing::debug;

use super::S3Handle;
use crate::entry::Entry;
use crate::error::Result;
use crate::mapping::map_for;
use crate::region::{Region, RegionLookup};
use crate::session::Session;

/// Region of buckets without a location constraint
pub const DEFAULT_REGION: &str = "us-east-1";

/// Locates buckets with GetBucketLocation
pub struct S3RegionLookup<H> {
    session: Session<H>,
}

impl<H> S3RegionLookup<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> RegionLookup for S3RegionLookup<H> {
    async fn catalog(&self) -> Result<Vec<Region>> {
        Ok(self.session.lock().await.regions())
    }

    async fn locate(&self, container: &Entry) -> Result<Region> {
        let location = self
            .session
            .lock()
            .await
            .bucket_location(container.name())
            .await
            .map_err(|e| map_for("Cannot read bucket location", &e, container))?;
        let name = match location.as_deref() {
            None | Some("") => DEFAULT_REGION,
            // Legacy constraint of eu-west-1
            Some("EU") => "eu-west-1",
            Some(name) => name,
        };
        debug!(bucket = %container.name(), region = name, "Bucket location");
        Ok(Region::new(name))
    }
}
