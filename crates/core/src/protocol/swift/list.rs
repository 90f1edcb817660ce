use async_trait::async_trait;
use tracing::debug;

use super::{SwiftHandle, container_and_key};
use crate::callback::ProgressListener;
use crate::entry::Entry;
use crate::error::Result;
use crate::features::ListFeature;
use crate::listing::{AttributedList, ObjectRecord, normalize_objects, object_prefix};
use crate::mapping::map_for;
use crate::protocol::LISTING_CHUNK_SIZE;
use crate::region::RegionResolver;
use crate::session::Session;

/// Lists containers of every region, or the children of a directory
pub struct SwiftList<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: SwiftHandle + 'static> SwiftList<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }

    async fn containers(&self, root: &Entry) -> Result<AttributedList> {
        let regions = self.session.lock().await.regions();
        let mut list = AttributedList::new();
        for region in regions {
            let names = self
                .session
                .lock()
                .await
                .list_containers(&region)
                .await
                .map_err(|e| map_for("Listing directory", &e, root))?;
            for name in names {
                let mut container = Entry::volume(&name);
                container.set_region(region.name.clone());
                list.push(container);
            }
        }
        list.sort();
        Ok(list)
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> ListFeature for SwiftList<H> {
    async fn list(
        &self,
        directory: &Entry,
        listener: &dyn ProgressListener,
    ) -> Result<AttributedList> {
        listener.message(&format!("Listing directory {}", directory.name()));
        if directory.path().is_root() {
            return self.containers(directory).await;
        }

        let region = self.regions.resolve(directory).await?;
        let (container, _) = container_and_key(directory)?;
        let prefix = object_prefix(directory);
        let mut records: Vec<ObjectRecord> = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .session
                .lock()
                .await
                .list_objects(
                    &region,
                    container,
                    &prefix,
                    Some('/'),
                    marker.as_deref(),
                    LISTING_CHUNK_SIZE,
                )
                .await
                .map_err(|e| map_for("Listing directory", &e, directory))?;
            records.extend(page.records);
            match page.next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        debug!(directory = %directory.path(), records = records.len(), "Listed objects");

        let mut hinted = directory.clone();
        hinted.set_region(region.name);
        Ok(normalize_objects(&hinted, records))
    }
}
