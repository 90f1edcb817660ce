use async_trait::async_trait;
use tracing::debug;

use super::SwiftHandle;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::mapping::map_for;
use crate::region::{Region, RegionLookup};
use crate::session::Session;

/// Locates containers by probing the regions of the service catalog
pub struct SwiftRegionLookup<H> {
    session: Session<H>,
}

impl<H> SwiftRegionLookup<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> RegionLookup for SwiftRegionLookup<H> {
    async fn catalog(&self) -> Result<Vec<Region>> {
        Ok(self.session.lock().await.regions())
    }

    /// HEAD the container in the default region first, then in every other
    async fn locate(&self, container: &Entry) -> Result<Region> {
        let mut regions = self.session.lock().await.regions();
        regions.sort_by_key(|r| !r.default);
        for region in regions {
            let result = self
                .session
                .lock()
                .await
                .head_container(&region, container.name())
                .await;
            match result {
                Ok(()) => return Ok(region),
                Err(e) if e.is_not_found() => {
                    debug!(container = %container.name(), region = %region, "Container not in region");
                }
                Err(e) => return Err(map_for("Cannot read container location", &e, container)),
            }
        }
        Err(Error::NotFound(format!(
            "Container {} not found in any region",
            container.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::EntryPath;
    use crate::mapping::WireError;
    use crate::protocol::swift::{fake::FakeSwift, resolver};
    use crate::region::RegionCache;

    #[tokio::test]
    async fn test_locate_probes_default_region_first() {
        let session = Session::new(
            "auth.example.net",
            "acct",
            FakeSwift::new().with_container("c", "ORD"),
        );
        let lookup = SwiftRegionLookup::new(session.clone());
        let region = lookup.locate(&Entry::volume("c")).await.unwrap();
        assert_eq!(region.name, "ORD");
        assert_eq!(session.lock().await.calls(), vec!["HEAD DFW:c", "HEAD ORD:c"]);
    }

    #[tokio::test]
    async fn test_locate_unknown_container() {
        let session = Session::new("auth.example.net", "acct", FakeSwift::new());
        let lookup = SwiftRegionLookup::new(session);
        assert!(lookup.locate(&Entry::volume("none")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_locate_fails_on_other_errors() {
        let session = Session::new(
            "auth.example.net",
            "acct",
            FakeSwift::new().with_failure("HEAD DFW:c", WireError::http(401, "Unauthorized")),
        );
        let lookup = SwiftRegionLookup::new(session);
        let err = lookup.locate(&Entry::volume("c")).await.unwrap_err();
        assert_eq!(err.path(), Some("/c"));
    }

    #[tokio::test]
    async fn test_resolver_caches_per_container() {
        let session = Session::new(
            "auth.example.net",
            "acct",
            FakeSwift::new()
                .with_container("a", "DFW")
                .with_container("b", "ORD"),
        );
        let cache = Arc::new(RegionCache::new());
        let regions = resolver(&session, Arc::clone(&cache));

        let a = Entry::file(EntryPath::parse("/a/f"));
        let b = Entry::file(EntryPath::parse("/b/f"));
        assert_eq!(regions.resolve(&a).await.unwrap().name, "DFW");
        assert_eq!(regions.resolve(&b).await.unwrap().name, "ORD");
        assert_eq!(regions.resolve(&a).await.unwrap().name, "DFW");
        assert_eq!(session.lock().await.calls().len(), 3);

        regions.invalidate(&a).await;
        assert_eq!(cache.len().await, 1);
    }
}
