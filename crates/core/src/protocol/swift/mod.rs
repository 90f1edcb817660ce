//! OpenStack Swift capabilities
//!
//! Containers live in one region of the service catalog. Every operation
//! resolves the region of its container first and then addresses that
//! region's storage endpoint.

mod delete;
mod list;
mod object;
mod region;
mod segment;
mod url;

pub use delete::SwiftDelete;
pub use list::SwiftList;
pub use object::{SwiftAttributes, SwiftCopy, SwiftFind, SwiftMove};
pub use region::SwiftRegionLookup;
pub use segment::SwiftSegments;
pub use url::{SwiftUrl, TEMP_URL_KEY_HEADER, TempUrlKeys, TempUrlSigner};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ObjectMetadata, ObjectPage};
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::features::Capabilities;
use crate::mapping::{WireError, WireResult};
use crate::region::{Region, RegionCache, RegionResolver};
use crate::session::Session;

/// Authenticated Swift client
///
/// Every call addresses the storage endpoint of the given region.
#[async_trait]
pub trait SwiftHandle: Send + Sync {
    /// Regions of the service catalog
    fn regions(&self) -> Vec<Region>;

    async fn list_containers(&self, region: &Region) -> WireResult<Vec<String>>;

    async fn head_container(&self, region: &Region, container: &str) -> WireResult<()>;

    async fn delete_container(&self, region: &Region, container: &str) -> WireResult<()>;

    async fn head_object(
        &self,
        region: &Region,
        container: &str,
        key: &str,
    ) -> WireResult<ObjectMetadata>;

    async fn delete_object(&self, region: &Region, container: &str, key: &str) -> WireResult<()>;

    /// Delete many objects of one container in a single request
    ///
    /// Returns the keys that could not be deleted with their faults.
    async fn bulk_delete(
        &self,
        region: &Region,
        container: &str,
        keys: &[String],
    ) -> WireResult<Vec<(String, WireError)>>;

    /// Server side copy within the region
    async fn copy_object(
        &self,
        region: &Region,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
    ) -> WireResult<()>;

    /// Server side copy of a large object manifest itself
    ///
    /// The target references the same segments as the source instead of
    /// holding their joined content.
    async fn copy_manifest(
        &self,
        region: &Region,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
        manifest: &ObjectMetadata,
    ) -> WireResult<()>;

    /// One page of objects under `prefix`, starting after `marker`
    async fn list_objects(
        &self,
        region: &Region,
        container: &str,
        prefix: &str,
        delimiter: Option<char>,
        marker: Option<&str>,
        limit: usize,
    ) -> WireResult<ObjectPage>;

    /// Account metadata headers of the region
    async fn account_metadata(&self, region: &Region) -> WireResult<HashMap<String, String>>;
}

/// Container name and object key of an entry
pub(crate) fn container_and_key(entry: &Entry) -> Result<(&str, String)> {
    let container = entry.container_name().ok_or_else(|| {
        Error::Unsupported(format!("{} is not inside a container", entry.path()))
    })?;
    Ok((container, entry.key()))
}

/// Region resolver for Swift containers sharing `cache`
pub fn resolver<H: SwiftHandle + 'static>(
    session: &Session<H>,
    cache: Arc<RegionCache>,
) -> RegionResolver {
    RegionResolver::new(
        session.account(),
        cache,
        Arc::new(SwiftRegionLookup::new(session.clone())),
    )
}

/// Capability table of a Swift session
pub fn capabilities<H: SwiftHandle + 'static>(
    session: Session<H>,
    cache: Arc<RegionCache>,
) -> Capabilities {
    let regions = resolver(&session, cache);
    let segments = Arc::new(SwiftSegments::new(session.clone(), regions.clone()));
    Capabilities {
        protocol: "swift",
        delete: Arc::new(SwiftDelete::new(
            session.clone(),
            regions.clone(),
            Arc::clone(&segments),
        )),
        rename: Arc::new(SwiftMove::new(session.clone(), regions.clone())),
        find: Arc::new(SwiftFind::new(session.clone(), regions.clone())),
        attributes: Arc::new(SwiftAttributes::new(session.clone(), regions.clone())),
        list: Some(Arc::new(SwiftList::new(session.clone(), regions.clone()))),
        copy: Some(Arc::new(SwiftCopy::new(session.clone(), regions.clone()))),
        segments: Some(segments),
        url: Some(Arc::new(SwiftUrl::new(
            session,
            regions,
            Arc::new(TempUrlKeys::default()),
        ))),
        unix_permission: None,
        acl: None,
        timestamp: None,
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::SwiftHandle;
    use crate::listing::ObjectRecord;
    use crate::mapping::{WireError, WireResult};
    use crate::protocol::{ObjectMetadata, ObjectPage};
    use crate::region::Region;

    /// Scripted Swift account recording every call
    ///
    /// Calls are recorded as `"{VERB} {container}/{key}"`; a failure scripted
    /// under the same string is returned instead of success.
    #[derive(Default)]
    pub struct FakeSwift {
        pub regions: Vec<Region>,
        /// Container name to region name
        pub containers: HashMap<String, String>,
        pub objects: BTreeMap<(String, String), ObjectMetadata>,
        pub failures: HashMap<String, WireError>,
        /// Region name to temp URL key
        pub temp_url_keys: HashMap<String, String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSwift {
        pub fn new() -> Self {
            Self {
                regions: vec![
                    Region::new("DFW")
                        .with_storage_url("https://storage101.dfw1.example.net/v1/acct".parse().unwrap())
                        .with_default(true),
                    Region::new("ORD")
                        .with_storage_url("https://storage101.ord1.example.net/v1/acct".parse().unwrap()),
                ],
                ..Default::default()
            }
        }

        pub fn with_container(mut self, container: &str, region: &str) -> Self {
            self.containers.insert(container.to_string(), region.to_string());
            self
        }

        pub fn with_object(mut self, container: &str, key: &str, metadata: ObjectMetadata) -> Self {
            self.objects
                .insert((container.to_string(), key.to_string()), metadata);
            self
        }

        pub fn with_failure(mut self, call: &str, err: WireError) -> Self {
            self.failures.insert(call.to_string(), err);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> WireResult<()> {
            self.calls.lock().unwrap().push(call.clone());
            match self.failures.get(&call) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl SwiftHandle for FakeSwift {
        fn regions(&self) -> Vec<Region> {
            self.regions.clone()
        }

        async fn list_containers(&self, region: &Region) -> WireResult<Vec<String>> {
            self.record(format!("LIST-CONTAINERS {}", region.name))?;
            Ok(self
                .containers
                .iter()
                .filter(|(_, r)| **r == region.name)
                .map(|(c, _)| c.clone())
                .collect())
        }

        async fn head_container(&self, region: &Region, container: &str) -> WireResult<()> {
            self.record(format!("HEAD {}:{container}", region.name))?;
            match self.containers.get(container) {
                Some(r) if *r == region.name => Ok(()),
                _ => Err(WireError::http(404, "Container not found")),
            }
        }

        async fn delete_container(&self, _region: &Region, container: &str) -> WireResult<()> {
            self.record(format!("DELETE {container}"))
        }

        async fn head_object(
            &self,
            _region: &Region,
            container: &str,
            key: &str,
        ) -> WireResult<ObjectMetadata> {
            self.record(format!("HEAD {container}/{key}"))?;
            self.objects
                .get(&(container.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| WireError::http(404, "Object not found"))
        }

        async fn delete_object(&self, _region: &Region, container: &str, key: &str) -> WireResult<()> {
            self.record(format!("DELETE {container}/{key}"))
        }

        async fn bulk_delete(
            &self,
            _region: &Region,
            container: &str,
            keys: &[String],
        ) -> WireResult<Vec<(String, WireError)>> {
            self.record(format!("BULK {container} {}", keys.join(",")))?;
            Ok(keys
                .iter()
                .filter_map(|key| {
                    self.failures
                        .get(&format!("DELETE {container}/{key}"))
                        .map(|err| (key.clone(), err.clone()))
                })
                .collect())
        }

        async fn copy_object(
            &self,
            _region: &Region,
            source_container: &str,
            source_key: &str,
            target_container: &str,
            target_key: &str,
        ) -> WireResult<()> {
            self.record(format!(
                "COPY {source_container}/{source_key} {target_container}/{target_key}"
            ))
        }

        async fn copy_manifest(
            &self,
            _region: &Region,
            source_container: &str,
            source_key: &str,
            target_container: &str,
            target_key: &str,
            _manifest: &ObjectMetadata,
        ) -> WireResult<()> {
            self.record(format!(
                "COPY-MANIFEST {source_container}/{source_key} {target_container}/{target_key}"
            ))
        }

        async fn list_objects(
            &self,
            _region: &Region,
            container: &str,
            prefix: &str,
            delimiter: Option<char>,
            marker: Option<&str>,
            limit: usize,
        ) -> WireResult<ObjectPage> {
            self.record(format!("LIST {container}/{prefix}"))?;
            let mut records = Vec::new();
            let mut prefixes = BTreeSet::new();
            for ((c, key), metadata) in &self.objects {
                if c != container || !key.starts_with(prefix) {
                    continue;
                }
                if marker.is_some_and(|m| key.as_str() <= m) {
                    continue;
                }
                let rest = &key[prefix.len()..];
                if let Some(d) = delimiter
                    && let Some(index) = rest.find(d)
                    && index + 1 < rest.len()
                {
                    let common = format!("{prefix}{}", &rest[..=index]);
                    if prefixes.insert(common.clone()) {
                        records.push(ObjectRecord::prefix(common));
                    }
                    continue;
                }
                records.push(ObjectRecord {
                    content_type: metadata.content_type.clone(),
                    ..ObjectRecord::object(key.clone(), metadata.size)
                });
                if records.len() == limit {
                    break;
                }
            }
            let next = (records.len() == limit)
                .then(|| records.last().map(|r| r.key.clone()))
                .flatten();
            Ok(ObjectPage { records, next })
        }

        async fn account_metadata(&self, region: &Region) -> WireResult<HashMap<String, String>> {
            self.record(format!("ACCOUNT {}", region.name))?;
            let mut headers = HashMap::new();
            if let Some(key) = self.temp_url_keys.get(&region.name) {
                headers.insert("X-Account-Meta-Temp-URL-Key".to_string(), key.clone());
            }
            Ok(headers)
        }
    }
}
