//! S3 capabilities
//!
//! Buckets are addressed in the region reported by GetBucketLocation. Plain
//! directories are implied by common prefixes; placeholders are zero-byte
//! objects whose key ends with `/`.

mod delete;
mod list;
mod object;
mod region;

pub use delete::S3Delete;
pub use list::S3List;
pub use object::{S3Acl, S3Attributes, S3Copy, S3Find, S3Move, S3Url};
pub use region::{DEFAULT_REGION, S3RegionLookup};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{ObjectMetadata, ObjectPage};
use crate::entry::{Acl, Entry};
use crate::error::{Error, Result};
use crate::features::Capabilities;
use crate::mapping::WireResult;
use crate::region::{Region, RegionCache, RegionResolver};
use crate::session::Session;

/// Authenticated S3 client
///
/// Calls taking a region are sent to that region's endpoint.
#[async_trait]
pub trait S3Handle: Send + Sync {
    /// Regions the client can address
    fn regions(&self) -> Vec<Region>;

    /// Location constraint of the bucket; `None` for the classic region
    async fn bucket_location(&self, bucket: &str) -> WireResult<Option<String>>;

    async fn list_buckets(&self) -> WireResult<Vec<String>>;

    async fn head_bucket(&self, region: &Region, bucket: &str) -> WireResult<()>;

    async fn delete_bucket(&self, region: &Region, bucket: &str) -> WireResult<()>;

    async fn head_object(&self, region: &Region, bucket: &str, key: &str)
    -> WireResult<ObjectMetadata>;

    async fn delete_object(&self, region: &Region, bucket: &str, key: &str) -> WireResult<()>;

    async fn copy_object(
        &self,
        region: &Region,
        source_bucket: &str,
        source_key: &str,
        target_bucket: &str,
        target_key: &str,
    ) -> WireResult<()>;

    /// One page of a ListObjectsV2 request
    async fn list_objects(
        &self,
        region: &Region,
        bucket: &str,
        prefix: &str,
        delimiter: Option<char>,
        continuation: Option<&str>,
        limit: usize,
    ) -> WireResult<ObjectPage>;

    async fn put_object_acl(
        &self,
        region: &Region,
        bucket: &str,
        key: &str,
        acl: &Acl,
    ) -> WireResult<()>;

    /// Presigned GET request for the object
    async fn presign_get(
        &self,
        region: &Region,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> WireResult<Url>;
}

/// Bucket name and object key of an entry
///
/// Directories are addressed through their placeholder key with a trailing
/// delimiter.
pub(crate) fn bucket_and_key(entry: &Entry) -> Result<(&str, String)> {
    let bucket = entry.container_name().ok_or_else(|| {
        Error::Unsupported(format!("{} is not inside a bucket", entry.path()))
    })?;
    let key = entry.key();
    if entry.is_directory() && !key.is_empty() {
        return Ok((bucket, format!("{key}/")));
    }
    Ok((bucket, key))
}

/// Region resolver for buckets sharing `cache`
pub fn resolver<H: S3Handle + 'static>(session: &Session<H>, cache: Arc<RegionCache>) -> RegionResolver {
    RegionResolver::new(
        session.account(),
        cache,
        Arc::new(S3RegionLookup::new(session.clone())),
    )
}

/// Capability table of an S3 session
pub fn capabilities<H: S3Handle + 'static>(
    session: Session<H>,
    cache: Arc<RegionCache>,
) -> Capabilities {
    let regions = resolver(&session, cache);
    Capabilities {
        protocol: "s3",
        delete: Arc::new(S3Delete::new(session.clone(), regions.clone())),
        rename: Arc::new(S3Move::new(session.clone(), regions.clone())),
        find: Arc::new(S3Find::new(session.clone(), regions.clone())),
        attributes: Arc::new(S3Attributes::new(session.clone(), regions.clone())),
        list: Some(Arc::new(S3List::new(session.clone(), regions.clone()))),
        copy: Some(Arc::new(S3Copy::new(session.clone(), regions.clone()))),
        segments: None,
        url: Some(Arc::new(S3Url::new(session.clone(), regions.clone()))),
        unix_permission: None,
        acl: Some(Arc::new(S3Acl::new(session, regions))),
        timestamp: None,
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use url::Url;

    use super::S3Handle;
    use crate::entry::Acl;
    use crate::listing::ObjectRecord;
    use crate::mapping::{WireError, WireResult};
    use crate::protocol::{ObjectMetadata, ObjectPage};
    use crate::region::Region;

    /// Scripted S3 account recording every call as `"{VERB} {bucket}/{key}"`
    #[derive(Default)]
    pub struct FakeS3 {
        /// Bucket name to location constraint
        pub buckets: BTreeMap<String, Option<String>>,
        pub objects: BTreeMap<(String, String), ObjectMetadata>,
        pub failures: HashMap<String, WireError>,
        pub acls: Mutex<Vec<(String, Acl)>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeS3 {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_bucket(mut self, bucket: &str, location: Option<&str>) -> Self {
            self.buckets
                .insert(bucket.to_string(), location.map(str::to_string));
            self
        }

        pub fn with_object(mut self, bucket: &str, key: &str, metadata: ObjectMetadata) -> Self {
            self.objects
                .insert((bucket.to_string(), key.to_string()), metadata);
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
    impl S3Handle for FakeS3 {
        fn regions(&self) -> Vec<Region> {
            ["us-east-1", "eu-west-1", "ap-southeast-2"]
                .into_iter()
                .map(Region::new)
                .collect()
        }

        async fn bucket_location(&self, bucket: &str) -> WireResult<Option<String>> {
            self.record(format!("LOCATION {bucket}"))?;
            self.buckets
                .get(bucket)
                .cloned()
                .ok_or_else(|| WireError::http_code(404, "NoSuchBucket", "The specified bucket does not exist"))
        }

        async fn list_buckets(&self) -> WireResult<Vec<String>> {
            self.record("LIST-BUCKETS".to_string())?;
            Ok(self.buckets.keys().cloned().collect())
        }

        async fn head_bucket(&self, region: &Region, bucket: &str) -> WireResult<()> {
            self.record(format!("HEAD {}:{bucket}", region.name))?;
            if self.buckets.contains_key(bucket) {
                Ok(())
            } else {
                Err(WireError::http(404, "Not Found"))
            }
        }

        async fn delete_bucket(&self, _region: &Region, bucket: &str) -> WireResult<()> {
            self.record(format!("DELETE {bucket}"))
        }

        async fn head_object(
            &self,
            _region: &Region,
            bucket: &str,
            key: &str,
        ) -> WireResult<ObjectMetadata> {
            self.record(format!("HEAD {bucket}/{key}"))?;
            self.objects
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| WireError::http(404, "Not Found"))
        }

        async fn delete_object(&self, _region: &Region, bucket: &str, key: &str) -> WireResult<()> {
            self.record(format!("DELETE {bucket}/{key}"))
        }

        async fn copy_object(
            &self,
            _region: &Region,
            source_bucket: &str,
            source_key: &str,
            target_bucket: &str,
            target_key: &str,
        ) -> WireResult<()> {
            self.record(format!(
                "COPY {source_bucket}/{source_key} {target_bucket}/{target_key}"
            ))
        }

        async fn list_objects(
            &self,
            _region: &Region,
            bucket: &str,
            prefix: &str,
            delimiter: Option<char>,
            continuation: Option<&str>,
            limit: usize,
        ) -> WireResult<ObjectPage> {
            self.record(format!("LIST {bucket}/{prefix}"))?;
            let mut records = Vec::new();
            let mut prefixes = BTreeSet::new();
            for ((b, key), metadata) in &self.objects {
                if b != bucket || !key.starts_with(prefix) {
                    continue;
                }
                if continuation.is_some_and(|token| key.as_str() <= token) {
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
                    etag: metadata.etag.clone(),
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

        async fn put_object_acl(
            &self,
            _region: &Region,
            bucket: &str,
            key: &str,
            acl: &Acl,
        ) -> WireResult<()> {
            self.record(format!("ACL {bucket}/{key}"))?;
            self.acls
                .lock()
                .unwrap()
                .push((format!("{bucket}/{key}"), acl.clone()));
            Ok(())
        }

        async fn presign_get(
            &self,
            region: &Region,
            bucket: &str,
            key: &str,
            expiry: Duration,
        ) -> WireResult<Url> {
            self.record(format!("PRESIGN {bucket}/{key}"))?;
            Ok(Url::parse(&format!(
                "https://{bucket}.s3.{}.amazonaws.com/{key}?X-Amz-Expires={}",
                region.name,
                expiry.as_secs()
            ))
            .unwrap())
        }
    }
}
