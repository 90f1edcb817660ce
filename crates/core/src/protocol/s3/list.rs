use async_trait::async_trait;
use tracing::debug;

use super::{S3Handle, bucket_and_key};
use crate::callback::ProgressListener;
use crate::entry::Entry;
use crate::error::Result;
use crate::features::ListFeature;
use crate::listing::{AttributedList, ObjectRecord, normalize_objects, object_prefix};
use crate::mapping::map_for;
use crate::protocol::LISTING_CHUNK_SIZE;
use crate::region::RegionResolver;
use crate::session::Session;

/// Lists buckets, or the children of a bucket or directory
pub struct S3List<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3List<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> ListFeature for S3List<H> {
    async fn list(
        &self,
        directory: &Entry,
        listener: &dyn ProgressListener,
    ) -> Result<AttributedList> {
        listener.message(&format!("Listing directory {}", directory.name()));
        if directory.path().is_root() {
            let buckets = self
                .session
                .lock()
                .await
                .list_buckets()
                .await
                .map_err(|e| map_for("Listing directory", &e, directory))?;
            return Ok(buckets.iter().map(|name| Entry::volume(name)).collect());
        }

        let region = self.regions.resolve(directory).await?;
        let (bucket, _) = bucket_and_key(directory)?;
        let prefix = object_prefix(directory);
        let mut records: Vec<ObjectRecord> = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .session
                .lock()
                .await
                .list_objects(
                    &region,
                    bucket,
                    &prefix,
                    Some('/'),
                    continuation.as_deref(),
                    LISTING_CHUNK_SIZE,
                )
                .await
                .map_err(|e| map_for("Listing directory", &e, directory))?;
            records.extend(page.records);
            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        debug!(directory = %directory.path(), records = records.len(), "Listed objects");

        let mut hinted = directory.clone();
        hinted.set_region(region.name);
        Ok(normalize_objects(&hinted, records))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::{EntryPath, EntryType};
    use crate::protocol::ObjectMetadata;
    use crate::protocol::s3::{fake::FakeS3, resolver};
    use crate::protocol::testing::RecordingListener;
    use crate::region::RegionCache;

    fn lister(fake: FakeS3) -> S3List<FakeS3> {
        let session = Session::new("s3.amazonaws.com", "AKIA", fake);
        let regions = resolver(&session, Arc::new(RegionCache::new()));
        S3List::new(session, regions)
    }

    #[tokio::test]
    async fn test_list_buckets() {
        let list = lister(FakeS3::new().with_bucket("a", None).with_bucket("b", Some("EU")));
        let children = list
            .list(&Entry::directory(EntryPath::root()), &RecordingListener::default())
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(Entry::is_volume));
    }

    #[tokio::test]
    async fn test_list_bucket_merges_placeholders() {
        let list = lister(
            FakeS3::new()
                .with_bucket("b", Some("eu-west-1"))
                .with_object("b", "photos/", ObjectMetadata::default())
                .with_object("b", "photos/a.jpg", ObjectMetadata {
                    size: 10,
                    ..Default::default()
                })
                .with_object("b", "readme.txt", ObjectMetadata {
                    size: 4,
                    ..Default::default()
                }),
        );
        let children = list
            .list(&Entry::volume("b"), &RecordingListener::default())
            .await
            .unwrap();
        let found: Vec<(String, EntryType)> = children
            .iter()
            .map(|e| (e.name().to_string(), e.kind()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("photos".to_string(), EntryType::Placeholder),
                ("readme.txt".to_string(), EntryType::File),
            ]
        );
        assert_eq!(
            children.find("readme.txt").unwrap().attributes().region.as_deref(),
            Some("eu-west-1")
        );
    }
}
