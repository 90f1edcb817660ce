use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use tracing::debug;

use super::{S3Handle, bucket_and_key};
use crate::callback::ProgressListener;
use crate::entry::{Acl, Attributes, Entry};
use crate::error::{Error, Result};
use crate::features::{
    AclFeature, AttributesFeature, CopyFeature, FindFeature, MoveFeature, SignedUrl, UrlFeature,
};
use crate::listing::object_prefix;
use crate::mapping::{WireError, map_for};
use crate::protocol::renaming;
use crate::region::{Region, RegionResolver};
use crate::session::Session;

/// Outcome of probing an object key
enum Probe {
    Object(crate::protocol::ObjectMetadata),
    /// No placeholder, but objects exist below the prefix
    Implied,
    Missing(WireError),
}

async fn probe<H: S3Handle>(session: &Session<H>, region: &Region, entry: &Entry) -> Result<Probe> {
    let (bucket, key) = bucket_and_key(entry)?;
    let result = session.lock().await.head_object(region, bucket, &key).await;
    match result {
        Ok(metadata) => Ok(Probe::Object(metadata)),
        Err(e) if e.is_not_found() && entry.is_directory() => {
            let page = session
                .lock()
                .await
                .list_objects(region, bucket, &object_prefix(entry), Some('/'), None, 1)
                .await
                .map_err(|e| map_for("Cannot read attributes of", &e, entry))?;
            if page.records.is_empty() {
                Ok(Probe::Missing(e))
            } else {
                debug!(entry = %entry.path(), "Directory implied by common prefix");
                Ok(Probe::Implied)
            }
        }
        Err(e) if e.is_not_found() => Ok(Probe::Missing(e)),
        Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
    }
}

pub struct S3Find<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Find<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> FindFeature for S3Find<H> {
    async fn find(&self, entry: &Entry) -> Result<bool> {
        if entry.path().is_root() {
            return Ok(true);
        }
        let region = match self.regions.resolve(entry).await {
            Ok(region) => region,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        if entry.is_container() {
            let (bucket, _) = bucket_and_key(entry)?;
            let result = self.session.lock().await.head_bucket(&region, bucket).await;
            return match result {
                Ok(()) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
            };
        }
        Ok(!matches!(
            probe(&self.session, &region, entry).await?,
            Probe::Missing(_)
        ))
    }
}

pub struct S3Attributes<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Attributes<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> AttributesFeature for S3Attributes<H> {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes> {
        if entry.path().is_root() {
            return Ok(Attributes::default());
        }
        let region = self.regions.resolve(entry).await?;
        let directory = Attributes {
            region: Some(region.name.clone()),
            ..Default::default()
        };
        if entry.is_container() {
            return Ok(directory);
        }
        match probe(&self.session, &region, entry).await? {
            Probe::Object(metadata) => {
                let mut attributes = metadata.to_attributes(Some(region.name));
                if entry.is_directory() {
                    attributes.size = None;
                }
                Ok(attributes)
            }
            Probe::Implied => Ok(directory),
            Probe::Missing(e) => Err(map_for("Cannot read attributes of", &e, entry)),
        }
    }
}

/// Server side CopyObject
pub struct S3Copy<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Copy<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }

    async fn copy_object(&self, region: &Region, source: &Entry, target: &Entry) -> Result<()> {
        if source.is_container() || target.is_container() {
            return Err(Error::Unsupported(format!(
                "Cannot copy bucket {}",
                source.path()
            )));
        }
        let (source_bucket, source_key) = bucket_and_key(source)?;
        let (target_bucket, target_key) = bucket_and_key(target)?;
        self.session
            .lock()
            .await
            .copy_object(region, source_bucket, &source_key, target_bucket, &target_key)
            .await
            .map_err(|e| map_for("Cannot copy", &e, source))
    }
}

#[async_trait]
impl<H: S3Handle + 'static> CopyFeature for S3Copy<H> {
    async fn copy(&self, source: &Entry, target: &Entry) -> Result<()> {
        let region = self.regions.resolve(target).await?;
        self.copy_object(&region, source, target).await
    }
}

/// Move as CopyObject followed by deletion of the source object
pub struct S3Move<H> {
    session: Session<H>,
    regions: RegionResolver,
    copy: S3Copy<H>,
}

impl<H: S3Handle + 'static> S3Move<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self {
            copy: S3Copy::new(session.clone(), regions.clone()),
            session,
            regions,
        }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> MoveFeature for S3Move<H> {
    async fn rename(
        &self,
        source: &Entry,
        target: &Entry,
        _overwrite: bool,
        listener: &dyn ProgressListener,
    ) -> Result<()> {
        renaming(listener, source, target);
        let region = self
            .regions
            .resolve(target)
            .await
            .map_err(|e| e.for_entry("Cannot rename", source.path().to_string()))?;
        self.copy.copy_object(&region, source, target).await?;

        let source_region = self.regions.resolve(source).await?;
        let (bucket, key) = bucket_and_key(source)?;
        self.session
            .lock()
            .await
            .delete_object(&source_region, bucket, &key)
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))
    }
}

/// PutObjectAcl with grants derived from permissions
pub struct S3Acl<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Acl<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> AclFeature for S3Acl<H> {
    async fn set_acl(&self, entry: &Entry, acl: &Acl) -> Result<()> {
        let region = self.regions.resolve(entry).await?;
        let (bucket, key) = bucket_and_key(entry)?;
        self.session
            .lock()
            .await
            .put_object_acl(&region, bucket, &key, acl)
            .await
            .map_err(|e| map_for("Cannot change permissions of", &e, entry))
    }
}

/// Presigned GET URLs
pub struct S3Url<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: S3Handle + 'static> S3Url<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: S3Handle + 'static> UrlFeature for S3Url<H> {
    async fn signed_url(&self, entry: &Entry, expiry: Duration) -> Result<Option<SignedUrl>> {
        if !entry.is_file() {
            return Ok(None);
        }
        let region = self.regions.resolve(entry).await?;
        let (bucket, key) = bucket_and_key(entry)?;
        let expires = SignedDuration::try_from(expiry)
            .ok()
            .and_then(|d| Timestamp::now().checked_add(d).ok())
            .ok_or_else(|| Error::Config(format!("Expiry {expiry:?} is out of range")))?;
        let url = self
            .session
            .lock()
            .await
            .presign_get(&region, bucket, &key, expiry)
            .await
            .map_err(|e| map_for("Cannot share", &e, entry))?;
        Ok(Some(SignedUrl { url, expires }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entry::{EntryPath, Permission, Principal, Role};
    use crate::protocol::ObjectMetadata;
    use crate::protocol::s3::{fake::FakeS3, resolver};
    use crate::protocol::testing::RecordingListener;
    use crate::region::RegionCache;

    fn session(fake: FakeS3) -> (Session<FakeS3>, RegionResolver) {
        let session = Session::new(
            "s3.amazonaws.com",
            "AKIA",
            fake.with_bucket("b", Some("eu-west-1")),
        );
        let regions = resolver(&session, Arc::new(RegionCache::new()));
        (session, regions)
    }

    fn object(size: u64) -> ObjectMetadata {
        ObjectMetadata {
            size,
            storage_class: Some("STANDARD".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_find_objects_and_directories() {
        let (session, regions) = session(
            FakeS3::new()
                .with_object("b", "f", object(1))
                .with_object("b", "p/", object(0))
                .with_object("b", "implied/x", object(1)),
        );
        let find = S3Find::new(session, regions);
        assert!(find.find(&Entry::file(EntryPath::parse("/b/f"))).await.unwrap());
        assert!(!find.find(&Entry::file(EntryPath::parse("/b/g"))).await.unwrap());
        assert!(find.find(&Entry::placeholder(EntryPath::parse("/b/p"))).await.unwrap());
        assert!(find.find(&Entry::directory(EntryPath::parse("/b/implied"))).await.unwrap());
        assert!(!find.find(&Entry::directory(EntryPath::parse("/b/none"))).await.unwrap());
        assert!(find.find(&Entry::volume("b")).await.unwrap());
        assert!(!find.find(&Entry::volume("missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_attributes() {
        let (session, regions) = session(FakeS3::new().with_object("b", "f", object(7)));
        let attributes = S3Attributes::new(session, regions);
        let attrs = attributes
            .attributes(&Entry::file(EntryPath::parse("/b/f")))
            .await
            .unwrap();
        assert_eq!(attrs.size, Some(7));
        assert_eq!(attrs.storage_class.as_deref(), Some("STANDARD"));
        assert_eq!(attrs.region.as_deref(), Some("eu-west-1"));

        let err = attributes
            .attributes(&Entry::file(EntryPath::parse("/b/g")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_move_copies_then_deletes() {
        let (session, regions) = session(FakeS3::new());
        let rename = S3Move::new(session.clone(), regions);
        rename
            .rename(
                &Entry::file(EntryPath::parse("/b/a")),
                &Entry::file(EntryPath::parse("/b/dir/a")),
                true,
                &RecordingListener::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            session.lock().await.calls(),
            vec!["LOCATION b", "COPY b/a b/dir/a", "DELETE b/a"]
        );
    }

    #[tokio::test]
    async fn test_copy_placeholder_key() {
        let (session, regions) = session(FakeS3::new());
        let copy = S3Copy::new(session.clone(), regions);
        copy.copy(
            &Entry::placeholder(EntryPath::parse("/b/d")),
            &Entry::placeholder(EntryPath::parse("/b/e")),
        )
        .await
        .unwrap();
        assert!(session.lock().await.calls().contains(&"COPY b/d/ b/e/".to_string()));
    }

    #[tokio::test]
    async fn test_set_acl() {
        let (session, regions) = session(FakeS3::new());
        let acl_feature = S3Acl::new(session.clone(), regions);
        let acl = Acl::from_permission(&Permission::from_mode(0o644));
        acl_feature
            .set_acl(&Entry::file(EntryPath::parse("/b/f")), &acl)
            .await
            .unwrap();
        let guard = session.lock().await;
        let acls = guard.acls.lock().unwrap();
        assert_eq!(acls[0].0, "b/f");
        assert!(acls[0].1.contains(&Principal::Everyone, Role::Read));
    }

    #[tokio::test]
    async fn test_presigned_url() {
        let (session, regions) = session(FakeS3::new());
        let urls = S3Url::new(session, regions);
        let signed = urls
            .signed_url(&Entry::file(EntryPath::parse("/b/f")), Duration::from_secs(3600))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signed.url.host_str(), Some("b.s3.eu-west-1.amazonaws.com"));
        assert!(signed.expires > Timestamp::now());
        assert!(
            urls.signed_url(&Entry::volume("b"), Duration::from_secs(60))
                .await
                .unwrap()
                .is_none()
        );
    }
}
