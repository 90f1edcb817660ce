use async_trait::async_trait;
use tracing::debug;

use super::{SwiftHandle, container_and_key};
use crate::callback::ProgressListener;
use crate::entry::{Attributes, Entry};
use crate::error::{Error, Result};
use crate::features::{AttributesFeature, CopyFeature, FindFeature, MoveFeature};
use crate::listing::object_prefix;
use crate::mapping::map_for;
use crate::protocol::{ObjectMetadata, renaming};
use crate::region::{Region, RegionResolver};
use crate::session::Session;

/// True when at least one object exists below `directory`
async fn has_children<H: SwiftHandle>(
    session: &Session<H>,
    region: &Region,
    directory: &Entry,
) -> Result<bool> {
    let (container, _) = container_and_key(directory)?;
    let page = session
        .lock()
        .await
        .list_objects(region, container, &object_prefix(directory), Some('/'), None, 1)
        .await
        .map_err(|e| map_for("Cannot read attributes of", &e, directory))?;
    Ok(!page.records.is_empty())
}

pub struct SwiftFind<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: SwiftHandle + 'static> SwiftFind<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> FindFeature for SwiftFind<H> {
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
            return Ok(true);
        }

        let (container, key) = container_and_key(entry)?;
        let result = self
            .session
            .lock()
            .await
            .head_object(&region, container, &key)
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() && entry.is_directory() => {
                debug!(entry = %entry.path(), "No placeholder, probing for children");
                has_children(&self.session, &region, entry).await
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
        }
    }
}

pub struct SwiftAttributes<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: SwiftHandle + 'static> SwiftAttributes<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> AttributesFeature for SwiftAttributes<H> {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes> {
        if entry.path().is_root() {
            return Ok(Attributes::default());
        }
        let region = self.regions.resolve(entry).await?;
        if entry.is_container() {
            return Ok(Attributes {
                region: Some(region.name),
                ..Default::default()
            });
        }

        let (container, key) = container_and_key(entry)?;
        let result = self
            .session
            .lock()
            .await
            .head_object(&region, container, &key)
            .await;
        match result {
            Ok(metadata) => {
                let mut attributes = metadata.to_attributes(Some(region.name));
                if entry.is_directory() {
                    attributes.size = None;
                }
                Ok(attributes)
            }
            Err(e) if e.is_not_found() && entry.is_directory() => {
                if has_children(&self.session, &region, entry).await? {
                    Ok(Attributes {
                        region: Some(region.name),
                        ..Default::default()
                    })
                } else {
                    Err(map_for("Cannot read attributes of", &e, entry))
                }
            }
            Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
        }
    }
}

/// Server side copy within one region
pub struct SwiftCopy<H> {
    session: Session<H>,
    regions: RegionResolver,
}

impl<H: SwiftHandle + 'static> SwiftCopy<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self { session, regions }
    }

    async fn copy_object(&self, region: &Region, source: &Entry, target: &Entry) -> Result<()> {
        if source.is_container() || target.is_container() {
            return Err(Error::Unsupported(format!(
                "Cannot copy container {}",
                source.path()
            )));
        }
        let (source_container, source_key) = container_and_key(source)?;
        let (target_container, target_key) = container_and_key(target)?;
        self.session
            .lock()
            .await
            .copy_object(
                region,
                source_container,
                &source_key,
                target_container,
                &target_key,
            )
            .await
            .map_err(|e| map_for("Cannot copy", &e, source))
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> CopyFeature for SwiftCopy<H> {
    async fn copy(&self, source: &Entry, target: &Entry) -> Result<()> {
        let region = self.regions.resolve(source).await?;
        self.copy_object(&region, source, target).await
    }
}

/// Move as server side copy followed by deletion of the source object
///
/// A large object is moved by copying its manifest, so the segments end up
/// referenced by the target. Deleting the source removes the manifest only.
pub struct SwiftMove<H> {
    session: Session<H>,
    regions: RegionResolver,
    copy: SwiftCopy<H>,
}

impl<H: SwiftHandle + 'static> SwiftMove<H> {
    pub fn new(session: Session<H>, regions: RegionResolver) -> Self {
        Self {
            copy: SwiftCopy::new(session.clone(), regions.clone()),
            session,
            regions,
        }
    }

    /// Manifest metadata of `source`, `None` for plain objects
    async fn manifest(&self, region: &Region, source: &Entry) -> Result<Option<ObjectMetadata>> {
        if !source.is_file() {
            return Ok(None);
        }
        let (container, key) = container_and_key(source)?;
        let metadata = self
            .session
            .lock()
            .await
            .head_object(region, container, &key)
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))?;
        Ok(metadata.is_manifest().then_some(metadata))
    }

    async fn copy_manifest(
        &self,
        region: &Region,
        source: &Entry,
        target: &Entry,
        manifest: &ObjectMetadata,
    ) -> Result<()> {
        let (source_container, source_key) = container_and_key(source)?;
        let (target_container, target_key) = container_and_key(target)?;
        debug!(source = %source.path(), target = %target.path(), "Copy large object manifest");
        self.session
            .lock()
            .await
            .copy_manifest(
                region,
                source_container,
                &source_key,
                target_container,
                &target_key,
                manifest,
            )
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))
    }
}

#[async_trait]
impl<H: SwiftHandle + 'static> MoveFeature for SwiftMove<H> {
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
            .resolve(source)
            .await
            .map_err(|e| e.for_entry("Cannot rename", source.path().to_string()))?;
        match self.manifest(&region, source).await? {
            Some(manifest) => self.copy_manifest(&region, source, target, &manifest).await?,
            None => self.copy.copy_object(&region, source, target).await?,
        }

        let (container, key) = container_and_key(source)?;
        self.session
            .lock()
            .await
            .delete_object(&region, container, &key)
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))
    }
}
