use async_trait::async_trait;

use super::SftpHandle;
use crate::callback::ProgressListener;
use crate::entry::{Attributes, Entry};
use crate::error::Result;
use crate::features::{AttributesFeature, FindFeature, ListFeature};
use crate::listing::AttributedList;
use crate::mapping::map_for;
use crate::session::Session;

/// `readdir` listing
pub struct SftpList<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpList<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> ListFeature for SftpList<H> {
    async fn list(
        &self,
        directory: &Entry,
        listener: &dyn ProgressListener,
    ) -> Result<AttributedList> {
        listener.message(&format!("Listing directory {}", directory.name()));
        let children = self
            .session
            .lock()
            .await
            .read_dir(&directory.path().to_string())
            .await
            .map_err(|e| map_for("Listing directory", &e, directory))?;
        Ok(children
            .into_iter()
            .filter(|(name, _)| name != "." && name != "..")
            .map(|(name, stat)| {
                directory
                    .child(&name, stat.kind())
                    .with_attributes(stat.to_attributes())
            })
            .collect())
    }
}

pub struct SftpFind<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpFind<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> FindFeature for SftpFind<H> {
    async fn find(&self, entry: &Entry) -> Result<bool> {
        if entry.path().is_root() {
            return Ok(true);
        }
        let result = self
            .session
            .lock()
            .await
            .stat(&entry.path().to_string())
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
        }
    }
}

pub struct SftpAttributes<H> {
    session: Session<H>,
}

impl<H: SftpHandle + 'static> SftpAttributes<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: SftpHandle + 'static> AttributesFeature for SftpAttributes<H> {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes> {
        let stat = self
            .session
            .lock()
            .await
            .stat(&entry.path().to_string())
            .await
            .map_err(|e| map_for("Cannot read attributes of", &e, entry))?;
        let mut attributes = stat.to_attributes();
        if stat.directory {
            attributes.size = None;
        }
        Ok(attributes)
    }
}
