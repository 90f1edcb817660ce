use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::FtpHandle;
use crate::callback::{DisabledProgressListener, ProgressListener};
use crate::entry::{Attributes, Entry};
use crate::error::{Error, Result};
use crate::features::{AttributesFeature, FindFeature, ListFeature};
use crate::listing::{AttributedList, MlsdReader};
use crate::mapping::map_for;
use crate::session::Session;

/// MLSD listing of a directory
pub struct FtpList<H> {
    session: Session<H>,
    encoding: String,
    reader: MlsdReader,
}

impl<H: FtpHandle + 'static> FtpList<H> {
    pub fn new(session: Session<H>, encoding: impl Into<String>) -> Self {
        Self {
            session,
            encoding: encoding.into(),
            reader: MlsdReader::new(),
        }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> ListFeature for FtpList<H> {
    async fn list(
        &self,
        directory: &Entry,
        listener: &dyn ProgressListener,
    ) -> Result<AttributedList> {
        listener.message(&format!("Listing directory {}", directory.name()));
        let lines = self
            .session
            .lock()
            .await
            .mlsd(&directory.path().to_string())
            .await
            .map_err(|e| map_for("Listing directory", &e, directory))?;
        let reply = self.reader.read(directory, &self.encoding, &lines);
        for error in &reply.errors {
            warn!(directory = %directory.path(), error = %error, "Skipped listing line");
        }
        if !reply.success && !reply.children.is_empty() {
            return Err(Error::Protocol {
                message: "Invalid MLSD response: lists only the directory itself".to_string(),
                status: None,
            }
            .for_entry("Listing directory", directory.path().to_string()));
        }
        debug!(directory = %directory.path(), children = reply.children.len(), "Listed directory");
        Ok(reply.children)
    }
}

/// Look up `entry` in the listing of its parent
async fn lookup<H: FtpHandle + 'static>(list: &FtpList<H>, entry: &Entry) -> Result<Option<Entry>> {
    let Some(parent) = entry.parent() else {
        return Ok(None);
    };
    let children = list.list(&parent, &DisabledProgressListener).await?;
    Ok(children.find(entry.name()).cloned())
}

pub struct FtpFind<H> {
    list: Arc<FtpList<H>>,
}

impl<H: FtpHandle + 'static> FtpFind<H> {
    pub fn new(list: Arc<FtpList<H>>) -> Self {
        Self { list }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> FindFeature for FtpFind<H> {
    async fn find(&self, entry: &Entry) -> Result<bool> {
        if entry.path().is_root() {
            return Ok(true);
        }
        match lookup(&self.list, entry).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub struct FtpAttributes<H> {
    list: Arc<FtpList<H>>,
}

impl<H: FtpHandle + 'static> FtpAttributes<H> {
    pub fn new(list: Arc<FtpList<H>>) -> Self {
        Self { list }
    }
}

#[async_trait]
impl<H: FtpHandle + 'static> AttributesFeature for FtpAttributes<H> {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes> {
        if entry.path().is_root() {
            return Ok(Attributes::default());
        }
        match lookup(&self.list, entry).await? {
            Some(found) => Ok(found.attributes().clone()),
            None => Err(Error::NotFound(entry.path().to_string())
                .for_entry("Cannot read attributes of", entry.path().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryPath, EntryType, Permission};
    use crate::protocol::ftp::fake::FakeFtp;
    use crate::protocol::testing::RecordingListener;

    fn list_of(fake: FakeFtp) -> Arc<FtpList<FakeFtp>> {
        Arc::new(FtpList::new(
            Session::new("ftp.example.net", "anonymous", fake),
            "UTF-8",
        ))
    }

    fn www() -> FakeFtp {
        FakeFtp::new().with_listing(
            "/www",
            &[
                "type=cdir;modify=20090210192929; .",
                "type=file;size=4161;modify=20090210192929;unix.mode=0644; index.html",
                "type=dir;modify=20090210192929; images",
            ],
        )
    }

    #[tokio::test]
    async fn test_list_skips_unknown_types() {
        let list = list_of(www());
        let children = list
            .list(&Entry::directory(EntryPath::parse("/www")), &RecordingListener::default())
            .await
            .unwrap();
        let found: Vec<(String, EntryType)> = children
            .iter()
            .map(|e| (e.name().to_string(), e.kind()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("index.html".to_string(), EntryType::File),
                ("images".to_string(), EntryType::Directory),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let list = list_of(FakeFtp::new().with_listing("/empty", &[]));
        let children = list
            .list(&Entry::directory(EntryPath::parse("/empty")), &RecordingListener::default())
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_lines_read_as_empty_directory() {
        let fake = FakeFtp::new().with_listing(
            "/www/empty",
            &[
                "type=cdir;modify=20090210192929;perm=flcdmpe; .",
                "type=pdir;modify=20090210192929;perm=flcdmpe; ..",
            ],
        );
        let list = list_of(fake);
        let children = list
            .list(
                &Entry::directory(EntryPath::parse("/www/empty")),
                &RecordingListener::default(),
            )
            .await
            .unwrap();
        assert!(children.is_empty());

        let find = FtpFind::new(list);
        assert!(
            !find
                .find(&Entry::file(EntryPath::parse("/www/empty/new.txt")))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_bogus_listing_is_error() {
        let list = list_of(FakeFtp::new().with_listing("/www", &["type=dir; www"]));
        let err = list
            .list(&Entry::directory(EntryPath::parse("/www")), &RecordingListener::default())
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::Protocol { .. }));
        assert_eq!(err.path(), Some("/www"));
    }

    #[tokio::test]
    async fn test_find_in_parent_listing() {
        let find = FtpFind::new(list_of(www()));
        assert!(find.find(&Entry::file(EntryPath::parse("/www/index.html"))).await.unwrap());
        assert!(!find.find(&Entry::file(EntryPath::parse("/www/missing"))).await.unwrap());
        assert!(!find.find(&Entry::file(EntryPath::parse("/gone/f"))).await.unwrap());
    }

    #[tokio::test]
    async fn test_attributes_from_parent_listing() {
        let attributes = FtpAttributes::new(list_of(www()));
        let attrs = attributes
            .attributes(&Entry::file(EntryPath::parse("/www/index.html")))
            .await
            .unwrap();
        assert_eq!(attrs.size, Some(4161));
        assert_eq!(attrs.permission, Some(Permission::from_mode(0o644)));
        assert!(attrs.modified.is_some());

        let err = attributes
            .attributes(&Entry::file(EntryPath::parse("/www/missing")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
