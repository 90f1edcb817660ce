//! WebDAV capabilities
//!
//! Collections are addressed with a trailing slash. Listing requires
//! PROPFIND and is not provided.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ObjectMetadata, deleting, renaming};
use crate::callback::{CancelCallback, LoginCallback, ProgressListener};
use crate::entry::{Attributes, Entry};
use crate::error::{Completion, Result};
use crate::features::{AttributesFeature, Capabilities, CopyFeature, DeleteFeature, FindFeature, MoveFeature};
use crate::mapping::{WireResult, map_for};
use crate::session::Session;

/// Authenticated WebDAV client; paths are absolute and unencoded
#[async_trait]
pub trait DavHandle: Send + Sync {
    async fn delete(&self, path: &str) -> WireResult<()>;

    /// `MOVE` with `Destination` and `Overwrite: T|F`
    async fn move_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()>;

    /// `COPY` with `Destination` and `Overwrite: T|F`
    async fn copy_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()>;

    async fn head(&self, path: &str) -> WireResult<ObjectMetadata>;
}

/// Request path of an entry
fn resource(entry: &Entry) -> String {
    let path = entry.path().to_string();
    if entry.is_directory() && !entry.path().is_root() {
        format!("{path}/")
    } else {
        path
    }
}

pub struct DavDelete<H> {
    session: Session<H>,
}

impl<H: DavHandle + 'static> DavDelete<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: DavHandle + 'static> DeleteFeature for DavDelete<H> {
    async fn delete(
        &self,
        entries: &[Entry],
        _prompt: &dyn LoginCallback,
        listener: &dyn ProgressListener,
        cancel: &dyn CancelCallback,
    ) -> Result<Completion> {
        for entry in entries {
            cancel.verify()?;
            deleting(listener, entry);
            let result = self.session.lock().await.delete(&resource(entry)).await;
            match result {
                Ok(()) => {}
                // Some servers delete the contents of a collection before the collection itself
                Err(e) if e.is_not_found() && entry.is_directory() => {
                    debug!(entry = %entry.path(), "Ignore missing collection");
                }
                Err(e) => return Err(map_for("Cannot delete", &e, entry)),
            }
        }
        Ok(Completion::Full)
    }
}

pub struct DavMove<H> {
    session: Session<H>,
}

impl<H: DavHandle + 'static> DavMove<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: DavHandle + 'static> MoveFeature for DavMove<H> {
    async fn rename(
        &self,
        source: &Entry,
        target: &Entry,
        overwrite: bool,
        listener: &dyn ProgressListener,
    ) -> Result<()> {
        renaming(listener, source, target);
        self.session
            .lock()
            .await
            .move_to(&resource(source), &resource(target), overwrite)
            .await
            .map_err(|e| map_for("Cannot rename", &e, source))
    }
}

pub struct DavCopy<H> {
    session: Session<H>,
}

impl<H: DavHandle + 'static> DavCopy<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: DavHandle + 'static> CopyFeature for DavCopy<H> {
    async fn copy(&self, source: &Entry, target: &Entry) -> Result<()> {
        self.session
            .lock()
            .await
            .copy_to(&resource(source), &resource(target), true)
            .await
            .map_err(|e| map_for("Cannot copy", &e, source))
    }
}

pub struct DavFind<H> {
    session: Session<H>,
}

impl<H: DavHandle + 'static> DavFind<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: DavHandle + 'static> FindFeature for DavFind<H> {
    async fn find(&self, entry: &Entry) -> Result<bool> {
        if entry.path().is_root() {
            return Ok(true);
        }
        let result = self.session.lock().await.head(&resource(entry)).await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(map_for("Cannot read attributes of", &e, entry)),
        }
    }
}

pub struct DavAttributes<H> {
    session: Session<H>,
}

impl<H: DavHandle + 'static> DavAttributes<H> {
    pub fn new(session: Session<H>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<H: DavHandle + 'static> AttributesFeature for DavAttributes<H> {
    async fn attributes(&self, entry: &Entry) -> Result<Attributes> {
        let metadata = self
            .session
            .lock()
            .await
            .head(&resource(entry))
            .await
            .map_err(|e| map_for("Cannot read attributes of", &e, entry))?;
        let mut attributes = metadata.to_attributes(None);
        if entry.is_directory() {
            attributes.size = None;
        }
        Ok(attributes)
    }
}

/// Capability table of a WebDAV session
pub fn capabilities<H: DavHandle + 'static>(session: Session<H>) -> Capabilities {
    Capabilities {
        protocol: "dav",
        delete: Arc::new(DavDelete::new(session.clone())),
        rename: Arc::new(DavMove::new(session.clone())),
        find: Arc::new(DavFind::new(session.clone())),
        attributes: Arc::new(DavAttributes::new(session.clone())),
        list: None,
        copy: Some(Arc::new(DavCopy::new(session))),
        segments: None,
        url: None,
        unix_permission: None,
        acl: None,
        timestamp: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::callback::{DisabledCancelCallback, DisabledLoginCallback};
    use crate::entry::EntryPath;
    use crate::error::Error;
    use crate::mapping::WireError;
    use crate::protocol::testing::RecordingListener;

    #[derive(Default)]
    struct FakeDav {
        resources: HashMap<String, ObjectMetadata>,
        failures: HashMap<String, WireError>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDav {
        fn record(&self, call: String) -> WireResult<()> {
            self.calls.lock().unwrap().push(call.clone());
            match self.failures.get(&call) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl DavHandle for FakeDav {
        async fn delete(&self, path: &str) -> WireResult<()> {
            self.record(format!("DELETE {path}"))
        }

        async fn move_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()> {
            let flag = if overwrite { "T" } else { "F" };
            self.record(format!("MOVE {from} {to} {flag}"))
        }

        async fn copy_to(&self, from: &str, to: &str, overwrite: bool) -> WireResult<()> {
            let flag = if overwrite { "T" } else { "F" };
            self.record(format!("COPY {from} {to} {flag}"))
        }

        async fn head(&self, path: &str) -> WireResult<ObjectMetadata> {
            self.record(format!("HEAD {path}"))?;
            self.resources
                .get(path)
                .cloned()
                .ok_or_else(|| WireError::http(404, "Not Found"))
        }
    }

    fn session(fake: FakeDav) -> Session<FakeDav> {
        Session::new("dav.example.net", "user", fake)
    }

    async fn delete(session: &Session<FakeDav>, entries: &[Entry]) -> Result<Completion> {
        DavDelete::new(session.clone())
            .delete(
                entries,
                &DisabledLoginCallback,
                &RecordingListener::default(),
                &DisabledCancelCallback,
            )
            .await
    }

    #[tokio::test]
    async fn test_delete_collection_with_trailing_slash() {
        let session = session(FakeDav::default());
        delete(
            &session,
            &[
                Entry::file(EntryPath::parse("/d/f")),
                Entry::directory(EntryPath::parse("/d")),
            ],
        )
        .await
        .unwrap();
        assert_eq!(
            *session.lock().await.calls.lock().unwrap(),
            vec!["DELETE /d/f", "DELETE /d/"]
        );
    }

    #[tokio::test]
    async fn test_missing_collection_ignored() {
        let mut fake = FakeDav::default();
        fake.failures
            .insert("DELETE /d/".to_string(), WireError::http(404, "Not Found"));
        fake.failures
            .insert("DELETE /f".to_string(), WireError::http(404, "Not Found"));
        let session = session(fake);
        assert!(delete(&session, &[Entry::directory(EntryPath::parse("/d"))]).await.is_ok());
        let err = delete(&session, &[Entry::file(EntryPath::parse("/f"))])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_move_and_copy_overwrite_header() {
        let session = session(FakeDav::default());
        DavMove::new(session.clone())
            .rename(
                &Entry::file(EntryPath::parse("/a")),
                &Entry::file(EntryPath::parse("/b")),
                false,
                &RecordingListener::default(),
            )
            .await
            .unwrap();
        DavCopy::new(session.clone())
            .copy(
                &Entry::directory(EntryPath::parse("/c")),
                &Entry::directory(EntryPath::parse("/d")),
            )
            .await
            .unwrap();
        assert_eq!(
            *session.lock().await.calls.lock().unwrap(),
            vec!["MOVE /a /b F", "COPY /c/ /d/ T"]
        );
    }

    #[tokio::test]
    async fn test_find_and_attributes() {
        let mut fake = FakeDav::default();
        fake.resources.insert(
            "/f".to_string(),
            ObjectMetadata {
                size: 5,
                content_type: Some("text/plain".to_string()),
                ..Default::default()
            },
        );
        fake.failures
            .insert("HEAD /locked".to_string(), WireError::http(401, "Unauthorized"));
        let session = session(fake);

        let find = DavFind::new(session.clone());
        assert!(find.find(&Entry::file(EntryPath::parse("/f"))).await.unwrap());
        assert!(!find.find(&Entry::file(EntryPath::parse("/g"))).await.unwrap());
        let err = find
            .find(&Entry::file(EntryPath::parse("/locked")))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::AccessDenied(_)));

        let attrs = DavAttributes::new(session)
            .attributes(&Entry::file(EntryPath::parse("/f")))
            .await
            .unwrap();
        assert_eq!(attrs.size, Some(5));
        assert_eq!(attrs.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_capabilities() {
        let caps = capabilities(session(FakeDav::default()));
        assert!(caps.copy().is_ok());
        assert!(matches!(caps.list(), Err(Error::Unsupported(_))));
        assert!(caps.url.is_none());
    }
}
