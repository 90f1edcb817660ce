//! FTP capabilities
//!
//! Attributes come from MLSD listings of the parent directory, parsed by
//! [`MlsdReader`](crate::listing::MlsdReader). There is no server side copy.

mod delete;
mod list;
mod object;

pub use delete::FtpDelete;
pub use list::{FtpAttributes, FtpFind, FtpList};
pub use object::{FtpMove, FtpTimestamp, FtpUnixPermission};

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::features::Capabilities;
use crate::mapping::WireResult;
use crate::session::Session;

/// Logged in FTP control connection
///
/// Paths are absolute and `/`-delimited.
#[async_trait]
pub trait FtpHandle: Send + Sync {
    /// `DELE`
    async fn delete_file(&self, path: &str) -> WireResult<()>;

    /// `RMD`
    async fn remove_directory(&self, path: &str) -> WireResult<()>;

    /// `RNFR` followed by `RNTO`
    async fn rename(&self, from: &str, to: &str) -> WireResult<()>;

    /// Lines of an `MLSD` reply for the directory
    async fn mlsd(&self, path: &str) -> WireResult<Vec<String>>;

    /// `SITE CHMOD` with an octal mode
    async fn chmod(&self, path: &str, mode: &str) -> WireResult<()>;

    /// `MFMT`
    async fn set_modified(&self, path: &str, modified: Timestamp) -> WireResult<()>;
}

/// Capability table of an FTP session using `encoding` for the control channel
pub fn capabilities<H: FtpHandle + 'static>(
    session: Session<H>,
    encoding: impl Into<String>,
) -> Capabilities {
    let list = Arc::new(FtpList::new(session.clone(), encoding));
    Capabilities {
        protocol: "ftp",
        delete: Arc::new(FtpDelete::new(session.clone())),
        rename: Arc::new(FtpMove::new(session.clone())),
        find: Arc::new(FtpFind::new(Arc::clone(&list))),
        attributes: Arc::new(FtpAttributes::new(Arc::clone(&list))),
        list: Some(list),
        copy: None,
        segments: None,
        url: None,
        unix_permission: Some(Arc::new(FtpUnixPermission::new(session.clone()))),
        acl: None,
        timestamp: Some(Arc::new(FtpTimestamp::new(session))),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use jiff::Timestamp;

    use super::FtpHandle;
    use crate::mapping::{WireError, WireResult};

    /// Scripted FTP server recording commands as `"{COMMAND} {path}"`
    #[derive(Default)]
    pub struct FakeFtp {
        /// Directory path to MLSD reply lines
        pub listings: HashMap<String, Vec<String>>,
        pub failures: HashMap<String, WireError>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeFtp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_listing(mut self, path: &str, lines: &[&str]) -> Self {
            self.listings.insert(
                path.to_string(),
                lines.iter().map(|l| l.to_string()).collect(),
            );
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
    impl FtpHandle for FakeFtp {
        async fn delete_file(&self, path: &str) -> WireResult<()> {
            self.record(format!("DELE {path}"))
        }

        async fn remove_directory(&self, path: &str) -> WireResult<()> {
            self.record(format!("RMD {path}"))
        }

        async fn rename(&self, from: &str, to: &str) -> WireResult<()> {
            self.record(format!("RNFR {from} RNTO {to}"))
        }

        async fn mlsd(&self, path: &str) -> WireResult<Vec<String>> {
            self.record(format!("MLSD {path}"))?;
            self.listings
                .get(path)
                .cloned()
                .ok_or_else(|| WireError::ftp(550, "No such file or directory"))
        }

        async fn chmod(&self, path: &str, mode: &str) -> WireResult<()> {
            self.record(format!("SITE CHMOD {mode} {path}"))
        }

        async fn set_modified(&self, path: &str, modified: Timestamp) -> WireResult<()> {
            self.record(format!(
                "MFMT {} {path}",
                modified.strftime("%Y%m%d%H%M%S")
            ))
        }
    }
}
