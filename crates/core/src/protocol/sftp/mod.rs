//! SFTP capabilities
//!
//! Attributes come from `stat` and `readdir`. There is no server side copy.

mod delete;
mod list;
mod object;

pub use delete::SftpDelete;
pub use list::{SftpAttributes, SftpFind, SftpList};
pub use object::{SftpMove, SftpTimestamp, SftpUnixPermission};

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::entry::{Attributes, EntryType, Permission};
use crate::features::Capabilities;
use crate::mapping::WireResult;
use crate::session::Session;

/// File attributes as returned by `stat`/`readdir`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SftpStat {
    pub directory: bool,
    pub symlink: bool,
    pub size: Option<u64>,
    /// Permission bits
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub modified: Option<Timestamp>,
    pub accessed: Option<Timestamp>,
}

impl SftpStat {
    pub fn kind(&self) -> EntryType {
        if self.symlink {
            EntryType::Symlink
        } else if self.directory {
            EntryType::Directory
        } else {
            EntryType::File
        }
    }

    pub fn to_attributes(&self) -> Attributes {
        Attributes {
            size: self.size,
            owner: self.uid.map(|uid| uid.to_string()),
            group: self.gid.map(|gid| gid.to_string()),
            permission: self.mode.map(Permission::from_mode),
            modified: self.modified,
            ..Default::default()
        }
    }
}

/// Open SFTP channel
#[async_trait]
pub trait SftpHandle: Send + Sync {
    async fn remove(&self, path: &str) -> WireResult<()>;

    async fn rmdir(&self, path: &str) -> WireResult<()>;

    /// `SSH_FXP_RENAME`; fails when the target exists
    async fn rename(&self, from: &str, to: &str) -> WireResult<()>;

    /// `posix-rename@openssh.com`, replacing the target atomically
    async fn posix_rename(&self, from: &str, to: &str) -> WireResult<()>;

    /// `lstat`
    async fn stat(&self, path: &str) -> WireResult<SftpStat>;

    /// Children of a directory without `.` and `..` filtering
    async fn read_dir(&self, path: &str) -> WireResult<Vec<(String, SftpStat)>>;

    async fn set_permissions(&self, path: &str, mode: u32) -> WireResult<()>;

    async fn set_times(&self, path: &str, accessed: Timestamp, modified: Timestamp)
    -> WireResult<()>;
}

/// Capability table of an SFTP session
pub fn capabilities<H: SftpHandle + 'static>(session: Session<H>) -> Capabilities {
    Capabilities {
        protocol: "sftp",
        delete: Arc::new(SftpDelete::new(session.clone())),
        rename: Arc::new(SftpMove::new(session.clone())),
        find: Arc::new(SftpFind::new(session.clone())),
        attributes: Arc::new(SftpAttributes::new(session.clone())),
        list: Some(Arc::new(SftpList::new(session.clone()))),
        copy: None,
        segments: None,
        url: None,
        unix_permission: Some(Arc::new(SftpUnixPermission::new(session.clone()))),
        acl: None,
        timestamp: Some(Arc::new(SftpTimestamp::new(session))),
    }
}
