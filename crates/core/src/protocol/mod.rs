//! Per-protocol capability implementations
//!
//! Each protocol module defines the client handle trait it consumes (the wire
//! client is provided by the caller, already authenticated) and a
//! `capabilities` constructor building the [`Capabilities`](crate::Capabilities)
//! table of a session.

pub mod dav;
pub mod ftp;
pub mod s3;
pub mod sftp;
pub mod swift;

use jiff::Timestamp;

use crate::callback::ProgressListener;
use crate::entry::{Attributes, Entry};
use crate::listing::ObjectRecord;

/// Object metadata returned by a HEAD request on an object store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub modified: Option<Timestamp>,
    pub storage_class: Option<String>,
    /// Dynamic large object manifest, `{container}/{prefix}`
    pub manifest: Option<String>,
    /// Static large object flag
    pub static_large_object: bool,
}

impl ObjectMetadata {
    /// True when the object references a set of segments
    pub fn is_manifest(&self) -> bool {
        self.manifest.is_some() || self.static_large_object
    }

    pub fn to_attributes(&self, region: Option<String>) -> Attributes {
        Attributes {
            size: Some(self.size),
            etag: self.etag.clone(),
            content_type: self.content_type.clone(),
            modified: self.modified,
            storage_class: self.storage_class.clone(),
            region,
            ..Default::default()
        }
    }
}

/// One page of an object listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPage {
    pub records: Vec<ObjectRecord>,
    /// Marker or continuation token of the next page
    pub next: Option<String>,
}

/// Objects requested per listing page
pub const LISTING_CHUNK_SIZE: usize = 1000;

/// Report the deletion of `entry`
pub(crate) fn deleting(listener: &dyn ProgressListener, entry: &Entry) {
    listener.message(&format!("Deleting {}", entry.name()));
}

/// Report the rename of `source`
pub(crate) fn renaming(listener: &dyn ProgressListener, source: &Entry, target: &Entry) {
    listener.message(&format!("Renaming {} to {}", source.name(), target.name()));
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use crate::callback::ProgressListener;

    /// Listener keeping every message
    #[derive(Debug, Default)]
    pub struct RecordingListener {
        pub messages: Mutex<Vec<String>>,
    }

    impl ProgressListener for RecordingListener {
        fn message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
