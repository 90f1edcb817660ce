//! Directory listings
//!
//! [`AttributedList`] is the normalized child set of a directory. Object
//! store listings are folded into it by [`normalize_objects`], FTP machine
//! listings by [`mlsd::MlsdReader`].

pub mod mlsd;

pub use mlsd::MlsdReader;

use std::collections::HashMap;

use jiff::Timestamp;

use crate::entry::{Attributes, Entry, EntryPath, EntryType};
use crate::error::Error;

/// Ordered children of a directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributedList {
    entries: Vec<Entry>,
}

impl AttributedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// First child with the given name
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn contains(&self, path: &EntryPath) -> bool {
        self.entries.iter().any(|e| e.path() == path)
    }

    /// Sort children by name
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.name().cmp(b.name()));
    }

    pub fn into_vec(self) -> Vec<Entry> {
        self.entries
    }
}

impl FromIterator<Entry> for AttributedList {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AttributedList {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributedList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Outcome of parsing a raw listing reply
#[derive(Debug, Default)]
pub struct ListingReply {
    pub children: AttributedList,
    /// At least one line produced a trustworthy entry
    pub success: bool,
    /// Per-line parse failures
    pub errors: Vec<Error>,
}

/// Content type marking a Swift directory placeholder
pub const DIRECTORY_CONTENT_TYPE: &str = "application/directory";

/// One record of a delimiter listing of an object store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRecord {
    /// Full object key, or the common prefix for `prefix` records
    pub key: String,
    /// Common prefix (implied directory) rather than an object
    pub prefix: bool,
    pub size: u64,
    pub modified: Option<Timestamp>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
    pub content_type: Option<String>,
}

impl ObjectRecord {
    pub fn object(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            ..Default::default()
        }
    }

    pub fn prefix(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prefix: true,
            ..Default::default()
        }
    }

    fn is_placeholder(&self) -> bool {
        !self.prefix
            && (self.key.ends_with('/')
                || self.content_type.as_deref() == Some(DIRECTORY_CONTENT_TYPE))
    }
}

/// Key prefix under which the children of `directory` are stored
pub fn object_prefix(directory: &Entry) -> String {
    let key = directory.key();
    if key.is_empty() { key } else { format!("{key}/") }
}

/// Fold delimiter listing records into the children of `directory`
///
/// The placeholder marking `directory` itself is hidden, and a placeholder
/// object is merged with the common prefix of the same name so that a
/// directory with real descendants appears once.
pub fn normalize_objects<I>(directory: &Entry, records: I) -> AttributedList
where
    I: IntoIterator<Item = ObjectRecord>,
{
    let prefix = object_prefix(directory);
    let region = directory.attributes().region.clone();
    let mut children: Vec<Entry> = Vec::new();
    let mut directories: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(relative) = record.key.strip_prefix(prefix.as_str()) else {
            tracing::debug!(key = %record.key, prefix = %prefix, "Skip key outside of listed prefix");
            continue;
        };
        let name = relative.trim_end_matches('/');
        if name.is_empty() {
            continue;
        }

        let kind = if record.prefix {
            EntryType::Directory
        } else if record.is_placeholder() {
            EntryType::Placeholder
        } else {
            EntryType::File
        };

        if kind.is_directory() {
            if let Some(&index) = directories.get(name) {
                if kind == EntryType::Placeholder {
                    let existing = &children[index];
                    let mut merged = Entry::placeholder(existing.path().clone());
                    merged.set_attributes(attributes_of(&record, region.clone()));
                    children[index] = merged;
                }
                continue;
            }
            directories.insert(name.to_string(), children.len());
        }

        let entry = Entry::new(directory.path().child(name), kind)
            .with_attributes(attributes_of(&record, region.clone()));
        children.push(entry);
    }

    children.into_iter().collect()
}

fn attributes_of(record: &ObjectRecord, region: Option<String>) -> Attributes {
    Attributes {
        size: Some(record.size),
        modified: record.modified,
        etag: record.etag.clone(),
        storage_class: record.storage_class.clone(),
        content_type: record.content_type.clone(),
        region,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &AttributedList) -> Vec<(String, EntryType)> {
        list.iter()
            .map(|e| (e.name().to_string(), e.kind()))
            .collect()
    }

    #[test]
    fn test_hides_own_placeholder() {
        let dir = Entry::placeholder(EntryPath::parse("/bucket/photos"));
        let list = normalize_objects(
            &dir,
            vec![
                ObjectRecord::object("photos/", 0),
                ObjectRecord::object("photos/a.jpg", 10),
            ],
        );
        assert_eq!(names(&list), vec![("a.jpg".to_string(), EntryType::File)]);
        assert_eq!(list.find("a.jpg").unwrap().path().to_string(), "/bucket/photos/a.jpg");
    }

    #[test]
    fn test_merges_placeholder_with_prefix() {
        let bucket = Entry::volume("bucket");
        let list = normalize_objects(
            &bucket,
            vec![
                ObjectRecord::prefix("docs/"),
                ObjectRecord::object("docs/", 0),
                ObjectRecord::prefix("empty/"),
                ObjectRecord::object("readme.txt", 5),
            ],
        );
        assert_eq!(
            names(&list),
            vec![
                ("docs".to_string(), EntryType::Placeholder),
                ("empty".to_string(), EntryType::Directory),
                ("readme.txt".to_string(), EntryType::File),
            ]
        );
        assert_eq!(list.find("docs").unwrap().size(), None);
        assert_eq!(list.find("readme.txt").unwrap().size(), Some(5));
    }

    #[test]
    fn test_swift_directory_content_type() {
        let mut container = Entry::volume("c");
        container.set_region("DFW");
        let marker = ObjectRecord {
            content_type: Some(DIRECTORY_CONTENT_TYPE.to_string()),
            ..ObjectRecord::object("dir", 0)
        };
        let list = normalize_objects(&container, vec![ObjectRecord::prefix("dir/"), marker]);
        assert_eq!(names(&list), vec![("dir".to_string(), EntryType::Placeholder)]);
        assert_eq!(list.find("dir").unwrap().attributes().region.as_deref(), Some("DFW"));
    }

    #[test]
    fn test_file_and_directory_with_same_name() {
        let bucket = Entry::volume("bucket");
        let list = normalize_objects(
            &bucket,
            vec![ObjectRecord::object("a", 1), ObjectRecord::prefix("a/")],
        );
        assert_eq!(list.len(), 2);
    }
}
