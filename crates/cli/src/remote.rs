//! Remote path arguments
//!
//! Remote paths are written `host:/path`, where `host` names a profile of
//! the configuration. A trailing slash marks a directory.

use std::fmt;

use rft_core::{Entry, EntryPath};

/// Parsed `host:/path` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArg {
    pub host: String,
    pub path: EntryPath,
    pub directory: bool,
}

impl RemoteArg {
    pub fn parse(arg: &str) -> Result<Self, String> {
        let (host, path) = arg
            .split_once(':')
            .ok_or_else(|| format!("Expected host:/path, got '{arg}'"))?;
        if host.is_empty() {
            return Err(format!("Missing host in '{arg}'"));
        }
        if !path.starts_with('/') {
            return Err(format!("Remote path must be absolute: '{arg}'"));
        }
        let entry_path = EntryPath::parse(path);
        Ok(Self {
            host: host.to_string(),
            directory: entry_path.is_root() || path.ends_with('/'),
            path: entry_path,
        })
    }

    /// Entry addressed by the argument; top-level directories are volumes
    pub fn entry(&self) -> Entry {
        if !self.directory {
            Entry::file(self.path.clone())
        } else if self.path.depth() == 1 {
            Entry::volume(self.path.name())
        } else {
            Entry::directory(self.path.clone())
        }
    }

    /// Same argument treated as a directory
    pub fn as_directory(&self) -> Self {
        Self {
            directory: true,
            ..self.clone()
        }
    }
}

impl fmt::Display for RemoteArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file() {
        let arg = RemoteArg::parse("aws:/bucket/dir/a.txt").unwrap();
        assert_eq!(arg.host, "aws");
        assert!(!arg.directory);
        let entry = arg.entry();
        assert!(entry.is_file());
        assert_eq!(entry.container_name(), Some("bucket"));
        assert_eq!(entry.key(), "dir/a.txt");
    }

    #[test]
    fn test_parse_directories() {
        let dir = RemoteArg::parse("dav:/photos/2024/").unwrap();
        assert!(dir.directory);
        assert!(dir.entry().is_directory());

        let bucket = RemoteArg::parse("aws:/bucket/").unwrap();
        assert!(bucket.entry().is_container());

        let root = RemoteArg::parse("aws:/").unwrap();
        assert!(root.directory);
        assert!(root.path.is_root());
    }

    #[test]
    fn test_parse_errors() {
        assert!(RemoteArg::parse("no-host").is_err());
        assert!(RemoteArg::parse(":/bucket").is_err());
        assert!(RemoteArg::parse("aws:bucket/key").is_err());
    }
}
