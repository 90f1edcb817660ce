//! Remote entry model
//!
//! An [`Entry`] is a normalized view of a remote file, directory, container
//! or placeholder, independent of the protocol it was read from. Object
//! stores map the first path segment to the container (bucket) and the rest
//! to the object key.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path delimiter used for rendering and for object keys
pub const DELIMITER: char = '/';

/// Absolute remote path as a sequence of name segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath {
    segments: Vec<String>,
}

impl EntryPath {
    /// The root path `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-delimited path, ignoring empty segments
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split(DELIMITER)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, or an empty string for the root
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<EntryPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a name; names containing the delimiter add several segments
    pub fn child(&self, name: &str) -> EntryPath {
        let mut segments = self.segments.clone();
        segments.extend(
            name.split(DELIMITER)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    /// Copy of this path with the last segment replaced
    pub fn with_name(&self, name: &str) -> EntryPath {
        match self.parent() {
            Some(parent) => parent.child(name),
            None => EntryPath::parse(name),
        }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn starts_with(&self, other: &EntryPath) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{DELIMITER}");
        }
        for segment in &self.segments {
            write!(f, "{DELIMITER}{segment}")?;
        }
        Ok(())
    }
}

/// Type tag of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
    /// Top-level container (bucket, Swift container)
    Volume,
    /// Zero-byte marker object standing in for a directory in object storage
    Placeholder,
    Symlink,
}

impl EntryType {
    pub fn is_directory(self) -> bool {
        matches!(
            self,
            EntryType::Directory | EntryType::Volume | EntryType::Placeholder
        )
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryType::File => "file",
            EntryType::Directory => "dir",
            EntryType::Volume => "volume",
            EntryType::Placeholder => "placeholder",
            EntryType::Symlink => "symlink",
        };
        f.write_str(name)
    }
}

/// Permission bits for one class (user, group or other)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Action(u8);

impl Action {
    pub const NONE: Action = Action(0);
    pub const EXECUTE: Action = Action(0o1);
    pub const WRITE: Action = Action(0o2);
    pub const READ: Action = Action(0o4);
    pub const ALL: Action = Action(0o7);

    pub fn from_bits(bits: u8) -> Self {
        Action(bits & 0o7)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is set
    pub fn implies(self, other: Action) -> bool {
        self.0 & other.0 == other.0
    }

    fn symbolic(self) -> [char; 3] {
        [
            if self.implies(Action::READ) { 'r' } else { '-' },
            if self.implies(Action::WRITE) { 'w' } else { '-' },
            if self.implies(Action::EXECUTE) { 'x' } else { '-' },
        ]
    }
}

/// POSIX style rwx permission triads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Permission {
    pub user: Action,
    pub group: Action,
    pub other: Action,
}

impl Permission {
    pub const EMPTY: Permission = Permission {
        user: Action::NONE,
        group: Action::NONE,
        other: Action::NONE,
    };

    /// Build from a numeric mode; only the low nine bits are kept
    pub fn from_mode(mode: u32) -> Self {
        Self {
            user: Action::from_bits(((mode >> 6) & 0o7) as u8),
            group: Action::from_bits(((mode >> 3) & 0o7) as u8),
            other: Action::from_bits((mode & 0o7) as u8),
        }
    }

    /// Parse an octal string such as `644` or `0755`
    pub fn from_octal(value: &str) -> Result<Self> {
        let value = value.trim();
        let mode = u32::from_str_radix(value, 8).map_err(|e| Error::Parse {
            line: value.to_string(),
            reason: format!("invalid octal mode: {e}"),
        })?;
        Ok(Self::from_mode(mode))
    }

    pub fn mode(&self) -> u32 {
        (u32::from(self.user.bits()) << 6)
            | (u32::from(self.group.bits()) << 3)
            | u32::from(self.other.bits())
    }

    /// Octal rendering without leading zero, e.g. `644`
    pub fn octal(&self) -> String {
        format!("{:o}", self.mode())
    }

    pub fn is_empty(&self) -> bool {
        *self == Permission::EMPTY
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars: String = [self.user, self.group, self.other]
            .iter()
            .flat_map(|a| a.symbolic())
            .collect();
        f.write_str(&chars)
    }
}

/// Grantee of an ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Principal {
    /// Anyone, including anonymous users
    Everyone,
    /// Any authenticated user of the service
    Authenticated,
    /// Account identified by canonical id
    Canonical(String),
    /// Account identified by email address
    Email(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Everyone => f.write_str("everyone"),
            Principal::Authenticated => f.write_str("authenticated"),
            Principal::Canonical(id) => write!(f, "id:{id}"),
            Principal::Email(email) => write!(f, "email:{email}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Read,
    Write,
    FullControl,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Read => f.write_str("READ"),
            Role::Write => f.write_str("WRITE"),
            Role::FullControl => f.write_str("FULL_CONTROL"),
        }
    }
}

/// Ordered set of (principal, role) grants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    grants: Vec<(Principal, Role)>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grant; duplicates are ignored and insertion order is kept
    pub fn add(&mut self, principal: Principal, role: Role) {
        if !self.contains(&principal, role) {
            self.grants.push((principal, role));
        }
    }

    pub fn contains(&self, principal: &Principal, role: Role) -> bool {
        self.grants.iter().any(|(p, r)| p == principal && *r == role)
    }

    pub fn grants(&self) -> &[(Principal, Role)] {
        &self.grants
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Derive grants from POSIX permission bits
    ///
    /// other-read maps to everyone:read, group-read to authenticated:read and
    /// group-write to authenticated:write. Owner bits are not represented.
    pub fn from_permission(permission: &Permission) -> Self {
        let mut acl = Acl::new();
        if permission.other.implies(Action::READ) {
            acl.add(Principal::Everyone, Role::Read);
        }
        if permission.group.implies(Action::READ) {
            acl.add(Principal::Authenticated, Role::Read);
        }
        if permission.group.implies(Action::WRITE) {
            acl.add(Principal::Authenticated, Role::Write);
        }
        acl
    }
}

/// Mutable attribute bag of a remote entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Size in bytes; never set for directories
    pub size: Option<u64>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permission: Option<Permission>,
    pub created: Option<Timestamp>,
    pub modified: Option<Timestamp>,
    /// Backend specific locality tag (bucket region, Swift region name)
    pub region: Option<String>,
    pub acl: Acl,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
    pub content_type: Option<String>,
}

/// Normalized remote file, directory or container
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    path: EntryPath,
    kind: EntryType,
    attributes: Attributes,
}

impl Entry {
    pub fn new(path: EntryPath, kind: EntryType) -> Self {
        Self {
            path,
            kind,
            attributes: Attributes::default(),
        }
    }

    pub fn file(path: EntryPath) -> Self {
        Self::new(path, EntryType::File)
    }

    pub fn directory(path: EntryPath) -> Self {
        Self::new(path, EntryType::Directory)
    }

    pub fn placeholder(path: EntryPath) -> Self {
        Self::new(path, EntryType::Placeholder)
    }

    pub fn symlink(path: EntryPath) -> Self {
        Self::new(path, EntryType::Symlink)
    }

    /// Top-level container with the given name
    pub fn volume(name: &str) -> Self {
        Self::new(EntryPath::from_segments([name]), EntryType::Volume)
    }

    pub fn path(&self) -> &EntryPath {
        &self.path
    }

    pub fn kind(&self) -> EntryType {
        self.kind
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Replace the attributes, dropping a size on directory entries
    pub fn set_attributes(&mut self, mut attributes: Attributes) {
        if self.is_directory() {
            attributes.size = None;
        }
        self.attributes = attributes;
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.set_attributes(attributes);
        self
    }

    pub fn size(&self) -> Option<u64> {
        self.attributes.size
    }

    /// Set the size; ignored for directory entries
    pub fn set_size(&mut self, size: u64) {
        if !self.is_directory() {
            self.attributes.size = Some(size);
        }
    }

    pub fn set_region(&mut self, region: impl Into<String>) {
        self.attributes.region = Some(region.into());
    }

    pub fn set_modified(&mut self, modified: Option<Timestamp>) {
        self.attributes.modified = modified;
    }

    pub fn set_permission(&mut self, permission: Option<Permission>) {
        self.attributes.permission = permission;
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryType::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryType::Symlink
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    pub fn is_volume(&self) -> bool {
        self.kind == EntryType::Volume
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == EntryType::Placeholder
    }

    /// Parent directory; top-level parents are returned as volumes
    pub fn parent(&self) -> Option<Entry> {
        let parent = self.path.parent()?;
        let kind = if parent.depth() == 1 {
            EntryType::Volume
        } else {
            EntryType::Directory
        };
        Some(Entry::new(parent, kind))
    }

    pub fn child(&self, name: &str, kind: EntryType) -> Entry {
        Entry::new(self.path.child(name), kind)
    }

    /// Copy of this entry under a different name in the same directory
    pub fn renamed(&self, name: &str) -> Entry {
        Entry {
            path: self.path.with_name(name),
            kind: self.kind,
            attributes: self.attributes.clone(),
        }
    }

    // Object store view: first segment is the container, the rest the key.

    /// Name of the container holding this entry
    pub fn container_name(&self) -> Option<&str> {
        self.path.segments().first().map(String::as_str)
    }

    /// Container holding this entry, carrying the region hint if known
    pub fn container(&self) -> Option<Entry> {
        let name = self.container_name()?;
        let mut container = Entry::volume(name);
        if let Some(region) = &self.attributes.region {
            container.set_region(region.clone());
        }
        Some(container)
    }

    /// True for a top-level directory
    pub fn is_container(&self) -> bool {
        self.is_directory() && self.path.depth() == 1
    }

    /// Object key relative to the container, `/`-joined
    pub fn key(&self) -> String {
        self.path
            .segments()
            .iter()
            .skip(1)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}
