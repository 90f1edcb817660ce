//! rft-core: Core library for the rft remote file client
//!
//! This crate provides the protocol-independent part of rft:
//! - Remote entry model (paths, types, attributes, permissions, ACLs)
//! - Error taxonomy and mapping of wire faults into it
//! - Capability traits (Delete, Copy, Move, Find, ...) and the per-session
//!   capability table
//! - Per-protocol capability implementations over client-handle traits
//! - Directory listing parsers
//! - Region resolution and temporary URL signing
//! - Upload transfer filter pipeline
//!
//! Wire clients live in separate crates (`rft-s3`, `rft-http`) and plug in
//! through the handle traits in [`protocol`].

pub mod callback;
pub mod config;
pub mod entry;
pub mod error;
pub mod features;
pub mod listing;
pub mod mapping;
pub mod protocol;
pub mod region;
pub mod session;
pub mod transfer;

pub use callback::{
    CancelCallback, CancelFlag, Credentials, DisabledCancelCallback, DisabledLoginCallback,
    DisabledProgressListener, LoginCallback, ProgressListener,
};
pub use config::{Config, ConfigManager, HostProfile, Protocol, UploadOptions};
pub use entry::{
    Acl, Action, Attributes, Entry, EntryPath, EntryType, Permission, Principal, Role,
};
pub use error::{Completion, Degradation, Error, Result};
pub use features::{
    AclFeature, AttributesFeature, Capabilities, CopyFeature, DeleteFeature, FindFeature,
    ListFeature, MoveFeature, SegmentFeature, SignedUrl, TimestampFeature, Timestamps,
    UnixPermissionFeature, UrlFeature,
};
pub use listing::{AttributedList, ListingReply, MlsdReader, ObjectRecord};
pub use mapping::{WireError, WireFault, WireResult};
pub use protocol::{ObjectMetadata, ObjectPage};
pub use region::{ContainerKey, Region, RegionCache, RegionLookup, RegionResolver};
pub use session::Session;
pub use transfer::{
    LocalAttributes, LocalFile, LocalKind, SymlinkMode, SymlinkPolicy, TransferUnit,
    UploadFilter, WithinRoot,
};
