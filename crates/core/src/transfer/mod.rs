//! Upload transfer pipeline
//!
//! The byte transfer itself happens outside of this crate. This module covers
//! the steps around it: deciding which local files take part, sizing and
//! staging them, and reconciling remote metadata afterwards.

pub mod local;
pub mod symlink;
pub mod unit;
pub mod upload;

pub use local::{LocalAttributes, LocalFile, LocalKind};
pub use symlink::{SymlinkMode, SymlinkPolicy, WithinRoot};
pub use unit::TransferUnit;
pub use upload::UploadFilter;
