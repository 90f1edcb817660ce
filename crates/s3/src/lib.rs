//! rft-s3: S3 adapter for rft
//!
//! Implements [`rft_core::protocol::s3::S3Handle`] over aws-sdk-s3. The
//! capabilities built on top of it live in rft-core.

mod client;

pub use client::{S3Client, S3Options};
