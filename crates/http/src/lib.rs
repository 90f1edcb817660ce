//! rft-http: HTTP adapters for rft
//!
//! Swift and WebDAV clients over `reqwest`, implementing the
//! [`SwiftHandle`](rft_core::protocol::swift::SwiftHandle) and
//! [`DavHandle`](rft_core::protocol::dav::DavHandle) traits from rft-core.

mod dav;
mod response;
mod swift;

pub use dav::DavClient;
pub use swift::{SwiftAuth, SwiftClient};
