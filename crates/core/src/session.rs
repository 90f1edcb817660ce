//! Authenticated session wrapper shared by the capabilities of one protocol

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// An already authenticated client handle bound to one host
///
/// The handle is not safe for concurrent use, so every backend call goes
/// through [`Session::lock`]. Cloning shares the same handle.
pub struct Session<H> {
    host: String,
    account: String,
    handle: Arc<Mutex<H>>,
}

impl<H> Session<H> {
    pub fn new(host: impl Into<String>, account: impl Into<String>, handle: H) -> Self {
        Self {
            host: host.into(),
            account: account.into(),
            handle: Arc::new(Mutex::new(handle)),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Account identifier used to key shared caches
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Exclusive access to the client handle for one backend call
    pub async fn lock(&self) -> MutexGuard<'_, H> {
        self.handle.lock().await
    }
}

impl<H> Clone for Session<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            account: self.account.clone(),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
