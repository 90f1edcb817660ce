//! Callback contracts consumed by capabilities and the upload filter
//!
//! The core never talks to a user directly. Progress messages, credential
//! prompts and cancellation requests reach it through these traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Sink for human readable status messages; must not block
pub trait ProgressListener: Send + Sync {
    fn message(&self, message: &str);
}

/// Listener that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProgressListener;

impl ProgressListener for DisabledProgressListener {
    fn message(&self, _message: &str) {}
}

/// Username and secret returned by a login prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

/// Interactive credential prompt used by nested auxiliary sessions
#[async_trait]
pub trait LoginCallback: Send + Sync {
    /// Ask for credentials for `host`; returns `Error::LoginCanceled` when dismissed
    async fn prompt(&self, host: &str, reason: &str) -> Result<Credentials>;
}

/// Login callback that never prompts
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLoginCallback;

#[async_trait]
impl LoginCallback for DisabledLoginCallback {
    async fn prompt(&self, host: &str, reason: &str) -> Result<Credentials> {
        tracing::debug!(host, reason, "Login prompt disabled");
        Err(Error::LoginCanceled)
    }
}

/// Cooperative cancellation signal checked between entries
pub trait CancelCallback: Send + Sync {
    fn is_canceled(&self) -> bool;

    /// Convenience for loops: `cancel.verify()?`
    fn verify(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}

/// Cancellation that never fires
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCancelCallback;

impl CancelCallback for DisabledCancelCallback {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag, cloned into workers and set from anywhere
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl CancelCallback for CancelFlag {
    fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let worker = flag.clone();
        assert!(worker.verify().is_ok());
        flag.cancel();
        assert!(worker.is_canceled());
        assert!(matches!(worker.verify(), Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn test_disabled_login_callback() {
        let result = DisabledLoginCallback.prompt("example.net", "segments").await;
        assert!(matches!(result, Err(Error::LoginCanceled)));
    }
}
