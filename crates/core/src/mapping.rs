//! Mapping of backend wire faults into the [`Error`] taxonomy
//!
//! Client handles report failures as [`WireError`], a raw description of what
//! the backend said (HTTP status, FTP reply code, SFTP status code, ...).
//! Capability implementations translate them with [`map`] or [`map_for`],
//! the latter attaching the entry the failure concerns.

use std::fmt;

use crate::entry::Entry;
use crate::error::Error;

/// Raw fault classification as reported by a client handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFault {
    /// HTTP based protocols (S3, Swift, WebDAV)
    Http { status: u16, code: Option<String> },
    /// FTP reply code (RFC 959)
    FtpReply(u16),
    /// SFTP status code (draft-ietf-secsh-filexfer-02)
    SftpStatus(u32),
    /// Local socket or filesystem error
    Io(std::io::ErrorKind),
    /// Request never reached the server or the connection dropped
    Transport,
}

/// Result of a client handle call
pub type WireResult<T> = std::result::Result<T, WireError>;

/// Raw backend error before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub fault: WireFault,
    pub message: String,
}

impl WireError {
    pub fn new(fault: WireFault, message: impl Into<String>) -> Self {
        Self {
            fault,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(WireFault::Http { status, code: None }, message)
    }

    pub fn http_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            WireFault::Http {
                status,
                code: Some(code.into()),
            },
            message,
        )
    }

    pub fn ftp(reply: u16, message: impl Into<String>) -> Self {
        Self::new(WireFault::FtpReply(reply), message)
    }

    pub fn sftp(status: u32, message: impl Into<String>) -> Self {
        Self::new(WireFault::SftpStatus(status), message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(WireFault::Transport, message)
    }

    /// Shortcut used by call sites that tolerate a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(map(self), Error::NotFound(_))
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fault {
            WireFault::Http {
                status,
                code: Some(code),
            } => write!(f, "{} ({status} {code})", self.message),
            WireFault::Http { status, code: None } => write!(f, "{} ({status})", self.message),
            WireFault::FtpReply(reply) => write!(f, "{reply} {}", self.message),
            WireFault::SftpStatus(status) => write!(f, "{} (status {status})", self.message),
            WireFault::Io(kind) => write!(f, "{} ({kind})", self.message),
            WireFault::Transport => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WireError {}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::new(WireFault::Io(err.kind()), err.to_string())
    }
}

// SFTP status codes
const SSH_FX_NO_SUCH_FILE: u32 = 2;
const SSH_FX_PERMISSION_DENIED: u32 = 3;
const SSH_FX_NO_CONNECTION: u32 = 6;
const SSH_FX_CONNECTION_LOST: u32 = 7;
const SSH_FX_OP_UNSUPPORTED: u32 = 8;
const SSH_FX_FILE_ALREADY_EXISTS: u32 = 11;
const SSH_FX_NO_SUCH_PATH: u32 = 10;
const SSH_FX_DIR_NOT_EMPTY: u32 = 18;

/// Classify a wire fault
pub fn map(err: &WireError) -> Error {
    let message = err.message.clone();
    match &err.fault {
        WireFault::Http { status, code } => match status {
            404 | 410 => Error::NotFound(message),
            401 | 403 => Error::AccessDenied(message),
            409 | 412 => Error::Conflict(message),
            405 | 501 => Error::Unsupported(message),
            408 | 429 | 500 | 502 | 503 | 504 => Error::Network(message),
            _ => match code.as_deref() {
                Some("NoSuchKey" | "NoSuchBucket" | "NoSuchUpload") => Error::NotFound(message),
                Some("AccessDenied") => Error::AccessDenied(message),
                _ => Error::Protocol {
                    message,
                    status: Some(u32::from(*status)),
                },
            },
        },
        WireFault::FtpReply(reply) => match reply {
            550 | 450 => Error::NotFound(message),
            530 | 532 => Error::AccessDenied(message),
            502 | 504 => Error::Unsupported(message),
            421 | 425 | 426 => Error::Network(message),
            _ => Error::Protocol {
                message,
                status: Some(u32::from(*reply)),
            },
        },
        WireFault::SftpStatus(status) => match *status {
            SSH_FX_NO_SUCH_FILE | SSH_FX_NO_SUCH_PATH => Error::NotFound(message),
            SSH_FX_PERMISSION_DENIED => Error::AccessDenied(message),
            SSH_FX_NO_CONNECTION | SSH_FX_CONNECTION_LOST => Error::Network(message),
            SSH_FX_OP_UNSUPPORTED => Error::Unsupported(message),
            SSH_FX_FILE_ALREADY_EXISTS | SSH_FX_DIR_NOT_EMPTY => Error::Conflict(message),
            _ => Error::Protocol {
                message,
                status: Some(*status),
            },
        },
        WireFault::Io(kind) => match kind {
            std::io::ErrorKind::NotFound => Error::NotFound(message),
            std::io::ErrorKind::PermissionDenied => Error::AccessDenied(message),
            _ => Error::Network(message),
        },
        WireFault::Transport => Error::Network(message),
    }
}

/// Classify a wire fault and attach the entry it concerns
pub fn map_for(action: &str, err: &WireError, entry: &Entry) -> Error {
    map(err).for_entry(action, entry.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_http() {
        assert!(matches!(map(&WireError::http(404, "gone")), Error::NotFound(_)));
        assert!(matches!(map(&WireError::http(403, "no")), Error::AccessDenied(_)));
        assert!(matches!(map(&WireError::http(409, "busy")), Error::Conflict(_)));
        assert!(matches!(map(&WireError::http(503, "slow")), Error::Network(_)));
        assert!(matches!(
            map(&WireError::http(418, "teapot")),
            Error::Protocol {
                status: Some(418),
                ..
            }
        ));
    }

    #[test]
    fn test_map_http_error_code() {
        let err = WireError::http_code(400, "NoSuchBucket", "bucket missing");
        assert!(matches!(map(&err), Error::NotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_map_ftp_reply() {
        assert!(matches!(map(&WireError::ftp(550, "No such file")), Error::NotFound(_)));
        assert!(matches!(map(&WireError::ftp(530, "Not logged in")), Error::AccessDenied(_)));
        assert!(matches!(map(&WireError::ftp(421, "Timeout")), Error::Network(_)));
        assert!(matches!(
            map(&WireError::ftp(553, "Bad name")),
            Error::Protocol { .. }
        ));
    }

    #[test]
    fn test_map_sftp_status() {
        assert!(matches!(map(&WireError::sftp(2, "no such file")), Error::NotFound(_)));
        assert!(matches!(map(&WireError::sftp(3, "denied")), Error::AccessDenied(_)));
        assert!(matches!(map(&WireError::sftp(4, "failure")), Error::Protocol { .. }));
    }

    #[test]
    fn test_map_for_attaches_path() {
        let entry = Entry::file(crate::entry::EntryPath::parse("/c/k"));
        let err = map_for("Cannot delete", &WireError::http(500, "boom"), &entry);
        assert_eq!(err.path(), Some("/c/k"));
        assert!(matches!(err.root(), Error::Network(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(WireError::ftp(550, "No such file").to_string(), "550 No such file");
        assert_eq!(
            WireError::http_code(404, "NoSuchKey", "missing").to_string(),
            "missing (404 NoSuchKey)"
        );
    }
}
