//! Process exit codes
//!
//! Scripts can rely on these values staying stable across releases.

use rft_core::Error;

/// Exit code of the `rft` process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Unclassified failure
    GeneralError = 1,
    /// Invalid arguments or configuration
    UsageError = 2,
    /// Transport failure or transient server error
    NetworkError = 3,
    /// Authentication or authorization failure
    AuthError = 4,
    NotFound = 5,
    /// Remote state prevents the operation
    Conflict = 6,
    /// The protocol of the host cannot perform the operation
    UnsupportedFeature = 7,
    /// Canceled by the user
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            4 => Some(Self::AuthError),
            5 => Some(Self::NotFound),
            6 => Some(Self::Conflict),
            7 => Some(Self::UnsupportedFeature),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code matching the classification of a failed operation
    pub fn from_error(error: &Error) -> Self {
        match error.root() {
            Error::NotFound(_) => Self::NotFound,
            Error::AccessDenied(_) | Error::LoginCanceled => Self::AuthError,
            Error::Network(_) => Self::NetworkError,
            Error::Conflict(_) => Self::Conflict,
            Error::Unsupported(_) => Self::UnsupportedFeature,
            Error::Canceled => Self::Interrupted,
            Error::Config(_) => Self::UsageError,
            _ => Self::GeneralError,
        }
    }
}
