//! Error types
//!
//! Filesystem failures never show up here as Rust errors inside the bridge:
//! they travel as negative result codes. [`BridgeError`] covers misuse of the
//! bridge itself, and [`FsError`] is a convenience for callers that want to
//! turn a negative result code into a named error.

use crate::slot::OpKind;
use nix::errno::Errno;
use thiserror::Error;

/// Bridge-level failures, reported synchronously by submit calls
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The slot was never bound to a context
    #[error("request slot is not bound to a context")]
    SlotUnbound,

    /// The slot already carries an operation that has not completed
    #[error("request slot {id} already has a {kind} operation in flight")]
    SlotBusy {
        /// Correlation id currently stamped on the slot
        id: u32,
        /// Operation still in flight
        kind: OpKind,
    },

    /// The context was destroyed
    #[error("context has been destroyed")]
    ContextDestroyed,

    /// A host buffer is borrowed by the caller or already lent to an operation
    #[error("host buffer is borrowed or already in flight")]
    BufferBorrowed,

    /// Unrecognised open flag string
    #[error("invalid open flags: {0:?}")]
    InvalidFlags(String),

    /// Mode string that is not an octal number
    #[error("invalid mode: {0:?}")]
    InvalidMode(String),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// A negative result code with its errno name and description
///
/// Displays as `CODE: message`, e.g. `ENOENT: No such file or directory`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{}: {message}", self.code())]
pub struct FsError {
    /// Negative result code as reported, kept even when nix has no name for it
    result: i32,
    errno: Errno,
    message: &'static str,
}

impl FsError {
    /// Name a negative result code; `None` for success codes
    #[must_use]
    pub fn from_result(result: i32) -> Option<Self> {
        if result >= 0 {
            return None;
        }
        let errno = Errno::from_raw(result.saturating_neg());
        Some(Self {
            result,
            errno,
            message: errno.desc(),
        })
    }

    /// Pass a success code through, or name the failure
    ///
    /// # Errors
    ///
    /// Returns the named error when `result` is negative.
    pub fn check(result: i32) -> std::result::Result<i32, Self> {
        Self::from_result(result).map_or(Ok(result), Err)
    }

    /// Positive errno value
    #[must_use]
    pub fn errno(&self) -> i32 {
        self.result.saturating_neg()
    }

    /// The negative result code this error came from
    #[must_use]
    pub fn result_code(&self) -> i32 {
        self.result
    }

    /// Symbolic name such as `ENOENT`, or `E<n>` for a code nix cannot name
    #[must_use]
    pub fn code(&self) -> String {
        match self.errno {
            Errno::UnknownErrno => format!("E{}", self.errno()),
            errno => format!("{errno:?}"),
        }
    }

    /// Human-readable description
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes_are_not_errors() {
        assert_eq!(FsError::from_result(0), None);
        assert_eq!(FsError::check(42), Ok(42));
    }

    #[test]
    fn test_enoent_is_named() {
        let err = FsError::from_result(-libc::ENOENT).unwrap();
        assert_eq!(err.code(), "ENOENT");
        assert_eq!(err.errno(), libc::ENOENT);
        assert_eq!(err.result_code(), -libc::ENOENT);
        assert!(err.to_string().starts_with("ENOENT: "));
    }

    #[test]
    fn test_slot_busy_message() {
        let err = BridgeError::SlotBusy {
            id: 3,
            kind: OpKind::Readdir,
        };
        assert_eq!(
            err.to_string(),
            "request slot 3 already has a readdir operation in flight"
        );
    }

    #[test]
    fn test_unnamed_code_keeps_its_value() {
        let err = FsError::from_result(-4000).unwrap();
        assert_eq!(err.result_code(), -4000);
        assert_eq!(err.errno(), 4000);
        assert_eq!(err.code(), "E4000");
        assert!(FsError::check(-4000).is_err());
        assert!(err.to_string().starts_with("E4000: "));
    }
}
