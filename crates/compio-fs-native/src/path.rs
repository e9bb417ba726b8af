//! Bounded, NUL-terminated paths handed to the kernel

use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Longest path accepted, in bytes, excluding the terminator
pub const PATH_MAX: usize = 4096;

/// A path converted once for submission
///
/// Owns its `CString` so the pointer given to the kernel stays valid for as
/// long as the operation that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePath(CString);

impl NativePath {
    /// Convert a path for submission
    ///
    /// # Errors
    ///
    /// Returns the result code the operation should complete with:
    /// - `-ENAMETOOLONG` if the path is longer than [`PATH_MAX`] bytes
    /// - `-EINVAL` if the path contains an interior NUL byte
    pub fn new(path: &Path) -> Result<Self, i32> {
        Self::from_bytes(path.as_os_str().as_bytes())
    }

    /// Convert raw path bytes for submission
    ///
    /// # Errors
    ///
    /// Same as [`NativePath::new`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, i32> {
        if bytes.len() > PATH_MAX {
            return Err(-libc::ENAMETOOLONG);
        }
        CString::new(bytes).map(Self).map_err(|_| -libc::EINVAL)
    }

    /// Raw pointer for syscalls and submission entries
    #[must_use]
    pub fn as_ptr(&self) -> *const libc::c_char {
        self.0.as_ptr()
    }

    /// Borrow as a C string
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        self.0.as_c_str()
    }

    /// Path bytes without the terminator
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
