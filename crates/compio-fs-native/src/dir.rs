//! Directory streams over `opendir(3)`/`readdir(3)`/`closedir(3)`
//!
//! There is no io_uring opcode for directory iteration, so these calls always
//! run on the blocking pool when used asynchronously. A [`NativeDir`] is
//! `Send` so it can travel to that pool and back.

use crate::path::NativePath;
use nix::errno::Errno;
use std::ffi::CStr;
use std::ptr::NonNull;

/// Directory entry type codes
///
/// Values are the stable dirent type table shared with callers
/// (unknown, file, dir, link, fifo, socket, char, block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DirentKind {
    /// Type not reported by the filesystem
    Unknown = 0,
    /// Regular file
    File = 1,
    /// Directory
    Dir = 2,
    /// Symbolic link
    Link = 3,
    /// Named pipe
    Fifo = 4,
    /// Unix domain socket
    Socket = 5,
    /// Character device
    Char = 6,
    /// Block device
    Block = 7,
}

impl DirentKind {
    /// Map a `d_type` value from `readdir(3)`
    #[must_use]
    pub fn from_d_type(d_type: u8) -> Self {
        match d_type {
            libc::DT_REG => Self::File,
            libc::DT_DIR => Self::Dir,
            libc::DT_LNK => Self::Link,
            libc::DT_FIFO => Self::Fifo,
            libc::DT_SOCK => Self::Socket,
            libc::DT_CHR => Self::Char,
            libc::DT_BLK => Self::Block,
            _ => Self::Unknown,
        }
    }

    /// Numeric code as stored in an encoded entry
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Inverse of [`DirentKind::code`]
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            1 => Self::File,
            2 => Self::Dir,
            3 => Self::Link,
            4 => Self::Fifo,
            5 => Self::Socket,
            6 => Self::Char,
            7 => Self::Block,
            _ => return None,
        })
    }
}

/// One entry as returned by the native stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirent {
    /// Entry name without terminator
    pub name: Vec<u8>,
    /// Entry type
    pub kind: DirentKind,
}

/// Open native directory stream
///
/// Closed with [`NativeDir::close`] to observe the result code; dropping an
/// open stream closes it silently.
#[derive(Debug)]
pub struct NativeDir {
    ptr: NonNull<libc::DIR>,
}

// SAFETY: a DIR stream is not tied to the thread that opened it; the owner
// moves it between the runtime thread and the blocking pool but never shares it.
unsafe impl Send for NativeDir {}

impl NativeDir {
    /// Open a directory stream
    ///
    /// # Errors
    ///
    /// Returns `-errno` from `opendir(3)`.
    pub fn open(path: &NativePath) -> Result<Self, i32> {
        // SAFETY: path is a valid NUL-terminated string.
        let ptr = unsafe { libc::opendir(path.as_ptr()) };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or_else(|| -Errno::last_raw())
    }

    /// Read up to `max` entries, skipping `.` and `..`
    ///
    /// An empty vector means the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns `-errno` if `readdir(3)` fails; entries read before the
    /// failure are discarded.
    pub fn read_entries(&mut self, max: usize) -> Result<Vec<RawDirent>, i32> {
        let mut entries = Vec::new();

        while entries.len() < max {
            Errno::clear();
            // SAFETY: ptr is an open stream exclusively owned by self.
            let ent = unsafe { libc::readdir(self.ptr.as_ptr()) };
            if ent.is_null() {
                match Errno::last_raw() {
                    0 => break,
                    errno => return Err(-errno),
                }
            }

            // SAFETY: readdir returned a valid dirent that lives until the
            // next readdir call on this stream; the name is copied out first.
            let (name, d_type) = unsafe {
                let ent = &*ent;
                (CStr::from_ptr(ent.d_name.as_ptr()).to_bytes(), ent.d_type)
            };
            if name == b"." || name == b".." {
                continue;
            }

            entries.push(RawDirent {
                name: name.to_vec(),
                kind: DirentKind::from_d_type(d_type),
            });
        }

        Ok(entries)
    }

    /// Close the stream and return the result code of `closedir(3)`
    #[must_use]
    pub fn close(self) -> i32 {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: ptr is open and ManuallyDrop prevents a second close.
        let ret = unsafe { libc::closedir(this.ptr.as_ptr()) };
        if ret < 0 {
            -Errno::last_raw()
        } else {
            ret
        }
    }

    /// Address of the native stream, for callers that record raw handles
    #[must_use]
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl Drop for NativeDir {
    fn drop(&mut self) {
        // SAFETY: ptr is open; close() bypasses Drop.
        let ret = unsafe { libc::closedir(self.ptr.as_ptr()) };
        if ret < 0 {
            log::warn!("closedir on drop failed: {}", Errno::last());
        }
    }
}
