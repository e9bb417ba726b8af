//! statx targets and the native stat buffer
//!
//! `stat`, `lstat` and `fstat` are all expressed as one `statx(2)` call so
//! the io_uring submission and the blocking core fill the same structure:
//!
//! - **stat**: `AT_FDCWD` + path, follows symlinks
//! - **lstat**: `AT_FDCWD` + path, `AT_SYMLINK_NOFOLLOW`
//! - **fstat**: descriptor + empty path, `AT_EMPTY_PATH`

use crate::path::NativePath;

/// Fields requested from statx: `STATX_BASIC_STATS | STATX_BTIME`
pub const STATX_MASK: u32 = libc::STATX_BASIC_STATS | libc::STATX_BTIME;

/// What a stat call looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatTarget {
    /// Path, following a trailing symlink
    Path(NativePath),
    /// Path, describing a trailing symlink itself
    Link(NativePath),
    /// Open file descriptor
    Fd(i32),
}

impl StatTarget {
    /// Directory descriptor argument for statx
    #[must_use]
    pub fn dirfd(&self) -> i32 {
        match self {
            Self::Path(_) | Self::Link(_) => libc::AT_FDCWD,
            Self::Fd(fd) => *fd,
        }
    }

    /// Pathname argument for statx
    #[must_use]
    pub fn pathname(&self) -> *const libc::c_char {
        match self {
            Self::Path(path) | Self::Link(path) => path.as_ptr(),
            Self::Fd(_) => c"".as_ptr(),
        }
    }

    /// Flags argument for statx
    #[must_use]
    pub fn flags(&self) -> i32 {
        match self {
            Self::Path(_) => 0,
            Self::Link(_) => libc::AT_SYMLINK_NOFOLLOW,
            Self::Fd(_) => libc::AT_EMPTY_PATH,
        }
    }
}

/// Heap-allocated statx buffer
///
/// Boxed so the address handed to the kernel does not move while the
/// operation owning it is in flight.
pub struct NativeStat(Box<libc::statx>);

impl NativeStat {
    /// Zeroed buffer ready to be filled
    #[must_use]
    pub fn zeroed() -> Self {
        // SAFETY: statx is a plain C struct; all-zero is a valid value.
        Self(Box::new(unsafe { std::mem::zeroed() }))
    }

    /// Filled statx structure
    #[must_use]
    pub fn raw(&self) -> &libc::statx {
        &self.0
    }

    /// Mutable pointer for the kernel to write through
    pub fn as_mut_ptr(&mut self) -> *mut libc::statx {
        &mut *self.0
    }
}

impl std::fmt::Debug for NativeStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeStat")
            .field("mode", &self.0.stx_mode)
            .field("ino", &self.0.stx_ino)
            .field("size", &self.0.stx_size)
            .finish_non_exhaustive()
    }
}

/// Combine a major/minor pair into a `dev_t` the way glibc's `makedev` does
#[must_use]
pub const fn makedev(major: u32, minor: u32) -> u64 {
    let major = major as u64;
    let minor = minor as u64;
    ((major & 0xffff_f000) << 32)
        | ((major & 0x0000_0fff) << 8)
        | ((minor & 0xffff_ff00) << 12)
        | (minor & 0x0000_00ff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_makedev_small_numbers() {
        // 8:1 is the classic sda1
        assert_eq!(makedev(8, 1), 0x801);
    }

    #[test]
    fn test_makedev_large_minor() {
        assert_eq!(makedev(0, 0x100), 0x100 << 12);
    }

    #[test]
    fn test_fd_target_uses_empty_path() {
        let target = StatTarget::Fd(3);
        assert_eq!(target.dirfd(), 3);
        assert_eq!(target.flags(), libc::AT_EMPTY_PATH);
        // SAFETY: pathname of an Fd target is a static empty C string.
        let path = unsafe { std::ffi::CStr::from_ptr(target.pathname()) };
        assert!(path.to_bytes().is_empty());
    }
}
