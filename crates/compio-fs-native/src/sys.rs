//! Blocking syscall core
//!
//! Every function here performs one syscall on the calling thread and returns
//! the same result code an io_uring completion would carry: a non-negative
//! value on success and `-errno` on failure. Synchronous callers use these
//! directly; the async fallbacks in [`crate::submit`] run them on the
//! blocking pool.
//!
//! A file position below zero means "use and advance the current file
//! position" (`read`/`write` instead of `pread`/`pwrite`).

use crate::dir::{NativeDir, RawDirent};
use crate::path::{NativePath, PATH_MAX};
use crate::stat::{NativeStat, StatTarget, STATX_MASK};
use nix::errno::Errno;

/// Convert a `c_int` syscall return into a result code
fn cvt(ret: libc::c_int) -> i32 {
    if ret < 0 {
        -Errno::last_raw()
    } else {
        ret
    }
}

/// Convert a byte-count syscall return into a result code
fn cvt_len(ret: libc::ssize_t) -> i32 {
    if ret < 0 {
        -Errno::last_raw()
    } else {
        i32::try_from(ret).unwrap_or(i32::MAX)
    }
}

/// Validate a `(offset, len)` window into a buffer of `buf_len` bytes
///
/// # Errors
///
/// Returns `-EINVAL` if the window does not fit inside the buffer or is
/// longer than a single transfer can report.
pub fn check_window(buf_len: usize, offset: usize, len: usize) -> Result<u32, i32> {
    match offset.checked_add(len) {
        Some(end) if end <= buf_len => u32::try_from(len).map_err(|_| -libc::EINVAL),
        _ => Err(-libc::EINVAL),
    }
}

/// Build the iovec array for a vectored write
///
/// # Errors
///
/// Returns `-ENOMEM` if the descriptor array cannot be allocated; a partial
/// list is never produced.
pub fn iovecs<B: AsRef<[u8]>>(bufs: &[B]) -> Result<Vec<libc::iovec>, i32> {
    let mut iov = Vec::new();
    iov.try_reserve_exact(bufs.len())
        .map_err(|_| -libc::ENOMEM)?;
    iov.extend(bufs.iter().map(|buf| {
        let buf = buf.as_ref();
        libc::iovec {
            iov_base: buf.as_ptr().cast_mut().cast(),
            iov_len: buf.len(),
        }
    }));
    Ok(iov)
}

/// Build the iovec array for a vectored read
///
/// # Errors
///
/// Same as [`iovecs`].
pub fn iovecs_mut<B: AsMut<[u8]>>(bufs: &mut [B]) -> Result<Vec<libc::iovec>, i32> {
    let mut iov = Vec::new();
    iov.try_reserve_exact(bufs.len())
        .map_err(|_| -libc::ENOMEM)?;
    iov.extend(bufs.iter_mut().map(|buf| {
        let buf = buf.as_mut();
        libc::iovec {
            iov_base: buf.as_mut_ptr().cast(),
            iov_len: buf.len(),
        }
    }));
    Ok(iov)
}

/// Count argument for `readv`/`writev`
fn iov_count(iov: &[libc::iovec]) -> libc::c_int {
    libc::c_int::try_from(iov.len()).unwrap_or(libc::c_int::MAX)
}

/// `open(2)`; the descriptor is always close-on-exec
#[must_use]
pub fn open(path: &NativePath, flags: i32, mode: u32) -> i32 {
    // SAFETY: path is NUL-terminated and outlives the call.
    cvt(unsafe { libc::open(path.as_ptr(), flags | libc::O_CLOEXEC, mode) })
}

/// `close(2)`
#[must_use]
pub fn close(fd: i32) -> i32 {
    // SAFETY: closing an arbitrary descriptor is memory-safe.
    cvt(unsafe { libc::close(fd) })
}

/// `read(2)` or `pread(2)` into `buf[offset..offset + len]`
#[must_use]
pub fn read(fd: i32, buf: &mut [u8], offset: usize, len: usize, pos: i64) -> i32 {
    if let Err(code) = check_window(buf.len(), offset, len) {
        return code;
    }
    let window = &mut buf[offset..offset + len];
    let ptr = window.as_mut_ptr().cast();
    // SAFETY: window is a live mutable slice of exactly len bytes.
    let ret = unsafe {
        if pos < 0 {
            libc::read(fd, ptr, len)
        } else {
            libc::pread(fd, ptr, len, pos)
        }
    };
    cvt_len(ret)
}

/// `write(2)` or `pwrite(2)` from `buf[offset..offset + len]`
#[must_use]
pub fn write(fd: i32, buf: &[u8], offset: usize, len: usize, pos: i64) -> i32 {
    if let Err(code) = check_window(buf.len(), offset, len) {
        return code;
    }
    let window = &buf[offset..offset + len];
    let ptr = window.as_ptr().cast();
    // SAFETY: window is a live slice of exactly len bytes.
    let ret = unsafe {
        if pos < 0 {
            libc::write(fd, ptr, len)
        } else {
            libc::pwrite(fd, ptr, len, pos)
        }
    };
    cvt_len(ret)
}

/// `readv(2)` or `preadv(2)` filling `bufs` in order
#[must_use]
pub fn readv<B: AsMut<[u8]>>(fd: i32, bufs: &mut [B], pos: i64) -> i32 {
    let iov = match iovecs_mut(bufs) {
        Ok(iov) => iov,
        Err(code) => return code,
    };
    // SAFETY: every iovec points into a buffer mutably borrowed for the call.
    let ret = unsafe {
        if pos < 0 {
            libc::readv(fd, iov.as_ptr(), iov_count(&iov))
        } else {
            libc::preadv(fd, iov.as_ptr(), iov_count(&iov), pos)
        }
    };
    cvt_len(ret)
}

/// `writev(2)` or `pwritev(2)` draining `bufs` in order
#[must_use]
pub fn writev<B: AsRef<[u8]>>(fd: i32, bufs: &[B], pos: i64) -> i32 {
    let iov = match iovecs(bufs) {
        Ok(iov) => iov,
        Err(code) => return code,
    };
    // SAFETY: every iovec points into a buffer borrowed for the call.
    let ret = unsafe {
        if pos < 0 {
            libc::writev(fd, iov.as_ptr(), iov_count(&iov))
        } else {
            libc::pwritev(fd, iov.as_ptr(), iov_count(&iov), pos)
        }
    };
    cvt_len(ret)
}

/// `ftruncate(2)`
#[must_use]
pub fn ftruncate(fd: i32, len: i64) -> i32 {
    // SAFETY: plain syscall on a descriptor.
    cvt(unsafe { libc::ftruncate(fd, len) })
}

/// `rename(2)`
#[must_use]
pub fn rename(src: &NativePath, dst: &NativePath) -> i32 {
    // SAFETY: both paths are NUL-terminated and outlive the call.
    cvt(unsafe { libc::rename(src.as_ptr(), dst.as_ptr()) })
}

/// `mkdir(2)`
#[must_use]
pub fn mkdir(path: &NativePath, mode: u32) -> i32 {
    // SAFETY: path is NUL-terminated and outlives the call.
    cvt(unsafe { libc::mkdir(path.as_ptr(), mode) })
}

/// `rmdir(2)`
#[must_use]
pub fn rmdir(path: &NativePath) -> i32 {
    // SAFETY: path is NUL-terminated and outlives the call.
    cvt(unsafe { libc::rmdir(path.as_ptr()) })
}

/// `unlink(2)`
#[must_use]
pub fn unlink(path: &NativePath) -> i32 {
    // SAFETY: path is NUL-terminated and outlives the call.
    cvt(unsafe { libc::unlink(path.as_ptr()) })
}

/// `statx(2)` for a stat, lstat or fstat target
///
/// The buffer is only meaningful when the returned code is `0`.
#[must_use]
pub fn statx(target: &StatTarget) -> (i32, NativeStat) {
    let mut stat = NativeStat::zeroed();
    // SAFETY: pathname is NUL-terminated, stat is a valid statx buffer.
    let ret = unsafe {
        libc::statx(
            target.dirfd(),
            target.pathname(),
            target.flags(),
            STATX_MASK,
            stat.as_mut_ptr(),
        )
    };
    (cvt(ret), stat)
}

/// `readlink(2)` returning the full target bytes
///
/// # Errors
///
/// Returns `-errno` from `readlink(2)`.
pub fn readlink(path: &NativePath) -> Result<Vec<u8>, i32> {
    let mut target = vec![0u8; PATH_MAX + 1];
    // SAFETY: target is a live buffer of the given length.
    let ret = unsafe { libc::readlink(path.as_ptr(), target.as_mut_ptr().cast(), target.len()) };
    if ret < 0 {
        return Err(-Errno::last_raw());
    }
    target.truncate(usize::try_from(ret).unwrap_or(0));
    Ok(target)
}

/// `opendir(3)`
///
/// # Errors
///
/// Returns `-errno` from `opendir(3)`.
pub fn opendir(path: &NativePath) -> Result<NativeDir, i32> {
    NativeDir::open(path)
}

/// `readdir(3)` up to `max` entries; an empty result is end of stream
///
/// # Errors
///
/// Returns `-errno` from `readdir(3)`.
pub fn readdir(dir: &mut NativeDir, max: usize) -> Result<Vec<RawDirent>, i32> {
    dir.read_entries(max)
}

/// `closedir(3)`
#[must_use]
pub fn closedir(dir: NativeDir) -> i32 {
    dir.close()
}
