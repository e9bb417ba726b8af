//! stat, lstat, fstat and readlink
//!
//! The destination buffer is only written when the call succeeds.

use crate::buffer::HostBuffer;
use crate::error::Result;
use crate::layout::SIZEOF_STAT;
use crate::router::{decode, Completion, Payload};
use crate::slot::{Borrowed, OpKind, RequestSlot};
use compio_fs_native::{submit, sys, NativePath, NativeStat, StatTarget};
use std::path::Path;

/// Destination must hold a whole stat record
fn check_stat_dst(len: usize) -> std::result::Result<(), i32> {
    if len < SIZEOF_STAT {
        Err(-libc::EINVAL)
    } else {
        Ok(())
    }
}

fn stat_async(
    slot: &RequestSlot,
    kind: OpKind,
    target: std::result::Result<StatTarget, i32>,
    buffer: &HostBuffer,
) -> Result<()> {
    let ticket = slot.reserve(kind)?;
    let dst = buffer.take()?;
    ticket.launch(Some(Borrowed::Buffer(buffer.clone())), async move {
        let (result, stat) = match target.and_then(|t| check_stat_dst(dst.len()).map(|()| t)) {
            Ok(target) => submit::statx(target).await,
            Err(code) => (code, NativeStat::zeroed()),
        };
        (result, Completion::Stat(stat, dst))
    });
    Ok(())
}

fn stat_blocking(target: std::result::Result<StatTarget, i32>, dst: &mut [u8]) -> i32 {
    let target = match target.and_then(|t| check_stat_dst(dst.len()).map(|()| t)) {
        Ok(target) => target,
        Err(code) => return code,
    };
    let (result, stat) = sys::statx(&target);
    decode(result, Payload::Stat(&stat), dst);
    result
}

/// Stat `path`, following symlinks, into a 128-byte stat record
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn stat(slot: &RequestSlot, path: &Path, buffer: &HostBuffer) -> Result<()> {
    stat_async(slot, OpKind::Stat, NativePath::new(path).map(StatTarget::Path), buffer)
}

#[must_use]
pub fn stat_sync(path: &Path, dst: &mut [u8]) -> i32 {
    stat_blocking(NativePath::new(path).map(StatTarget::Path), dst)
}

/// Stat `path` without following a final symlink
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn lstat(slot: &RequestSlot, path: &Path, buffer: &HostBuffer) -> Result<()> {
    stat_async(slot, OpKind::Lstat, NativePath::new(path).map(StatTarget::Link), buffer)
}

#[must_use]
pub fn lstat_sync(path: &Path, dst: &mut [u8]) -> i32 {
    stat_blocking(NativePath::new(path).map(StatTarget::Link), dst)
}

/// Stat an open descriptor
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn fstat(slot: &RequestSlot, fd: i32, buffer: &HostBuffer) -> Result<()> {
    stat_async(slot, OpKind::Fstat, Ok(StatTarget::Fd(fd)), buffer)
}

#[must_use]
pub fn fstat_sync(fd: i32, dst: &mut [u8]) -> i32 {
    stat_blocking(Ok(StatTarget::Fd(fd)), dst)
}

/// Read the target of the symlink at `path` into `buffer`
///
/// The result code is 0 on success. The target is truncated to the buffer
/// length and the rest of the buffer is zeroed.
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn readlink(slot: &RequestSlot, path: &Path, buffer: &HostBuffer) -> Result<()> {
    let ticket = slot.reserve(OpKind::Readlink)?;
    let path = NativePath::new(path);
    let dst = buffer.take()?;
    ticket.launch(Some(Borrowed::Buffer(buffer.clone())), async move {
        let link = match path {
            Ok(path) => submit::readlink(path).await,
            Err(code) => Err(code),
        };
        let (result, target) = match link {
            Ok(target) => (0, target),
            Err(code) => (code, Vec::new()),
        };
        (result, Completion::LinkTarget(target, dst))
    });
    Ok(())
}

#[must_use]
pub fn readlink_sync(path: &Path, dst: &mut [u8]) -> i32 {
    let link = NativePath::new(path).and_then(|path| sys::readlink(&path));
    match link {
        Ok(target) => {
            decode(0, Payload::LinkTarget(&target), dst);
            0
        }
        Err(code) => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StatRecord;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_stat_sync_reports_size() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("sized");
        fs::write(&file, vec![7u8; 1234]).unwrap();

        let mut dst = [0u8; SIZEOF_STAT];
        assert_eq!(stat_sync(&file, &mut dst), 0);
        let record = StatRecord::decode(&dst).unwrap();
        assert_eq!(record.size, 1234);
        assert!(record.is_file());
    }

    #[test]
    fn test_lstat_sees_the_link() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        symlink("nowhere", &link).unwrap();

        let mut dst = [0u8; SIZEOF_STAT];
        assert_eq!(stat_sync(&link, &mut dst), -libc::ENOENT);
        assert_eq!(lstat_sync(&link, &mut dst), 0);
        assert!(StatRecord::decode(&dst).unwrap().is_symlink());
    }

    #[test]
    fn test_short_destination() {
        let mut dst = [0u8; SIZEOF_STAT - 8];
        assert_eq!(stat_sync(Path::new("/"), &mut dst), -libc::EINVAL);
        assert_eq!(fstat_sync(0, &mut dst), -libc::EINVAL);
    }

    #[test]
    fn test_path_error_wins_over_short_destination() {
        let long = "z".repeat(4097);
        let mut dst = [0u8; 1];
        assert_eq!(stat_sync(Path::new(&long), &mut dst), -libc::ENAMETOOLONG);
    }

    #[test]
    fn test_readlink_sync_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        symlink("abcdefgh", &link).unwrap();

        let mut dst = [0xFFu8; 12];
        assert_eq!(readlink_sync(&link, &mut dst), 0);
        assert_eq!(&dst, b"abcdefgh\0\0\0\0");

        let mut small = [0u8; 3];
        assert_eq!(readlink_sync(&link, &mut small), 0);
        assert_eq!(&small, b"abc");
    }

    #[test]
    fn test_readlink_sync_not_a_link() {
        let temp_dir = TempDir::new().unwrap();
        let mut dst = [0x11u8; 8];
        assert_eq!(readlink_sync(temp_dir.path(), &mut dst), -libc::EINVAL);
        assert_eq!(dst, [0x11u8; 8]);
    }
}
