//! Async submissions on the current compio runtime
//!
//! Operations with an io_uring opcode go through [`compio::runtime::submit`];
//! the rest run the [`crate::sys`] core under
//! [`compio::runtime::spawn_blocking`]. Either way the caller gets the result
//! code plus ownership of whatever it handed in.
//!
//! All functions must be awaited on a thread running a compio runtime.

use crate::dir::{NativeDir, RawDirent};
use crate::op::{
    CloseOp, MkdirOp, OpenOp, ReadOp, RenameOp, StatxOp, UnlinkOp, VectoredOp, WriteOp,
};
use crate::path::NativePath;
use crate::stat::{NativeStat, StatTarget};
use crate::sys;
use compio::runtime::submit;
use std::io;

/// Map a completion into a result code
fn code(result: io::Result<usize>) -> i32 {
    match result {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(e) => -e.raw_os_error().unwrap_or(libc::EIO),
    }
}

/// Run a blocking core call off the runtime thread
async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    compio::runtime::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| std::panic::resume_unwind(e))
}

/// Open a file; resolves to the descriptor or `-errno`
pub async fn open(path: NativePath, flags: i32, mode: u32) -> i32 {
    code(submit(OpenOp::new(path, flags, mode)).await.0)
}

/// Close a descriptor
pub async fn close(fd: i32) -> i32 {
    code(submit(CloseOp::new(fd)).await.0)
}

/// Read into `buf[offset..offset + len]`; resolves to the byte count
pub async fn read(fd: i32, buf: Vec<u8>, offset: usize, len: usize, pos: i64) -> (i32, Vec<u8>) {
    match ReadOp::new(fd, buf, offset, len, pos) {
        Ok(op) => {
            let result = submit(op).await;
            (code(result.0), result.1.into_buf())
        }
        Err(rejected) => rejected,
    }
}

/// Write from `buf[offset..offset + len]`; resolves to the byte count
pub async fn write(fd: i32, buf: Vec<u8>, offset: usize, len: usize, pos: i64) -> (i32, Vec<u8>) {
    match WriteOp::new(fd, buf, offset, len, pos) {
        Ok(op) => {
            let result = submit(op).await;
            (code(result.0), result.1.into_buf())
        }
        Err(rejected) => rejected,
    }
}

/// Vectored read filling `bufs` in order
pub async fn readv(fd: i32, bufs: Vec<Vec<u8>>, pos: i64) -> (i32, Vec<Vec<u8>>) {
    match VectoredOp::readv(fd, bufs, pos) {
        Ok(op) => {
            let result = submit(op).await;
            (code(result.0), result.1.into_bufs())
        }
        Err(rejected) => rejected,
    }
}

/// Vectored write draining `bufs` in order
pub async fn writev(fd: i32, bufs: Vec<Vec<u8>>, pos: i64) -> (i32, Vec<Vec<u8>>) {
    match VectoredOp::writev(fd, bufs, pos) {
        Ok(op) => {
            let result = submit(op).await;
            (code(result.0), result.1.into_bufs())
        }
        Err(rejected) => rejected,
    }
}

/// Truncate or extend an open file
///
/// No io_uring opcode is assumed for ftruncate; runs on the blocking pool.
pub async fn ftruncate(fd: i32, len: i64) -> i32 {
    log::trace!("ftruncate(fd={fd}) via blocking pool");
    blocking(move || sys::ftruncate(fd, len)).await
}

/// Rename `src` to `dst`
pub async fn rename(src: NativePath, dst: NativePath) -> i32 {
    code(submit(RenameOp::new(src, dst)).await.0)
}

/// Create a directory
pub async fn mkdir(path: NativePath, mode: u32) -> i32 {
    code(submit(MkdirOp::new(path, mode)).await.0)
}

/// Remove an empty directory
pub async fn rmdir(path: NativePath) -> i32 {
    code(submit(UnlinkOp::rmdir(path)).await.0)
}

/// Remove a non-directory entry
pub async fn unlink(path: NativePath) -> i32 {
    code(submit(UnlinkOp::unlink(path)).await.0)
}

/// statx for a stat, lstat or fstat target
///
/// The returned buffer is only meaningful when the code is `0`.
pub async fn statx(target: StatTarget) -> (i32, NativeStat) {
    let result = submit(StatxOp::new(target)).await;
    (code(result.0), result.1.into_stat())
}

/// Read a symlink target
///
/// Always on the blocking pool: there is no readlink opcode, and the target
/// can be up to `PATH_MAX` bytes read from disk.
///
/// # Errors
///
/// Returns `-errno` from `readlink(2)`.
pub async fn readlink(path: NativePath) -> Result<Vec<u8>, i32> {
    log::trace!("readlink via blocking pool");
    blocking(move || sys::readlink(&path)).await
}

/// Open a directory stream
///
/// # Errors
///
/// Returns `-errno` from `opendir(3)`.
pub async fn opendir(path: NativePath) -> Result<NativeDir, i32> {
    blocking(move || sys::opendir(&path)).await
}

/// Read up to `max` entries; the stream is handed back with the result
pub async fn readdir(mut dir: NativeDir, max: usize) -> (Result<Vec<RawDirent>, i32>, NativeDir) {
    blocking(move || {
        let entries = sys::readdir(&mut dir, max);
        (entries, dir)
    })
    .await
}

/// Close a directory stream
pub async fn closedir(dir: NativeDir) -> i32 {
    blocking(move || sys::closedir(dir)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn native(path: &Path) -> NativePath {
        NativePath::new(path).unwrap()
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(code(Ok(12)), 12);
        assert_eq!(code(Ok(usize::MAX)), i32::MAX);
        assert_eq!(
            code(Err(io::Error::from_raw_os_error(libc::ENOENT))),
            -libc::ENOENT
        );
        assert_eq!(code(Err(io::Error::other("no errno"))), -libc::EIO);
    }

    #[compio::test]
    async fn test_write_then_read_through_ring() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("data");

        let fd = open(native(&file), libc::O_RDWR | libc::O_CREAT, 0o644).await;
        assert!(fd >= 0, "open failed: {fd}");

        let (written, buf) = write(fd, b"hello world".to_vec(), 0, 11, 0).await;
        assert_eq!(written, 11);
        assert_eq!(buf, b"hello world");

        let (read_n, buf) = read(fd, vec![0u8; 16], 2, 5, 6).await;
        assert_eq!(read_n, 5);
        assert_eq!(&buf[2..7], b"world");

        assert_eq!(close(fd).await, 0);
    }

    #[compio::test]
    async fn test_bad_window_never_reaches_the_ring() {
        let (code, buf) = read(-1, vec![0u8; 4], 3, 2, 0).await;
        assert_eq!(code, -libc::EINVAL);
        assert_eq!(buf.len(), 4);
    }

    #[compio::test]
    async fn test_statx_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let target = StatTarget::Path(native(&temp_dir.path().join("missing")));
        let (code, _) = statx(target).await;
        assert_eq!(code, -libc::ENOENT);
    }

    #[compio::test]
    async fn test_directory_stream_on_blocking_pool() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("only"), "x").unwrap();

        let dir = opendir(native(temp_dir.path())).await.unwrap();
        let (entries, dir) = readdir(dir, 8).await;
        let entries = entries.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"only");
        assert_eq!(closedir(dir).await, 0);
    }
}
