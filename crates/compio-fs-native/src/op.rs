//! io_uring operations implementing compio's `OpCode`
//!
//! Each op owns every buffer and path the kernel will touch, so the pointers
//! placed in the submission entry stay valid until the completion is reaped.
//! Ops hand their buffers back through `into_*` once [`compio::runtime::submit`]
//! returns them.

use crate::path::NativePath;
use crate::stat::{NativeStat, StatTarget, STATX_MASK};
use crate::sys;
use compio::driver::{OpCode, OpEntry};
use io_uring::{opcode, types};
use std::pin::Pin;

/// io_uring offset for a file position; negative means "current position"
#[must_use]
pub fn uring_offset(pos: i64) -> u64 {
    u64::try_from(pos).unwrap_or(u64::MAX)
}

/// `IORING_OP_OPENAT` relative to the working directory
#[derive(Debug)]
pub struct OpenOp {
    path: NativePath,
    flags: i32,
    mode: u32,
}

impl OpenOp {
    /// Create an open operation; `O_CLOEXEC` is always added
    #[must_use]
    pub fn new(path: NativePath, flags: i32, mode: u32) -> Self {
        Self {
            path,
            flags: flags | libc::O_CLOEXEC,
            mode,
        }
    }
}

impl OpCode for OpenOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        OpEntry::Submission(
            opcode::OpenAt::new(types::Fd(libc::AT_FDCWD), self.path.as_ptr())
                .flags(self.flags)
                .mode(self.mode)
                .build(),
        )
    }
}

/// `IORING_OP_CLOSE`
#[derive(Debug)]
pub struct CloseOp {
    fd: i32,
}

impl CloseOp {
    /// Create a close operation
    #[must_use]
    pub fn new(fd: i32) -> Self {
        Self { fd }
    }
}

impl OpCode for CloseOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        OpEntry::Submission(opcode::Close::new(types::Fd(self.fd)).build())
    }
}

/// `IORING_OP_READ` into a window of an owned buffer
#[derive(Debug)]
pub struct ReadOp {
    fd: i32,
    buf: Vec<u8>,
    offset: usize,
    len: u32,
    pos: u64,
}

impl ReadOp {
    /// Create a read into `buf[offset..offset + len]`
    ///
    /// # Errors
    ///
    /// Returns `-EINVAL` and the untouched buffer if the window does not fit.
    pub fn new(
        fd: i32,
        buf: Vec<u8>,
        offset: usize,
        len: usize,
        pos: i64,
    ) -> Result<Self, (i32, Vec<u8>)> {
        match sys::check_window(buf.len(), offset, len) {
            Ok(len) => Ok(Self {
                fd,
                buf,
                offset,
                len,
                pos: uring_offset(pos),
            }),
            Err(code) => Err((code, buf)),
        }
    }

    /// Give the buffer back
    #[must_use]
    pub fn into_buf(self) -> Vec<u8> {
        self.buf
    }
}

impl OpCode for ReadOp {
    fn create_entry(mut self: Pin<&mut Self>) -> OpEntry {
        let offset = self.offset;
        let ptr = self.buf[offset..].as_mut_ptr();
        OpEntry::Submission(
            opcode::Read::new(types::Fd(self.fd), ptr, self.len)
                .offset(self.pos)
                .build(),
        )
    }
}

/// `IORING_OP_WRITE` from a window of an owned buffer
#[derive(Debug)]
pub struct WriteOp {
    fd: i32,
    buf: Vec<u8>,
    offset: usize,
    len: u32,
    pos: u64,
}

impl WriteOp {
    /// Create a write from `buf[offset..offset + len]`
    ///
    /// # Errors
    ///
    /// Returns `-EINVAL` and the untouched buffer if the window does not fit.
    pub fn new(
        fd: i32,
        buf: Vec<u8>,
        offset: usize,
        len: usize,
        pos: i64,
    ) -> Result<Self, (i32, Vec<u8>)> {
        match sys::check_window(buf.len(), offset, len) {
            Ok(len) => Ok(Self {
                fd,
                buf,
                offset,
                len,
                pos: uring_offset(pos),
            }),
            Err(code) => Err((code, buf)),
        }
    }

    /// Give the buffer back
    #[must_use]
    pub fn into_buf(self) -> Vec<u8> {
        self.buf
    }
}

impl OpCode for WriteOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        let ptr = self.buf[self.offset..].as_ptr();
        OpEntry::Submission(
            opcode::Write::new(types::Fd(self.fd), ptr, self.len)
                .offset(self.pos)
                .build(),
        )
    }
}

/// `IORING_OP_READV` / `IORING_OP_WRITEV` over an owned buffer sequence
///
/// The iovec array points into `bufs`; moving the op moves only the `Vec`
/// headers, never the heap storage the iovecs reference.
pub struct VectoredOp {
    fd: i32,
    bufs: Vec<Vec<u8>>,
    iovecs: Vec<libc::iovec>,
    pos: u64,
    write: bool,
}

impl VectoredOp {
    /// Create a vectored read filling `bufs` in order
    ///
    /// # Errors
    ///
    /// Returns `-ENOMEM` and the buffers if the iovec array cannot be allocated.
    pub fn readv(fd: i32, bufs: Vec<Vec<u8>>, pos: i64) -> Result<Self, (i32, Vec<Vec<u8>>)> {
        Self::new(fd, bufs, pos, false)
    }

    /// Create a vectored write draining `bufs` in order
    ///
    /// # Errors
    ///
    /// Returns `-ENOMEM` and the buffers if the iovec array cannot be allocated.
    pub fn writev(fd: i32, bufs: Vec<Vec<u8>>, pos: i64) -> Result<Self, (i32, Vec<Vec<u8>>)> {
        Self::new(fd, bufs, pos, true)
    }

    fn new(
        fd: i32,
        mut bufs: Vec<Vec<u8>>,
        pos: i64,
        write: bool,
    ) -> Result<Self, (i32, Vec<Vec<u8>>)> {
        match sys::iovecs_mut(&mut bufs) {
            Ok(iovecs) => Ok(Self {
                fd,
                bufs,
                iovecs,
                pos: uring_offset(pos),
                write,
            }),
            Err(code) => Err((code, bufs)),
        }
    }

    /// Give the buffers back
    #[must_use]
    pub fn into_bufs(self) -> Vec<Vec<u8>> {
        self.bufs
    }
}

impl std::fmt::Debug for VectoredOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectoredOp")
            .field("fd", &self.fd)
            .field("buffers", &self.bufs.len())
            .field("pos", &self.pos)
            .field("write", &self.write)
            .finish()
    }
}

impl OpCode for VectoredOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        let fd = types::Fd(self.fd);
        let count = u32::try_from(self.iovecs.len()).unwrap_or(u32::MAX);
        let entry = if self.write {
            opcode::Writev::new(fd, self.iovecs.as_ptr(), count)
                .offset(self.pos)
                .build()
        } else {
            opcode::Readv::new(fd, self.iovecs.as_ptr(), count)
                .offset(self.pos)
                .build()
        };
        OpEntry::Submission(entry)
    }
}

/// `IORING_OP_RENAMEAT` relative to the working directory
#[derive(Debug)]
pub struct RenameOp {
    src: NativePath,
    dst: NativePath,
}

impl RenameOp {
    /// Create a rename operation
    #[must_use]
    pub fn new(src: NativePath, dst: NativePath) -> Self {
        Self { src, dst }
    }
}

impl OpCode for RenameOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        OpEntry::Submission(
            opcode::RenameAt::new(
                types::Fd(libc::AT_FDCWD),
                self.src.as_ptr(),
                types::Fd(libc::AT_FDCWD),
                self.dst.as_ptr(),
            )
            .build(),
        )
    }
}

/// `IORING_OP_MKDIRAT` relative to the working directory
#[derive(Debug)]
pub struct MkdirOp {
    path: NativePath,
    mode: u32,
}

impl MkdirOp {
    /// Create a mkdir operation
    #[must_use]
    pub fn new(path: NativePath, mode: u32) -> Self {
        Self { path, mode }
    }
}

impl OpCode for MkdirOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        OpEntry::Submission(
            opcode::MkDirAt::new(types::Fd(libc::AT_FDCWD), self.path.as_ptr())
                .mode(self.mode)
                .build(),
        )
    }
}

/// `IORING_OP_UNLINKAT`, covering both unlink and rmdir
#[derive(Debug)]
pub struct UnlinkOp {
    path: NativePath,
    flags: i32,
}

impl UnlinkOp {
    /// Remove a non-directory entry
    #[must_use]
    pub fn unlink(path: NativePath) -> Self {
        Self { path, flags: 0 }
    }

    /// Remove an empty directory
    #[must_use]
    pub fn rmdir(path: NativePath) -> Self {
        Self {
            path,
            flags: libc::AT_REMOVEDIR,
        }
    }
}

impl OpCode for UnlinkOp {
    fn create_entry(self: Pin<&mut Self>) -> OpEntry {
        OpEntry::Submission(
            opcode::UnlinkAt::new(types::Fd(libc::AT_FDCWD), self.path.as_ptr())
                .flags(self.flags)
                .build(),
        )
    }
}

/// `IORING_OP_STATX` for stat, lstat and fstat
#[derive(Debug)]
pub struct StatxOp {
    target: StatTarget,
    stat: NativeStat,
}

impl StatxOp {
    /// Create a statx operation with a zeroed buffer
    #[must_use]
    pub fn new(target: StatTarget) -> Self {
        Self {
            target,
            stat: NativeStat::zeroed(),
        }
    }

    /// Give the filled buffer back
    #[must_use]
    pub fn into_stat(self) -> NativeStat {
        self.stat
    }
}

impl OpCode for StatxOp {
    fn create_entry(mut self: Pin<&mut Self>) -> OpEntry {
        let statxbuf = self.stat.as_mut_ptr().cast::<types::statx>();
        OpEntry::Submission(
            opcode::Statx::new(
                types::Fd(self.target.dirfd()),
                self.target.pathname(),
                statxbuf,
            )
            .flags(self.target.flags())
            .mask(STATX_MASK)
            .build(),
        )
    }
}
