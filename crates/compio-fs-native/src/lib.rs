//! # compio-fs-native
//!
//! Native filesystem submissions for compio with support for:
//! - io_uring opcodes for open, close, read/readv, write/writev, rename,
//!   mkdir, rmdir, unlink and statx
//! - `spawn_blocking` fallbacks for ftruncate, readlink and directory
//!   streams (opendir, readdir, closedir)
//! - A blocking syscall core (`sys`) with the exact same result-code
//!   contract, used directly by synchronous callers
//!
//! Every operation reports a single `i32` result code: non-negative on
//! success (a descriptor, a byte count, an entry count or `0`) and `-errno`
//! on failure. Nothing is translated or retried.
//!
//! Buffers that cross the async boundary are owned by the operation while
//! it is in flight and handed back with the result code, the way compio's
//! `read_at`/`write_at` return their buffers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use compio_fs_native::{submit, NativePath};
//! use std::path::Path;
//!
//! # async fn example() {
//! let path = NativePath::new(Path::new("data.txt")).unwrap();
//! let fd = submit::open(path, libc::O_RDONLY, 0).await;
//! if fd >= 0 {
//!     let (n, buf) = submit::read(fd, vec![0u8; 4096], 0, 4096, 0).await;
//!     println!("read {n} bytes: {:?}", &buf[..n.max(0) as usize]);
//!     submit::close(fd).await;
//! }
//! # }
//! ```
//!
//! Note: the driver side is Linux-only (io_uring + statx).

pub mod dir;
pub mod op;
pub mod path;
pub mod stat;
pub mod submit;
pub mod sys;

// Re-export main types
pub use dir::{DirentKind, NativeDir, RawDirent};
pub use path::{NativePath, PATH_MAX};
pub use stat::{NativeStat, StatTarget, STATX_MASK};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
