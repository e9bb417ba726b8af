//! Operation dispatch surface
//!
//! Every operation comes in two forms:
//!
//! - **async** (`ops::stat`, `ops::read`, ...): takes a bound
//!   [`crate::RequestSlot`], stamps it and returns at once. The result code
//!   reaches the context's handler with the slot's correlation id.
//!   `Err` is reserved for misuse of the bridge (unbound or busy slot,
//!   destroyed context, a buffer that is borrowed or already lent).
//! - **sync** (`ops::stat_sync`, `ops::read_sync`, ...): blocks the calling
//!   thread and returns the result code directly.
//!
//! Both forms validate arguments identically and decode payloads through
//! [`crate::router::decode`]. Argument errors are result codes, not `Err`:
//!
//! | condition                                  | code            |
//! |--------------------------------------------|-----------------|
//! | path longer than 4096 bytes                | `-ENAMETOOLONG` |
//! | NUL byte inside a path                     | `-EINVAL`       |
//! | `offset + len` outside the buffer          | `-EINVAL`       |
//! | stat destination shorter than 128 bytes    | `-EINVAL`       |
//! | entry buffer too small for one record      | `-EINVAL`       |
//! | directory handle not open                  | `-EBADF`        |
//! | iovec array allocation failure             | `-ENOMEM`       |
//!
//! In the async form these codes still arrive through the handler.

mod dir;
mod file;
mod path;
mod stat;

pub use dir::{closedir, closedir_sync, opendir, opendir_sync, readdir, readdir_sync};
pub use file::{
    close, close_sync, ftruncate, ftruncate_sync, open, open_sync, read, read_sync, readv,
    readv_sync, write, write_sync, writev, writev_sync,
};
pub use path::{mkdir, mkdir_sync, rename, rename_sync, rmdir, rmdir_sync, unlink, unlink_sync};
pub use stat::{
    fstat, fstat_sync, lstat, lstat_sync, readlink, readlink_sync, stat, stat_sync,
};
