//! Open flags, file-type bits and directory entry type codes
//!
//! Values are taken from the platform so callers can combine them with
//! numbers they obtained elsewhere. Block, FIFO and socket type bits are only
//! exported where the platform defines them.

use crate::error::{BridgeError, Result};
use compio_fs_native::DirentKind;

/// Open for reading only
pub const O_RDONLY: i32 = libc::O_RDONLY;
/// Open for writing only
pub const O_WRONLY: i32 = libc::O_WRONLY;
/// Open for reading and writing
pub const O_RDWR: i32 = libc::O_RDWR;
/// Create the file if it does not exist
pub const O_CREAT: i32 = libc::O_CREAT;
/// Truncate an existing file to zero length
pub const O_TRUNC: i32 = libc::O_TRUNC;
/// Append on every write
pub const O_APPEND: i32 = libc::O_APPEND;
/// Fail if `O_CREAT` is set and the file exists
pub const O_EXCL: i32 = libc::O_EXCL;
/// Synchronous writes
pub const O_SYNC: i32 = libc::O_SYNC;

/// Mask for the file-type bits of a mode
pub const S_IFMT: u32 = libc::S_IFMT;
/// Regular file
pub const S_IFREG: u32 = libc::S_IFREG;
/// Directory
pub const S_IFDIR: u32 = libc::S_IFDIR;
/// Character device
pub const S_IFCHR: u32 = libc::S_IFCHR;
/// Symbolic link
pub const S_IFLNK: u32 = libc::S_IFLNK;
/// Block device
#[cfg(unix)]
pub const S_IFBLK: u32 = libc::S_IFBLK;
/// Named pipe
#[cfg(unix)]
pub const S_IFIFO: u32 = libc::S_IFIFO;
/// Socket
#[cfg(unix)]
pub const S_IFSOCK: u32 = libc::S_IFSOCK;

/// Directory entry of unknown type
pub const DIRENT_UNKNOWN: u32 = DirentKind::Unknown.code();
/// Directory entry for a regular file
pub const DIRENT_FILE: u32 = DirentKind::File.code();
/// Directory entry for a directory
pub const DIRENT_DIR: u32 = DirentKind::Dir.code();
/// Directory entry for a symbolic link
pub const DIRENT_LINK: u32 = DirentKind::Link.code();
/// Directory entry for a named pipe
pub const DIRENT_FIFO: u32 = DirentKind::Fifo.code();
/// Directory entry for a socket
pub const DIRENT_SOCKET: u32 = DirentKind::Socket.code();
/// Directory entry for a character device
pub const DIRENT_CHAR: u32 = DirentKind::Char.code();
/// Directory entry for a block device
pub const DIRENT_BLOCK: u32 = DirentKind::Block.code();

/// Default mode for files created by `open`
pub const DEFAULT_FILE_MODE: u32 = 0o666;
/// Default mode for `mkdir`
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// Translate an fopen-style flag string into open flags
///
/// Accepts `r`, `r+`, `w`, `w+`, `a`, `a+` and the exclusive (`x`) and
/// synchronous (`s`) variants `wx`, `w+x`, `ax`, `a+x`, `rs`, `rs+`, `sr`,
/// `sr+`, `xw`, `xw+`, `xa`, `xa+`, `as`, `as+`, `sa`, `sa+`.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidFlags`] for any other string.
pub fn flags_from_str(flags: &str) -> Result<i32> {
    let value = match flags {
        "r" => O_RDONLY,
        "rs" | "sr" => O_RDONLY | O_SYNC,
        "r+" => O_RDWR,
        "rs+" | "sr+" => O_RDWR | O_SYNC,

        "w" => O_TRUNC | O_CREAT | O_WRONLY,
        "wx" | "xw" => O_TRUNC | O_CREAT | O_WRONLY | O_EXCL,
        "w+" => O_TRUNC | O_CREAT | O_RDWR,
        "wx+" | "xw+" | "w+x" => O_TRUNC | O_CREAT | O_RDWR | O_EXCL,

        "a" => O_APPEND | O_CREAT | O_WRONLY,
        "ax" | "xa" => O_APPEND | O_CREAT | O_WRONLY | O_EXCL,
        "as" | "sa" => O_APPEND | O_CREAT | O_WRONLY | O_SYNC,
        "a+" => O_APPEND | O_CREAT | O_RDWR,
        "ax+" | "xa+" | "a+x" => O_APPEND | O_CREAT | O_RDWR | O_EXCL,
        "as+" | "sa+" => O_APPEND | O_CREAT | O_RDWR | O_SYNC,

        _ => return Err(BridgeError::InvalidFlags(flags.to_string())),
    };
    Ok(value)
}

/// Parse an octal mode string such as `755` or `0o644`
///
/// # Errors
///
/// Returns [`BridgeError::InvalidMode`] if the string is not octal or has
/// bits above `0o7777`.
pub fn parse_mode(mode: &str) -> Result<u32> {
    let digits = mode.strip_prefix("0o").unwrap_or(mode);
    match u32::from_str_radix(digits, 8) {
        Ok(value) if value <= 0o7777 => Ok(value),
        _ => Err(BridgeError::InvalidMode(mode.to_string())),
    }
}
