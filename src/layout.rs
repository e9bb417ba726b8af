//! Fixed-layout encoders
//!
//! Every payload that crosses back to the caller is serialized here into a
//! byte layout with a documented field order and width. All integers are
//! native-endian.
//!
//! ## Stat record (128 bytes)
//!
//! Sixteen `u64` words: dev, mode, nlink, uid, gid, rdev, ino, size, blksize,
//! blocks, flags, gen, atime, mtime, ctime, birthtime. Timestamps are
//! milliseconds since the epoch (`sec * 1000 + nsec / 1_000_000`), computed as
//! `i64` and stored as the two's complement bit pattern. `flags` and `gen`
//! are always 0 on Linux; `birthtime` is 0 when the filesystem has none.
//!
//! ## Directory entry (264 bytes)
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | type code (`DIRENT_*`)                 |
//! | 4      | 4    | name length in bytes                   |
//! | 8      | 256  | name, NUL padded                       |
//!
//! Encoders write nothing when the result code reports a failure; that check
//! lives in [`crate::router::decode`], shared by the sync and async forms.

use compio_fs_native::stat::makedev;
use compio_fs_native::{DirentKind, RawDirent, PATH_MAX};

/// Number of words in a stat record
pub const STAT_FIELDS: usize = 16;
/// Bytes in a stat record
pub const SIZEOF_STAT: usize = STAT_FIELDS * 8;
/// Bytes reserved for a name inside a directory entry record
pub const DIRENT_NAME_MAX: usize = 256;
/// Bytes in a directory entry record
pub const SIZEOF_DIRENT: usize = 8 + DIRENT_NAME_MAX;
/// Bytes in a path buffer: `PATH_MAX` plus the terminator
pub const SIZEOF_PATH: usize = PATH_MAX + 1;

/// Decoded stat record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatRecord {
    pub dev: u64,
    pub mode: u64,
    pub nlink: u64,
    pub uid: u64,
    pub gid: u64,
    pub rdev: u64,
    pub ino: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    pub flags: u64,
    pub gen: u64,
    pub atime_ms: u64,
    pub mtime_ms: u64,
    pub ctime_ms: u64,
    pub birthtime_ms: u64,
}

/// Milliseconds since the epoch as stored in a stat record
#[must_use]
pub fn timestamp_ms(sec: i64, nsec: u32) -> u64 {
    let ms = sec
        .wrapping_mul(1000)
        .wrapping_add(i64::from(nsec / 1_000_000));
    ms as u64
}

impl StatRecord {
    /// Build a record from a kernel statx buffer
    #[must_use]
    pub fn from_statx(st: &libc::statx) -> Self {
        let birthtime_ms = if st.stx_mask & libc::STATX_BTIME != 0 {
            timestamp_ms(st.stx_btime.tv_sec, st.stx_btime.tv_nsec)
        } else {
            0
        };
        Self {
            dev: makedev(st.stx_dev_major, st.stx_dev_minor),
            mode: u64::from(st.stx_mode),
            nlink: u64::from(st.stx_nlink),
            uid: u64::from(st.stx_uid),
            gid: u64::from(st.stx_gid),
            rdev: makedev(st.stx_rdev_major, st.stx_rdev_minor),
            ino: st.stx_ino,
            size: st.stx_size,
            blksize: u64::from(st.stx_blksize),
            blocks: st.stx_blocks,
            flags: 0,
            gen: 0,
            atime_ms: timestamp_ms(st.stx_atime.tv_sec, st.stx_atime.tv_nsec),
            mtime_ms: timestamp_ms(st.stx_mtime.tv_sec, st.stx_mtime.tv_nsec),
            ctime_ms: timestamp_ms(st.stx_ctime.tv_sec, st.stx_ctime.tv_nsec),
            birthtime_ms,
        }
    }

    /// Words in wire order
    #[must_use]
    pub const fn to_words(&self) -> [u64; STAT_FIELDS] {
        [
            self.dev,
            self.mode,
            self.nlink,
            self.uid,
            self.gid,
            self.rdev,
            self.ino,
            self.size,
            self.blksize,
            self.blocks,
            self.flags,
            self.gen,
            self.atime_ms,
            self.mtime_ms,
            self.ctime_ms,
            self.birthtime_ms,
        ]
    }

    /// Record from words in wire order
    #[must_use]
    pub const fn from_words(w: [u64; STAT_FIELDS]) -> Self {
        Self {
            dev: w[0],
            mode: w[1],
            nlink: w[2],
            uid: w[3],
            gid: w[4],
            rdev: w[5],
            ino: w[6],
            size: w[7],
            blksize: w[8],
            blocks: w[9],
            flags: w[10],
            gen: w[11],
            atime_ms: w[12],
            mtime_ms: w[13],
            ctime_ms: w[14],
            birthtime_ms: w[15],
        }
    }

    /// Write the record into the first [`SIZEOF_STAT`] bytes of `dst`
    ///
    /// Returns `false` and writes nothing if `dst` is too short.
    pub fn encode(&self, dst: &mut [u8]) -> bool {
        let Some(dst) = dst.get_mut(..SIZEOF_STAT) else {
            return false;
        };
        for (chunk, word) in dst.chunks_exact_mut(8).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
        true
    }

    /// Read a record from the first [`SIZEOF_STAT`] bytes of `src`
    #[must_use]
    pub fn decode(src: &[u8]) -> Option<Self> {
        let src = src.get(..SIZEOF_STAT)?;
        let mut words = [0u64; STAT_FIELDS];
        for (word, chunk) in words.iter_mut().zip(src.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *word = u64::from_ne_bytes(bytes);
        }
        Some(Self::from_words(words))
    }

    fn file_type(&self) -> u32 {
        (self.mode as u32) & libc::S_IFMT
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_type() == libc::S_IFREG
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type() == libc::S_IFDIR
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.file_type() == libc::S_IFLNK
    }

    #[must_use]
    pub fn is_char_device(&self) -> bool {
        self.file_type() == libc::S_IFCHR
    }

    #[must_use]
    pub fn is_block_device(&self) -> bool {
        self.file_type() == libc::S_IFBLK
    }

    #[must_use]
    pub fn is_fifo(&self) -> bool {
        self.file_type() == libc::S_IFIFO
    }

    #[must_use]
    pub fn is_socket(&self) -> bool {
        self.file_type() == libc::S_IFSOCK
    }

    /// Permission bits
    #[must_use]
    pub fn permissions(&self) -> u32 {
        (self.mode as u32) & 0o7777
    }
}

/// Encode a kernel statx buffer as a stat record
pub fn encode_stat(st: &libc::statx, dst: &mut [u8]) -> bool {
    StatRecord::from_statx(st).encode(dst)
}

/// Copy a symlink target into `dst`, truncated, zero-filling the rest
pub fn encode_link_target(target: &[u8], dst: &mut [u8]) {
    let n = target.len().min(dst.len());
    dst[..n].copy_from_slice(&target[..n]);
    dst[n..].fill(0);
}

/// How many directory entry records fit in a buffer of `len` bytes
#[must_use]
pub const fn dirent_capacity(len: usize) -> usize {
    len / SIZEOF_DIRENT
}

/// Encode entries back to back; returns how many records were written
///
/// Stops early when `dst` runs out of room. Names longer than 255 bytes are
/// truncated so the record keeps its terminator.
pub fn encode_dirents(entries: &[RawDirent], dst: &mut [u8]) -> usize {
    let mut written = 0;
    for (entry, record) in entries.iter().zip(dst.chunks_exact_mut(SIZEOF_DIRENT)) {
        let name_len = entry.name.len().min(DIRENT_NAME_MAX - 1);
        // name_len < 256 so the cast is lossless
        record[0..4].copy_from_slice(&entry.kind.code().to_ne_bytes());
        record[4..8].copy_from_slice(&(name_len as u32).to_ne_bytes());
        let name = &mut record[8..];
        name[..name_len].copy_from_slice(&entry.name[..name_len]);
        name[name_len..].fill(0);
        written += 1;
    }
    written
}

/// Raw address bytes of a native directory handle
#[must_use]
pub const fn encode_dir_address(address: usize) -> [u8; size_of::<usize>()] {
    address.to_ne_bytes()
}

/// Decoded directory entry record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirentRecord {
    pub kind: DirentKind,
    pub name: Vec<u8>,
}

impl DirentRecord {
    /// Decode one record; `None` if `src` is short or the record is malformed
    #[must_use]
    pub fn decode(src: &[u8]) -> Option<Self> {
        let src = src.get(..SIZEOF_DIRENT)?;
        let code = u32::from_ne_bytes(src[0..4].try_into().ok()?);
        let len = u32::from_ne_bytes(src[4..8].try_into().ok()?) as usize;
        let name = src[8..].get(..len)?;
        Some(Self {
            kind: DirentKind::from_code(code)?,
            name: name.to_vec(),
        })
    }

    /// Decode the first `count` records of a readdir buffer
    #[must_use]
    pub fn decode_all(src: &[u8], count: usize) -> Vec<Self> {
        src.chunks_exact(SIZEOF_DIRENT)
            .take(count)
            .filter_map(Self::decode)
            .collect()
    }

    /// Name as text, replacing invalid UTF-8
    #[must_use]
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_statx() -> libc::statx {
        // SAFETY: statx is plain old data
        let mut st: libc::statx = unsafe { std::mem::zeroed() };
        st.stx_mask = libc::STATX_BASIC_STATS;
        st.stx_mode = (libc::S_IFREG | 0o640) as u16;
        st.stx_nlink = 2;
        st.stx_uid = 1000;
        st.stx_gid = 100;
        st.stx_ino = 77;
        st.stx_size = 4096;
        st.stx_blksize = 512;
        st.stx_blocks = 8;
        st.stx_mtime.tv_sec = 1_700_000_000;
        st.stx_mtime.tv_nsec = 123_999_999;
        st.stx_btime.tv_sec = 42;
        st
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(SIZEOF_STAT, 128);
        assert_eq!(SIZEOF_DIRENT, 264);
        assert_eq!(SIZEOF_PATH, 4097);
    }

    #[test]
    fn test_timestamp_truncates_to_milliseconds() {
        assert_eq!(timestamp_ms(1, 999_999), 1000);
        assert_eq!(timestamp_ms(1_700_000_000, 123_999_999), 1_700_000_000_123);
        assert_eq!(timestamp_ms(-1, 0) as i64, -1000);
    }

    #[test]
    fn test_stat_word_order() {
        let mut buf = [0u8; SIZEOF_STAT];
        assert!(encode_stat(&sample_statx(), &mut buf));

        let word = |i: usize| u64::from_ne_bytes(buf[i * 8..i * 8 + 8].try_into().unwrap());
        assert_eq!(word(1), u64::from(libc::S_IFREG | 0o640));
        assert_eq!(word(2), 2);
        assert_eq!(word(6), 77);
        assert_eq!(word(7), 4096);
        assert_eq!(word(10), 0);
        assert_eq!(word(11), 0);
        assert_eq!(word(13), 1_700_000_000_123);
        // no STATX_BTIME in the mask
        assert_eq!(word(15), 0);
    }

    #[test]
    fn test_stat_predicates() {
        let record = StatRecord::from_statx(&sample_statx());
        assert!(record.is_file());
        assert!(!record.is_dir());
        assert!(!record.is_symlink());
        assert_eq!(record.permissions(), 0o640);
        assert_eq!(StatRecord::decode(&{
            let mut buf = [0u8; SIZEOF_STAT];
            record.encode(&mut buf);
            buf
        }), Some(record));
    }

    #[test]
    fn test_short_stat_buffer_is_untouched() {
        let mut buf = [0xAAu8; SIZEOF_STAT - 1];
        assert!(!encode_stat(&sample_statx(), &mut buf));
        assert!(buf.iter().all(|&b| b == 0xAA));
        assert_eq!(StatRecord::decode(&buf), None);
    }

    #[test]
    fn test_link_target_truncation() {
        let mut buf = [0xFFu8; 8];
        encode_link_target(b"abc", &mut buf);
        assert_eq!(&buf, b"abc\0\0\0\0\0");

        let mut small = [0u8; 4];
        encode_link_target(b"/very/long/target", &mut small);
        assert_eq!(&small, b"/ver");
    }

    #[test]
    fn test_dirent_records() {
        let entries = vec![
            RawDirent {
                name: b"a.txt".to_vec(),
                kind: DirentKind::File,
            },
            RawDirent {
                name: b"sub".to_vec(),
                kind: DirentKind::Dir,
            },
            RawDirent {
                name: b"dropped".to_vec(),
                kind: DirentKind::Link,
            },
        ];
        let mut buf = vec![0xEEu8; SIZEOF_DIRENT * 2];
        assert_eq!(dirent_capacity(buf.len()), 2);
        assert_eq!(encode_dirents(&entries, &mut buf), 2);

        let decoded = DirentRecord::decode_all(&buf, 2);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].kind, DirentKind::File);
        assert_eq!(decoded[0].name_lossy(), "a.txt");
        assert_eq!(decoded[1].kind, DirentKind::Dir);
        assert_eq!(decoded[1].name, b"sub");
        // padding after the name is zeroed
        assert!(buf[8 + 5..SIZEOF_DIRENT].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_dir_address_bytes() {
        assert_eq!(encode_dir_address(0x1234), 0x1234usize.to_ne_bytes());
    }
}
