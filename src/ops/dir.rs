//! opendir, readdir, closedir
//!
//! readdir result codes are entry counts: `n > 0` records were written, `0`
//! is the end of the stream. At most `buffer_len / SIZEOF_DIRENT` entries are
//! returned per call.

use crate::buffer::HostBuffer;
use crate::dir::DirHandle;
use crate::error::Result;
use crate::layout::dirent_capacity;
use crate::router::{decode, Completion, Payload};
use crate::slot::{Borrowed, OpKind, RequestSlot};
use compio_fs_native::{submit, sys, NativeDir, NativePath, RawDirent};
use std::path::Path;

fn entry_count(entries: &[RawDirent]) -> i32 {
    i32::try_from(entries.len()).unwrap_or(i32::MAX)
}

/// Open a directory stream into `handle`
///
/// A stream already held by `handle` is closed when the new one is
/// installed.
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn opendir(slot: &RequestSlot, path: &Path, handle: &DirHandle) -> Result<()> {
    let ticket = slot.reserve(OpKind::Opendir)?;
    let path = NativePath::new(path);
    ticket.launch(Some(Borrowed::Dir(handle.clone())), async move {
        let opened = match path {
            Ok(path) => submit::opendir(path).await,
            Err(code) => Err(code),
        };
        match opened {
            Ok(dir) => (0, Completion::Opened(Some(dir))),
            Err(code) => (code, Completion::Opened(None)),
        }
    });
    Ok(())
}

#[must_use]
pub fn opendir_sync(path: &Path, handle: &DirHandle) -> i32 {
    match NativePath::new(path).and_then(|path| sys::opendir(&path)) {
        Ok(dir) => {
            handle.install(dir);
            0
        }
        Err(code) => code,
    }
}

/// Read the next batch of entries into `entries`
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `entries` is borrowed.
pub fn readdir(slot: &RequestSlot, handle: &DirHandle, entries: &HostBuffer) -> Result<()> {
    let ticket = slot.reserve(OpKind::Readdir)?;
    let dst = entries.take()?;
    let dir = handle.take();
    let borrowed = Borrowed::DirEntries(handle.clone(), entries.clone());
    ticket.launch(Some(borrowed), async move {
        let max = dirent_capacity(dst.len());
        let (result, read, dir) = match dir {
            None => (-libc::EBADF, Vec::new(), None),
            Some(dir) if max == 0 => (-libc::EINVAL, Vec::new(), Some(dir)),
            Some(dir) => match submit::readdir(dir, max).await {
                (Ok(read), dir) => (entry_count(&read), read, Some(dir)),
                (Err(code), dir) => (code, Vec::new(), Some(dir)),
            },
        };
        (result, Completion::Entries(read, dir, dst))
    });
    Ok(())
}

#[must_use]
pub fn readdir_sync(handle: &DirHandle, dst: &mut [u8]) -> i32 {
    let max = dirent_capacity(dst.len());
    handle.with_stream(|dir: Option<&mut NativeDir>| {
        let Some(dir) = dir else {
            return -libc::EBADF;
        };
        if max == 0 {
            return -libc::EINVAL;
        }
        match sys::readdir(dir, max) {
            Ok(read) => {
                let result = entry_count(&read);
                decode(result, Payload::Entries(&read), dst);
                result
            }
            Err(code) => code,
        }
    })
}

/// Close the stream held by `handle`
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn closedir(slot: &RequestSlot, handle: &DirHandle) -> Result<()> {
    let ticket = slot.reserve(OpKind::Closedir)?;
    let dir = handle.take();
    ticket.launch(None, async move {
        let result = match dir {
            Some(dir) => submit::closedir(dir).await,
            None => -libc::EBADF,
        };
        (result, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn closedir_sync(handle: &DirHandle) -> i32 {
    handle.take().map_or(-libc::EBADF, sys::closedir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirentRecord, SIZEOF_DIRENT};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sync_directory_stream() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(temp_dir.path().join(name), name).unwrap();
        }

        let handle = DirHandle::new();
        assert_eq!(opendir_sync(temp_dir.path(), &handle), 0);

        let mut dst = vec![0u8; SIZEOF_DIRENT * 8];
        assert_eq!(readdir_sync(&handle, &mut dst), 3);
        let mut names: Vec<_> = DirentRecord::decode_all(&dst, 3)
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        names.sort();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        assert_eq!(readdir_sync(&handle, &mut dst), 0);
        assert_eq!(closedir_sync(&handle), 0);
        assert_eq!(closedir_sync(&handle), -libc::EBADF);
    }

    #[test]
    fn test_batches_bounded_by_buffer() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(temp_dir.path().join(format!("f{i}")), "").unwrap();
        }

        let handle = DirHandle::new();
        assert_eq!(opendir_sync(temp_dir.path(), &handle), 0);
        let mut dst = vec![0u8; SIZEOF_DIRENT * 2];
        assert_eq!(readdir_sync(&handle, &mut dst), 2);
        assert_eq!(readdir_sync(&handle, &mut dst), 2);
        assert_eq!(readdir_sync(&handle, &mut dst), 1);
        assert_eq!(readdir_sync(&handle, &mut dst), 0);
        assert_eq!(closedir_sync(&handle), 0);
    }

    #[test]
    fn test_readdir_argument_errors() {
        let temp_dir = TempDir::new().unwrap();
        let handle = DirHandle::new();
        let mut dst = vec![0u8; SIZEOF_DIRENT];
        assert_eq!(readdir_sync(&handle, &mut dst), -libc::EBADF);

        assert_eq!(opendir_sync(temp_dir.path(), &handle), 0);
        let mut tiny = vec![0u8; SIZEOF_DIRENT - 1];
        assert_eq!(readdir_sync(&handle, &mut tiny), -libc::EINVAL);
        assert!(handle.is_open());
    }

    #[test]
    fn test_opendir_missing() {
        let temp_dir = TempDir::new().unwrap();
        let handle = DirHandle::new();
        assert_eq!(
            opendir_sync(&temp_dir.path().join("missing"), &handle),
            -libc::ENOENT
        );
        assert!(!handle.is_open());
    }
}
