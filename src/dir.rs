//! Directory stream handle
//!
//! [`DirHandle`] is a caller-owned cell around one native directory stream.
//! `opendir` fills it, `readdir` borrows the stream for one call and
//! `closedir` empties it. While a readdir is in flight the stream is owned by
//! the operation and the handle reads as closed.

use crate::layout;
use compio_fs_native::NativeDir;
use std::cell::RefCell;
use std::rc::Rc;

/// Caller-owned directory stream
///
/// Cloning shares the same stream. Dropping the last clone of an open handle
/// closes the stream.
#[derive(Debug, Clone, Default)]
pub struct DirHandle(Rc<RefCell<Option<NativeDir>>>);

impl DirHandle {
    /// Empty handle, ready for `opendir`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stream is installed
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Native stream address, 0 when closed
    #[must_use]
    pub fn address(&self) -> usize {
        self.0.borrow().as_ref().map_or(0, NativeDir::address)
    }

    /// Raw address bytes, as recorded in a handle buffer of
    /// [`crate::sizes::SIZEOF_DIR`] bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; size_of::<usize>()] {
        layout::encode_dir_address(self.address())
    }

    /// Move the stream out
    pub(crate) fn take(&self) -> Option<NativeDir> {
        self.0.borrow_mut().take()
    }

    /// Install a stream; a stream already present is closed
    pub(crate) fn install(&self, dir: NativeDir) {
        let previous = self.0.borrow_mut().replace(dir);
        drop(previous);
    }

    /// Run `f` against the installed stream
    pub(crate) fn with_stream<R>(&self, f: impl FnOnce(Option<&mut NativeDir>) -> R) -> R {
        f(self.0.borrow_mut().as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compio_fs_native::NativePath;
    use tempfile::TempDir;

    #[test]
    fn test_handle_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let handle = DirHandle::new();
        assert!(!handle.is_open());
        assert_eq!(handle.to_bytes(), [0u8; size_of::<usize>()]);

        let dir = NativeDir::open(&NativePath::new(temp_dir.path()).unwrap()).unwrap();
        let address = dir.address();
        handle.install(dir);
        assert!(handle.is_open());
        assert_eq!(handle.address(), address);
        assert_eq!(handle.to_bytes(), address.to_ne_bytes());

        let dir = handle.take().unwrap();
        assert!(!handle.is_open());
        assert_eq!(dir.close(), 0);
    }
}
