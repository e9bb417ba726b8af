//! Caller-visible byte buffers
//!
//! A [`HostBuffer`] is shared between the caller and the bridge. While an
//! async operation is in flight the bridge has taken the bytes out of it (the
//! io_uring op owns them), so the buffer reads as empty and cannot be lent to
//! a second operation. The router puts the bytes back at completion, before
//! the completion handler runs.
//!
//! If the caller still holds a [`HostBuffer::borrow`] guard when the
//! operation completes, the returned bytes are parked and installed on the
//! next access after that guard is dropped. The buffer keeps reporting
//! [`HostBuffer::is_lent`] until then, so a completed operation's bytes are
//! never lost.

use crate::error::{BridgeError, Result};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Default)]
struct BufferCell {
    /// Contents visible to the caller; empty while lent
    data: RefCell<Vec<u8>>,
    /// Bytes returned by a completion while `data` was borrowed
    parked: RefCell<Option<Vec<u8>>>,
    /// Set from take until the bytes are back in `data`
    lent: Cell<bool>,
}

/// Shared byte buffer handed to async operations
///
/// Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct HostBuffer(Rc<BufferCell>);

impl HostBuffer {
    /// Zero-filled buffer of `len` bytes
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::from(vec![0u8; len])
    }

    /// Current length; 0 while lent to an operation
    #[must_use]
    pub fn len(&self) -> usize {
        self.install_parked();
        self.0.data.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the bytes are not back in the buffer yet
    ///
    /// True while an operation owns them, and after completion for as long
    /// as an older borrow keeps them parked.
    #[must_use]
    pub fn is_lent(&self) -> bool {
        self.install_parked();
        self.0.lent.get()
    }

    /// Copy of the contents
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.install_parked();
        self.0.data.borrow().clone()
    }

    /// Borrow the contents
    ///
    /// # Panics
    ///
    /// Panics if the contents are mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Vec<u8>> {
        self.install_parked();
        self.0.data.borrow()
    }

    /// Mutably borrow the contents
    ///
    /// Holding this borrow across a submit makes the submit fail with
    /// [`BridgeError::BufferBorrowed`].
    ///
    /// # Panics
    ///
    /// Panics if the contents are already borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Vec<u8>> {
        self.install_parked();
        self.0.data.borrow_mut()
    }

    /// Whether two handles share storage
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Take the bytes for an operation
    pub(crate) fn take(&self) -> Result<Vec<u8>> {
        self.install_parked();
        if self.0.lent.get() {
            return Err(BridgeError::BufferBorrowed);
        }
        let mut data = self
            .0
            .data
            .try_borrow_mut()
            .map_err(|_| BridgeError::BufferBorrowed)?;
        self.0.lent.set(true);
        Ok(std::mem::take(&mut *data))
    }

    /// Take the bytes of every buffer, or none of them
    pub(crate) fn take_all(buffers: &[Self]) -> Result<Vec<Vec<u8>>> {
        let mut taken = Vec::with_capacity(buffers.len());
        for buffer in buffers {
            match buffer.take() {
                Ok(data) => taken.push(data),
                Err(e) => {
                    for (buffer, data) in buffers.iter().zip(taken) {
                        buffer.restore(data);
                    }
                    return Err(e);
                }
            }
        }
        Ok(taken)
    }

    /// Put the bytes back after completion
    ///
    /// Parks them if the caller still holds a borrow.
    pub(crate) fn restore(&self, data: Vec<u8>) {
        match self.0.data.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = data;
                self.0.lent.set(false);
            }
            Err(_) => {
                debug!(len = data.len(), "host buffer borrowed at completion, parking");
                *self.0.parked.borrow_mut() = Some(data);
            }
        }
    }

    /// Move parked bytes into the buffer once no borrow is outstanding
    fn install_parked(&self) {
        let Some(data) = self.0.parked.borrow_mut().take() else {
            return;
        };
        match self.0.data.try_borrow_mut() {
            Ok(mut slot) => {
                *slot = data;
                self.0.lent.set(false);
            }
            Err(_) => *self.0.parked.borrow_mut() = Some(data),
        }
    }
}

impl From<Vec<u8>> for HostBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self(Rc::new(BufferCell {
            data: RefCell::new(data),
            parked: RefCell::new(None),
            lent: Cell::new(false),
        }))
    }
}

impl From<&[u8]> for HostBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_and_restore() {
        let buffer = HostBuffer::from(&b"abc"[..]);
        let data = buffer.take().unwrap();
        assert_eq!(data, b"abc");
        assert!(buffer.is_lent());
        assert!(buffer.is_empty());

        buffer.restore(data);
        assert!(!buffer.is_lent());
        assert_eq!(buffer.to_vec(), b"abc");
    }

    #[test]
    fn test_double_take_is_rejected() {
        let buffer = HostBuffer::zeroed(4);
        let _data = buffer.take().unwrap();
        assert_eq!(buffer.take(), Err(BridgeError::BufferBorrowed));
    }

    #[test]
    fn test_borrowed_buffer_cannot_be_taken() {
        let buffer = HostBuffer::zeroed(4);
        let guard = buffer.borrow();
        assert_eq!(buffer.take(), Err(BridgeError::BufferBorrowed));
        drop(guard);
        assert!(buffer.take().is_ok());
    }

    #[test]
    fn test_take_all_rolls_back() {
        let a = HostBuffer::from(&b"a"[..]);
        let b = HostBuffer::from(&b"b"[..]);
        // the same buffer twice cannot be lent twice
        let err = HostBuffer::take_all(&[a.clone(), b.clone(), a.clone()]).unwrap_err();
        assert_eq!(err, BridgeError::BufferBorrowed);
        assert!(!a.is_lent());
        assert!(!b.is_lent());
        assert_eq!(a.to_vec(), b"a");
        assert_eq!(b.to_vec(), b"b");
    }

    #[test]
    fn test_completion_during_borrow_is_parked() {
        let buffer = HostBuffer::zeroed(4);
        let data = buffer.take().unwrap();
        let guard = buffer.borrow();

        buffer.restore(b"done".to_vec());
        assert!(guard.is_empty(), "outstanding borrow still sees the lent state");
        drop(guard);

        assert!(!buffer.is_lent());
        assert_eq!(buffer.to_vec(), b"done");
        drop(data);
    }

    #[test]
    fn test_parked_bytes_block_a_new_take_until_installed() {
        let buffer = HostBuffer::zeroed(2);
        let _data = buffer.take().unwrap();
        {
            let _guard = buffer.borrow();
            buffer.restore(b"ok".to_vec());
            assert_eq!(buffer.take(), Err(BridgeError::BufferBorrowed));
        }
        assert_eq!(buffer.take().unwrap(), b"ok");
    }
}
