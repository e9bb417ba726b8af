//! Request slots
//!
//! A [`RequestSlot`] is allocated by the caller, bound to a [`Context`] once
//! and then reused for one operation at a time. Submitting stamps the slot
//! with the operation kind and the caller buffers the operation borrows;
//! completion clears both before the handler runs, so the handler may submit
//! again on the same slot.
//!
//! # Lifecycle
//!
//! 1. [`RequestSlot::new`] gives an unbound slot with id 0.
//! 2. [`RequestSlot::bind`] attaches it to a live context. Rebinding to
//!    another context is allowed while nothing is in flight.
//! 3. An op in [`crate::ops`] reserves the slot, which fails with
//!    [`BridgeError::SlotBusy`] if another operation is still pending.
//! 4. The router settles the result, clears the slot and then calls the
//!    context's handler with `(id, result)`.
//!
//! # Ownership
//!
//! The record behind a slot is reference counted. The in-flight future holds
//! its own handle, so dropping the caller's [`RequestSlot`] mid-operation does
//! not free the record before the completion is routed. Buffers and directory
//! handles the operation uses are held in the record until then.
//!
//! # Thread Safety
//!
//! Slots are `!Send`. They belong to the runtime thread of their context.

use crate::buffer::HostBuffer;
use crate::context::Context;
use crate::dir::DirHandle;
use crate::error::{BridgeError, Result};
use crate::router::{self, Completion};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

/// Operation carried by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `open(path, flags, mode)`; result is the new descriptor
    Open,
    /// `close(fd)`
    Close,
    /// Positioned read into one buffer window
    Read,
    /// Positioned read scattered across several buffers
    Readv,
    /// Positioned write from one buffer window
    Write,
    /// Positioned write gathered from several buffers
    Writev,
    /// Resize an open file
    Ftruncate,
    /// Move a path within one filesystem
    Rename,
    /// Create one directory
    Mkdir,
    /// Remove an empty directory
    Rmdir,
    /// Remove a non-directory path
    Unlink,
    /// Stat record for a path, following symlinks
    Stat,
    /// Stat record for a path itself
    Lstat,
    /// Stat record for an open descriptor
    Fstat,
    /// Symlink target into a path buffer
    Readlink,
    /// Open a directory stream into a [`DirHandle`]
    Opendir,
    /// Next batch of directory entry records
    Readdir,
    /// Close a directory stream
    Closedir,
}

impl OpKind {
    /// Lowercase operation name used in logs and errors
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Read => "read",
            Self::Readv => "readv",
            Self::Write => "write",
            Self::Writev => "writev",
            Self::Ftruncate => "ftruncate",
            Self::Rename => "rename",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
            Self::Unlink => "unlink",
            Self::Stat => "stat",
            Self::Lstat => "lstat",
            Self::Fstat => "fstat",
            Self::Readlink => "readlink",
            Self::Opendir => "opendir",
            Self::Readdir => "readdir",
            Self::Closedir => "closedir",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller objects an in-flight operation keeps alive
#[derive(Debug)]
pub(crate) enum Borrowed {
    /// Destination or source of a single-buffer op
    Buffer(HostBuffer),
    /// Vectored read or write
    Buffers(Vec<HostBuffer>),
    /// Handle an `opendir` installs its stream into
    Dir(DirHandle),
    /// `readdir` stream and its record buffer
    DirEntries(DirHandle, HostBuffer),
}

#[repr(C)]
pub(crate) struct SlotRecord {
    /// Correlation id passed to the handler
    pub(crate) id: Cell<u32>,
    /// Set while an operation is in flight
    kind: Cell<Option<OpKind>>,
    /// Bound context, `None` until [`RequestSlot::bind`]
    context: RefCell<Option<Context>>,
    /// Caller objects the in-flight operation uses
    borrowed: RefCell<Option<Borrowed>>,
}

impl SlotRecord {
    /// Clear the in-flight state, handing back what the operation borrowed
    pub(crate) fn finish(&self) -> (Option<OpKind>, Option<Borrowed>) {
        (self.kind.take(), self.borrowed.borrow_mut().take())
    }

    pub(crate) fn id(&self) -> u32 {
        self.id.get()
    }
}

/// Reusable record correlating one in-flight operation with its completion
pub struct RequestSlot {
    record: Rc<SlotRecord>,
}

impl RequestSlot {
    /// Unbound slot with correlation id 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: Rc::new(SlotRecord {
                id: Cell::new(0),
                kind: Cell::new(None),
                context: RefCell::new(None),
                borrowed: RefCell::new(None),
            }),
        }
    }

    /// Associate the slot with a context
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SlotBusy`] while an operation is in flight and
    /// [`BridgeError::ContextDestroyed`] for a destroyed context.
    pub fn bind(&self, ctx: &Context) -> Result<()> {
        self.ensure_idle()?;
        if !ctx.is_live() {
            return Err(BridgeError::ContextDestroyed);
        }
        *self.record.context.borrow_mut() = Some(ctx.share());
        Ok(())
    }

    /// Whether the slot is bound to `ctx`
    #[must_use]
    pub fn is_bound_to(&self, ctx: &Context) -> bool {
        self.record
            .context
            .borrow()
            .as_ref()
            .is_some_and(|bound| bound.same_as(ctx))
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.record.context.borrow().is_some()
    }

    /// Correlation id echoed back on completion
    #[must_use]
    pub fn id(&self) -> u32 {
        self.record.id()
    }

    /// Set the correlation id for the next submission
    pub fn set_id(&self, id: u32) {
        self.record.id.set(id);
    }

    /// Operation currently in flight on this slot
    #[must_use]
    pub fn in_flight(&self) -> Option<OpKind> {
        self.record.kind.get()
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.record.kind.get() {
            Some(kind) => Err(BridgeError::SlotBusy {
                id: self.id(),
                kind,
            }),
            None => Ok(()),
        }
    }

    /// Check the slot can take `kind` now
    ///
    /// Nothing is stamped until [`Ticket::launch`]; dropping the ticket leaves
    /// the slot untouched.
    pub(crate) fn reserve(&self, kind: OpKind) -> Result<Ticket> {
        self.ensure_idle()?;
        let context = self
            .record
            .context
            .borrow()
            .as_ref()
            .map(Context::share)
            .ok_or(BridgeError::SlotUnbound)?;
        if !context.is_live() {
            return Err(BridgeError::ContextDestroyed);
        }
        Ok(Ticket {
            record: Rc::clone(&self.record),
            context,
            kind,
        })
    }
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSlot")
            .field("id", &self.id())
            .field("in_flight", &self.in_flight())
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// A validated, not yet stamped submission
pub(crate) struct Ticket {
    record: Rc<SlotRecord>,
    context: Context,
    kind: OpKind,
}

impl Ticket {
    /// Stamp the slot and run `op` to completion on the current runtime
    ///
    /// The router runs at the tail of the spawned task, on the runtime
    /// thread.
    pub(crate) fn launch<F>(self, borrowed: Option<Borrowed>, op: F)
    where
        F: Future<Output = (i32, Completion)> + 'static,
    {
        let Self {
            record,
            context,
            kind,
        } = self;

        record.kind.set(Some(kind));
        *record.borrowed.borrow_mut() = borrowed;
        context.counters().record_submit();
        debug!(id = record.id(), op = %kind, "submit");

        compio::runtime::spawn(async move {
            let (result, completion) = op.await;
            router::complete(&record, &context, result, completion);
        })
        .detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_slot_is_rejected() {
        let slot = RequestSlot::new();
        assert!(matches!(
            slot.reserve(OpKind::Open),
            Err(BridgeError::SlotUnbound)
        ));
    }

    #[test]
    fn test_bind_and_rebind() {
        let a = Context::init((), |(), _, _| Ok(()));
        let b = Context::init((), |(), _, _| Ok(()));
        let slot = RequestSlot::new();

        slot.bind(&a).unwrap();
        assert!(slot.is_bound_to(&a));
        slot.bind(&b).unwrap();
        assert!(slot.is_bound_to(&b));
        assert!(!slot.is_bound_to(&a));
    }

    #[test]
    fn test_destroyed_context_is_rejected() {
        let ctx = Context::init((), |(), _, _| Ok(()));
        let slot = RequestSlot::new();
        slot.bind(&ctx).unwrap();
        ctx.destroy().unwrap();

        assert!(matches!(
            slot.reserve(OpKind::Stat),
            Err(BridgeError::ContextDestroyed)
        ));
        assert_eq!(slot.bind(&ctx), Err(BridgeError::ContextDestroyed));
    }

    #[test]
    fn test_reserve_does_not_stamp() {
        let ctx = Context::init((), |(), _, _| Ok(()));
        let slot = RequestSlot::new();
        slot.bind(&ctx).unwrap();

        let ticket = slot.reserve(OpKind::Mkdir).unwrap();
        drop(ticket);
        assert_eq!(slot.in_flight(), None);
        assert_eq!(ctx.stats().submitted, 0);
    }

    #[test]
    fn test_op_names() {
        assert_eq!(OpKind::Readdir.to_string(), "readdir");
        assert_eq!(OpKind::Ftruncate.as_str(), "ftruncate");
    }
}
