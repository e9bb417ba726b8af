//! Per-thread completion context
//!
//! A [`Context`] owns the two durable references every completion needs: the
//! dispatch target and the completion handler. It is created with
//! [`Context::init`], shared by every [`crate::RequestSlot`] bound to it, and
//! released with [`Context::destroy`]. Nothing about it is global; callers
//! own it explicitly and create one per runtime thread.

use crate::error::{BridgeError, Result};
use crate::stats::{BridgeStats, StatsSnapshot};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{span::EnteredSpan, trace, warn};

type Handler = dyn Fn(&dyn Any, u32, i32) -> anyhow::Result<()>;

struct DurableRefs {
    target: Rc<dyn Any>,
    on_response: Rc<Handler>,
}

#[repr(C)]
pub(crate) struct ContextRecord {
    refs: RefCell<Option<DurableRefs>>,
    stats: BridgeStats,
}

/// Completion routing for one runtime thread
pub struct Context {
    record: Rc<ContextRecord>,
}

impl Context {
    /// Create a context from a dispatch target and a completion handler
    ///
    /// The handler receives the target, the correlation id stamped on the
    /// slot and the result code. An `Err` from the handler is logged and
    /// counted, never retried.
    pub fn init<T, F>(target: T, on_response: F) -> Self
    where
        T: 'static,
        F: Fn(&T, u32, i32) -> anyhow::Result<()> + 'static,
    {
        let on_response = move |target: &dyn Any, id: u32, result: i32| {
            match target.downcast_ref::<T>() {
                Some(target) => on_response(target, id, result),
                None => Err(anyhow::anyhow!("dispatch target type mismatch")),
            }
        };
        Self {
            record: Rc::new(ContextRecord {
                refs: RefCell::new(Some(DurableRefs {
                    target: Rc::new(target),
                    on_response: Rc::new(on_response),
                })),
                stats: BridgeStats::default(),
            }),
        }
    }

    /// Release the dispatch target and handler
    ///
    /// Completions still in flight are dropped when they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextDestroyed`] if already destroyed.
    pub fn destroy(&self) -> Result<()> {
        let refs = self.record.refs.borrow_mut().take();
        match refs {
            Some(refs) => {
                drop(refs);
                Ok(())
            }
            None => Err(BridgeError::ContextDestroyed),
        }
    }

    /// Whether [`Context::destroy`] has not been called yet
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.record.refs.borrow().is_some()
    }

    /// Counters for this context
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.record.stats.snapshot()
    }

    pub(crate) fn share(&self) -> Self {
        Self {
            record: Rc::clone(&self.record),
        }
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }

    pub(crate) fn counters(&self) -> &BridgeStats {
        &self.record.stats
    }

    /// Invoke the handler for one completion inside a dispatch scope
    pub(crate) fn dispatch(&self, id: u32, result: i32) {
        let refs = self
            .record
            .refs
            .borrow()
            .as_ref()
            .map(|refs| (Rc::clone(&refs.target), Rc::clone(&refs.on_response)));

        let Some((target, on_response)) = refs else {
            warn!(id, result, "completion after context destroy dropped");
            self.record.stats.record_dropped();
            return;
        };

        let _scope = DispatchScope::enter(&self.record.stats, id, result);
        if let Err(e) = on_response(&*target, id, result) {
            warn!(id, result, "completion handler failed: {e:#}");
            self.record.stats.record_handler_failure();
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("live", &self.is_live())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Bounded scope around one handler invocation
///
/// Entered before the handler runs and closed on drop, so it closes on every
/// exit path including unwinding out of the handler.
pub(crate) struct DispatchScope<'a> {
    stats: &'a BridgeStats,
    _span: EnteredSpan,
}

impl<'a> DispatchScope<'a> {
    fn enter(stats: &'a BridgeStats, id: u32, result: i32) -> Self {
        stats.scope_opened();
        let span = tracing::debug_span!("fs_response", id, result).entered();
        trace!("dispatch scope opened");
        Self { stats, _span: span }
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        trace!("dispatch scope closed");
        self.stats.scope_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_dispatch_reaches_handler() {
        let seen = Rc::new(Cell::new(None::<(u32, i32)>));
        let ctx = Context::init(Rc::clone(&seen), |seen, id, result| {
            seen.set(Some((id, result)));
            Ok(())
        });

        ctx.dispatch(9, -2);
        assert_eq!(seen.get(), Some((9, -2)));
        assert_eq!(ctx.stats().open_scopes, 0);
    }

    #[test]
    fn test_handler_failure_is_counted() {
        let ctx = Context::init((), |(), _, _| anyhow::bail!("host threw"));
        ctx.dispatch(1, 0);
        ctx.dispatch(2, 0);

        let stats = ctx.stats();
        assert_eq!(stats.handler_failures, 2);
        assert_eq!(stats.open_scopes, 0);
    }

    #[test]
    fn test_destroy_once() {
        let ctx = Context::init((), |(), _, _| Ok(()));
        assert!(ctx.is_live());
        ctx.destroy().unwrap();
        assert!(!ctx.is_live());
        assert_eq!(ctx.destroy(), Err(BridgeError::ContextDestroyed));
    }

    #[test]
    fn test_destroy_releases_target() {
        let target = Rc::new(());
        let ctx = Context::init(Rc::clone(&target), |_, _, _| Ok(()));
        assert_eq!(Rc::strong_count(&target), 2);
        ctx.destroy().unwrap();
        assert_eq!(Rc::strong_count(&target), 1);
    }

    #[test]
    fn test_completion_after_destroy_is_dropped() {
        let calls = Rc::new(Cell::new(0));
        let ctx = Context::init(Rc::clone(&calls), |calls, _, _| {
            calls.set(calls.get() + 1);
            Ok(())
        });
        ctx.destroy().unwrap();
        ctx.dispatch(1, 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(ctx.stats().dropped, 1);
    }
}
