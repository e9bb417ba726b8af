//! Request slot pool
//!
//! Callers that issue many operations keep a pool of bound slots instead of
//! allocating one per request. Slots are handed out from a free list and
//! allocated on demand when the list is empty.

use crate::context::Context;
use crate::error::{BridgeError, Result};
use crate::slot::RequestSlot;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use thiserror::Error;

/// A slot [`SlotPool::release`] would not take back
#[derive(Debug, Error)]
#[error("slot not returned to the pool: {error}")]
pub struct ReleaseRefused {
    /// The refused slot, still owned by the caller
    pub slot: RequestSlot,
    /// Why it was refused
    #[source]
    pub error: BridgeError,
}

/// Free list of slots bound to one context
#[derive(Debug)]
pub struct SlotPool {
    context: Context,
    available: RefCell<VecDeque<RequestSlot>>,
    stats: PoolStats,
}

#[derive(Debug, Default)]
struct PoolStats {
    total_allocated: Cell<usize>,
    current_in_use: Cell<usize>,
    peak_usage: Cell<usize>,
    total_acquisitions: Cell<usize>,
}

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Slots ever allocated
    pub total_allocated: usize,
    /// Slots handed out and not yet released
    pub current_in_use: usize,
    /// Highest simultaneous `current_in_use`
    pub peak_usage: usize,
    /// Calls to [`SlotPool::acquire`]
    pub total_acquisitions: usize,
}

impl SlotPool {
    /// Empty pool for `context`
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.share(),
            available: RefCell::new(VecDeque::new()),
            stats: PoolStats::default(),
        }
    }

    /// Pool with `count` slots bound up front
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextDestroyed`] for a destroyed context.
    pub fn with_capacity(context: &Context, count: usize) -> Result<Self> {
        let pool = Self::new(context);
        {
            let mut available = pool.available.borrow_mut();
            for _ in 0..count {
                available.push_back(pool.allocate()?);
            }
        }
        Ok(pool)
    }

    fn allocate(&self) -> Result<RequestSlot> {
        let slot = RequestSlot::new();
        slot.bind(&self.context)?;
        self.stats
            .total_allocated
            .set(self.stats.total_allocated.get() + 1);
        Ok(slot)
    }

    /// Hand out an idle slot bound to the pool's context
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextDestroyed`] once the context is gone.
    pub fn acquire(&self) -> Result<RequestSlot> {
        if !self.context.is_live() {
            return Err(BridgeError::ContextDestroyed);
        }
        self.stats
            .total_acquisitions
            .set(self.stats.total_acquisitions.get() + 1);

        let reused = self.available.borrow_mut().pop_front();
        let slot = match reused {
            Some(slot) => slot,
            None => self.allocate()?,
        };

        let in_use = self.stats.current_in_use.get() + 1;
        self.stats.current_in_use.set(in_use);
        self.stats
            .peak_usage
            .set(self.stats.peak_usage.get().max(in_use));
        Ok(slot)
    }

    /// Return a slot for reuse
    ///
    /// Counters only change once the slot is back in the free list.
    ///
    /// # Errors
    ///
    /// Refuses a slot that still has an operation in flight
    /// ([`BridgeError::SlotBusy`]) or cannot be rebound to the pool's context.
    /// The slot is handed back in [`ReleaseRefused`] and stays counted as in
    /// use; its operation still completes.
    pub fn release(&self, slot: RequestSlot) -> std::result::Result<(), ReleaseRefused> {
        if let Some(kind) = slot.in_flight() {
            let error = BridgeError::SlotBusy {
                id: slot.id(),
                kind,
            };
            return Err(ReleaseRefused { slot, error });
        }
        if !slot.is_bound_to(&self.context) {
            if let Err(error) = slot.bind(&self.context) {
                return Err(ReleaseRefused { slot, error });
            }
        }
        self.stats
            .current_in_use
            .set(self.stats.current_in_use.get().saturating_sub(1));
        self.available.borrow_mut().push_back(slot);
        Ok(())
    }

    /// Idle slots waiting in the pool
    #[must_use]
    pub fn idle(&self) -> usize {
        self.available.borrow().len()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            total_allocated: self.stats.total_allocated.get(),
            current_in_use: self.stats.current_in_use.get(),
            peak_usage: self.stats.peak_usage.get(),
            total_acquisitions: self.stats.total_acquisitions.get(),
        }
    }
}
