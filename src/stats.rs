//! Per-context counters
//!
//! # Architecture
//!
//! Every [`crate::Context`] owns one [`BridgeStats`]. The counters are bumped
//! at three points of an operation's life:
//!
//! - **submit**: a ticket is launched on a slot ([`BridgeStats::record_submit`])
//! - **completion**: the router settles the result code, before the handler
//!   runs ([`BridgeStats::record_completion`])
//! - **dispatch**: the handler runs inside a scope that is counted while open,
//!   and a handler `Err` is counted separately
//!
//! Completions that arrive after [`crate::Context::destroy`] are counted as
//! dropped and never reach a handler.
//!
//! # Thread Safety
//!
//! A context lives on the runtime thread that created it and is shared through
//! `Rc`, so the counters are plain [`Cell`]s. Callers read them through
//! [`crate::Context::stats`], which copies them into a [`StatsSnapshot`].

use std::cell::Cell;

/// Counters kept by each [`crate::Context`]
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Operations handed to the native substrate
    submitted: Cell<u64>,
    /// Completions routed (success or failure)
    completed: Cell<u64>,
    /// Completions with a negative result code
    failed: Cell<u64>,
    /// Handler invocations that returned `Err`
    handler_failures: Cell<u64>,
    /// Completions that arrived after the context was destroyed
    dropped: Cell<u64>,
    /// Dispatch scopes currently open
    open_scopes: Cell<u64>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get().saturating_add(1));
}

impl BridgeStats {
    pub(crate) fn record_submit(&self) {
        bump(&self.submitted);
    }

    pub(crate) fn record_completion(&self, result: i32) {
        bump(&self.completed);
        if result < 0 {
            bump(&self.failed);
        }
    }

    pub(crate) fn record_handler_failure(&self) {
        bump(&self.handler_failures);
    }

    pub(crate) fn record_dropped(&self) {
        bump(&self.dropped);
    }

    pub(crate) fn scope_opened(&self) {
        bump(&self.open_scopes);
    }

    pub(crate) fn scope_closed(&self) {
        self.open_scopes
            .set(self.open_scopes.get().saturating_sub(1));
    }

    /// Operations currently in flight
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.submitted.get().saturating_sub(self.completed.get())
    }

    /// Point-in-time copy of all counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.get(),
            completed: self.completed.get(),
            failed: self.failed.get(),
            handler_failures: self.handler_failures.get(),
            dropped: self.dropped.get(),
            open_scopes: self.open_scopes.get(),
        }
    }
}

/// Copy of a context's counters
///
/// `submitted - completed` is the number of operations still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Operations handed to the native substrate
    pub submitted: u64,
    /// Completions routed, including failures and dropped ones
    pub completed: u64,
    /// Completions whose result code was negative
    pub failed: u64,
    /// Handler calls that returned `Err`
    pub handler_failures: u64,
    /// Completions that found the context destroyed
    pub dropped: u64,
    /// Dispatch scopes open at the time of the snapshot
    pub open_scopes: u64,
}
