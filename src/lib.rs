//! # fsbridge
//!
//! Asynchronous filesystem operation bridge over io_uring.
//!
//! A caller creates one [`Context`] per runtime thread, holding a dispatch
//! target and a single completion handler. Reusable [`RequestSlot`]s are bound
//! to that context once and then carry one in-flight operation at a time.
//! Every completion funnels through the context's router, which decodes the
//! operation-specific payload into the caller's buffer (stat records, symlink
//! targets, directory entries) and then calls the handler with
//! `(correlation id, result code)`.
//!
//! Each operation also has a synchronous form that blocks the calling thread,
//! decodes with the same fixed-layout encoders and returns the result code
//! directly.
//!
//! Result codes follow the kernel: non-negative on success, `-errno` on
//! failure. Nothing is retried or translated.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fsbridge::{ops, Context, HostBuffer, RequestSlot, StatRecord};
//! use std::path::Path;
//!
//! # #[compio::main]
//! # async fn main() -> fsbridge::Result<()> {
//! let ctx = Context::init((), |_, id, result| {
//!     println!("request {id} finished with {result}");
//!     Ok(())
//! });
//!
//! let slot = RequestSlot::new();
//! slot.bind(&ctx)?;
//! slot.set_id(7);
//!
//! let buf = HostBuffer::zeroed(fsbridge::layout::SIZEOF_STAT);
//! ops::stat(&slot, Path::new("Cargo.toml"), &buf)?;
//!
//! // Synchronous form, same layout
//! let mut sync_buf = [0u8; fsbridge::layout::SIZEOF_STAT];
//! if ops::stat_sync(Path::new("Cargo.toml"), &mut sync_buf) == 0 {
//!     let record = StatRecord::decode(&sync_buf).unwrap();
//!     println!("size = {}", record.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod cli;
pub mod constants;
pub mod context;
pub mod dir;
pub mod error;
pub mod layout;
pub mod ops;
pub mod pool;
pub mod router;
pub mod runner;
pub mod sizes;
pub mod slot;
pub mod stats;

// Re-export main types
pub use buffer::HostBuffer;
pub use context::Context;
pub use dir::DirHandle;
pub use error::{BridgeError, FsError, Result};
pub use layout::{DirentRecord, StatRecord};
pub use pool::{ReleaseRefused, SlotPool};
pub use slot::{OpKind, RequestSlot};
pub use stats::StatsSnapshot;

pub use compio_fs_native::DirentKind;
