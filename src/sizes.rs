//! Sizing introspection
//!
//! Byte sizes of the bridge's records and the offset of the correlation id
//! inside a request slot, for hosts that allocate matching storage.

use crate::context::ContextRecord;
use crate::slot::SlotRecord;
use std::mem::offset_of;

pub use crate::layout::{SIZEOF_DIRENT, SIZEOF_PATH, SIZEOF_STAT};

/// Bytes in a context record
pub const SIZEOF_CONTEXT: usize = size_of::<ContextRecord>();
/// Bytes in a request slot record
pub const SIZEOF_REQUEST: usize = size_of::<SlotRecord>();
/// Offset of the correlation id within a request slot record
pub const OFFSETOF_REQUEST_ID: usize = offset_of!(SlotRecord, id);
/// Bytes in a directory handle record: one native stream address
pub const SIZEOF_DIR: usize = size_of::<usize>();
