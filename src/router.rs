//! Completion routing
//!
//! Every async operation ends in [`complete`]: the slot's in-flight state is
//! cleared, the operation payload is decoded into the caller's buffer, the
//! borrowed buffers are handed back and released, and only then is the
//! context's handler invoked with `(id, result)`.
//!
//! [`decode`] is the one decoding core; the sync forms in [`crate::ops`] call
//! it too, so both forms write identical bytes.

use crate::context::Context;
use crate::layout;
use crate::slot::{Borrowed, SlotRecord};
use compio_fs_native::{NativeDir, NativeStat, RawDirent};
use tracing::{debug, error};

/// Operation-specific payload awaiting decode
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    None,
    Stat(&'a NativeStat),
    LinkTarget(&'a [u8]),
    Entries(&'a [RawDirent]),
}

/// Decode `payload` into `dst` if `result` reports success
///
/// Success means `0`, or a positive entry count for directory entries. On
/// failure `dst` is left untouched.
pub fn decode(result: i32, payload: Payload<'_>, dst: &mut [u8]) {
    match payload {
        Payload::Stat(stat) if result == 0 => {
            layout::encode_stat(stat.raw(), dst);
        }
        Payload::LinkTarget(target) if result == 0 => layout::encode_link_target(target, dst),
        Payload::Entries(entries) if result > 0 => {
            layout::encode_dirents(entries, dst);
        }
        _ => {}
    }
}

/// What a finished operation hands back to the router
///
/// Byte buffers here are the contents taken out of the caller's
/// [`crate::HostBuffer`]s at submit time.
pub(crate) enum Completion {
    /// Result code only
    Code,
    /// read / write buffer
    Transfer(Vec<u8>),
    /// readv / writev buffers, in submit order
    Vectored(Vec<Vec<u8>>),
    /// statx buffer and the stat destination
    Stat(NativeStat, Vec<u8>),
    /// symlink target and the destination
    LinkTarget(Vec<u8>, Vec<u8>),
    /// opened stream, if any
    Opened(Option<NativeDir>),
    /// entries read, the stream to give back, and the entry destination
    Entries(Vec<RawDirent>, Option<NativeDir>, Vec<u8>),
}

/// Finish one async operation and notify the handler
pub(crate) fn complete(record: &SlotRecord, context: &Context, result: i32, completion: Completion) {
    let (kind, borrowed) = record.finish();
    settle(result, completion, borrowed);

    context.counters().record_completion(result);
    debug!(id = record.id(), op = ?kind, result, "completion");
    context.dispatch(record.id(), result);
}

/// Decode into and give back everything the operation borrowed
fn settle(result: i32, completion: Completion, borrowed: Option<Borrowed>) {
    match (completion, borrowed) {
        (Completion::Code, None) => {}
        (Completion::Transfer(data), Some(Borrowed::Buffer(buffer))) => buffer.restore(data),
        (Completion::Vectored(data), Some(Borrowed::Buffers(buffers))) => {
            for (buffer, data) in buffers.iter().zip(data) {
                buffer.restore(data);
            }
        }
        (Completion::Stat(stat, mut dst), Some(Borrowed::Buffer(buffer))) => {
            decode(result, Payload::Stat(&stat), &mut dst);
            buffer.restore(dst);
        }
        (Completion::LinkTarget(target, mut dst), Some(Borrowed::Buffer(buffer))) => {
            decode(result, Payload::LinkTarget(&target), &mut dst);
            buffer.restore(dst);
        }
        (Completion::Opened(dir), Some(Borrowed::Dir(handle))) => {
            if let Some(dir) = dir {
                handle.install(dir);
            }
        }
        (Completion::Entries(entries, dir, mut dst), Some(Borrowed::DirEntries(handle, buffer))) => {
            if let Some(dir) = dir {
                handle.install(dir);
            }
            decode(result, Payload::Entries(&entries), &mut dst);
            buffer.restore(dst);
        }
        (_, borrowed) => error!(?borrowed, "completion does not match the slot's borrowed state"),
    }
}
