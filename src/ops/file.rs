//! Descriptor operations: open, close, read(v), write(v), ftruncate

use crate::buffer::HostBuffer;
use crate::error::Result;
use crate::router::Completion;
use crate::slot::{Borrowed, OpKind, RequestSlot};
use compio_fs_native::{submit, sys, NativePath};
use std::path::Path;

/// Open `path`; the result code is the new descriptor
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn open(slot: &RequestSlot, path: &Path, flags: i32, mode: u32) -> Result<()> {
    let ticket = slot.reserve(OpKind::Open)?;
    let path = NativePath::new(path);
    ticket.launch(None, async move {
        let result = match path {
            Ok(path) => submit::open(path, flags, mode).await,
            Err(code) => code,
        };
        (result, Completion::Code)
    });
    Ok(())
}

/// Open `path`, returning the descriptor or `-errno`
#[must_use]
pub fn open_sync(path: &Path, flags: i32, mode: u32) -> i32 {
    match NativePath::new(path) {
        Ok(path) => sys::open(&path, flags, mode),
        Err(code) => code,
    }
}

/// Close a descriptor
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn close(slot: &RequestSlot, fd: i32) -> Result<()> {
    let ticket = slot.reserve(OpKind::Close)?;
    ticket.launch(None, async move { (submit::close(fd).await, Completion::Code) });
    Ok(())
}

#[must_use]
pub fn close_sync(fd: i32) -> i32 {
    sys::close(fd)
}

/// Read into `buffer[offset..offset + len]` from file position `pos`
///
/// A negative `pos` reads at the current file position. The result code is
/// the number of bytes read.
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn read(
    slot: &RequestSlot,
    fd: i32,
    buffer: &HostBuffer,
    offset: usize,
    len: usize,
    pos: i64,
) -> Result<()> {
    let ticket = slot.reserve(OpKind::Read)?;
    let data = buffer.take()?;
    ticket.launch(Some(Borrowed::Buffer(buffer.clone())), async move {
        let (result, data) = submit::read(fd, data, offset, len, pos).await;
        (result, Completion::Transfer(data))
    });
    Ok(())
}

#[must_use]
pub fn read_sync(fd: i32, buffer: &mut [u8], offset: usize, len: usize, pos: i64) -> i32 {
    sys::read(fd, buffer, offset, len, pos)
}

/// Write `buffer[offset..offset + len]` at file position `pos`
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or `buffer` is borrowed.
pub fn write(
    slot: &RequestSlot,
    fd: i32,
    buffer: &HostBuffer,
    offset: usize,
    len: usize,
    pos: i64,
) -> Result<()> {
    let ticket = slot.reserve(OpKind::Write)?;
    let data = buffer.take()?;
    ticket.launch(Some(Borrowed::Buffer(buffer.clone())), async move {
        let (result, data) = submit::write(fd, data, offset, len, pos).await;
        (result, Completion::Transfer(data))
    });
    Ok(())
}

#[must_use]
pub fn write_sync(fd: i32, buffer: &[u8], offset: usize, len: usize, pos: i64) -> i32 {
    sys::write(fd, buffer, offset, len, pos)
}

/// Vectored read filling `buffers` in order
///
/// Every buffer stays lent to the operation until it completes.
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or any buffer is borrowed
/// (including the same buffer appearing twice).
pub fn readv(slot: &RequestSlot, fd: i32, buffers: &[HostBuffer], pos: i64) -> Result<()> {
    let ticket = slot.reserve(OpKind::Readv)?;
    let data = HostBuffer::take_all(buffers)?;
    ticket.launch(Some(Borrowed::Buffers(buffers.to_vec())), async move {
        let (result, data) = submit::readv(fd, data, pos).await;
        (result, Completion::Vectored(data))
    });
    Ok(())
}

#[must_use]
pub fn readv_sync<B: AsMut<[u8]>>(fd: i32, buffers: &mut [B], pos: i64) -> i32 {
    sys::readv(fd, buffers, pos)
}

/// Vectored write draining `buffers` in order
///
/// # Errors
///
/// Fails if the slot cannot take an operation now or any buffer is borrowed.
pub fn writev(slot: &RequestSlot, fd: i32, buffers: &[HostBuffer], pos: i64) -> Result<()> {
    let ticket = slot.reserve(OpKind::Writev)?;
    let data = HostBuffer::take_all(buffers)?;
    ticket.launch(Some(Borrowed::Buffers(buffers.to_vec())), async move {
        let (result, data) = submit::writev(fd, data, pos).await;
        (result, Completion::Vectored(data))
    });
    Ok(())
}

#[must_use]
pub fn writev_sync<B: AsRef<[u8]>>(fd: i32, buffers: &[B], pos: i64) -> i32 {
    sys::writev(fd, buffers, pos)
}

/// Truncate or extend an open file to `len` bytes
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn ftruncate(slot: &RequestSlot, fd: i32, len: i64) -> Result<()> {
    let ticket = slot.reserve(OpKind::Ftruncate)?;
    ticket.launch(None, async move {
        (submit::ftruncate(fd, len).await, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn ftruncate_sync(fd: i32, len: i64) -> i32 {
    sys::ftruncate(fd, len)
}
