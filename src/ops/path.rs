//! Namespace operations: rename, mkdir, rmdir, unlink

use crate::error::Result;
use crate::router::Completion;
use crate::slot::{OpKind, RequestSlot};
use compio_fs_native::{submit, sys, NativePath};
use std::path::Path;

/// Rename `src` to `dst`
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn rename(slot: &RequestSlot, src: &Path, dst: &Path) -> Result<()> {
    let ticket = slot.reserve(OpKind::Rename)?;
    let paths = NativePath::new(src).and_then(|src| Ok((src, NativePath::new(dst)?)));
    ticket.launch(None, async move {
        let result = match paths {
            Ok((src, dst)) => submit::rename(src, dst).await,
            Err(code) => code,
        };
        (result, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn rename_sync(src: &Path, dst: &Path) -> i32 {
    match NativePath::new(src).and_then(|src| Ok((src, NativePath::new(dst)?))) {
        Ok((src, dst)) => sys::rename(&src, &dst),
        Err(code) => code,
    }
}

/// Create a directory with `mode` (before umask)
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn mkdir(slot: &RequestSlot, path: &Path, mode: u32) -> Result<()> {
    let ticket = slot.reserve(OpKind::Mkdir)?;
    let path = NativePath::new(path);
    ticket.launch(None, async move {
        let result = match path {
            Ok(path) => submit::mkdir(path, mode).await,
            Err(code) => code,
        };
        (result, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn mkdir_sync(path: &Path, mode: u32) -> i32 {
    match NativePath::new(path) {
        Ok(path) => sys::mkdir(&path, mode),
        Err(code) => code,
    }
}

/// Remove an empty directory
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn rmdir(slot: &RequestSlot, path: &Path) -> Result<()> {
    let ticket = slot.reserve(OpKind::Rmdir)?;
    let path = NativePath::new(path);
    ticket.launch(None, async move {
        let result = match path {
            Ok(path) => submit::rmdir(path).await,
            Err(code) => code,
        };
        (result, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn rmdir_sync(path: &Path) -> i32 {
    match NativePath::new(path) {
        Ok(path) => sys::rmdir(&path),
        Err(code) => code,
    }
}

/// Remove a file or symlink
///
/// # Errors
///
/// Fails if the slot cannot take an operation now.
pub fn unlink(slot: &RequestSlot, path: &Path) -> Result<()> {
    let ticket = slot.reserve(OpKind::Unlink)?;
    let path = NativePath::new(path);
    ticket.launch(None, async move {
        let result = match path {
            Ok(path) => submit::unlink(path).await,
            Err(code) => code,
        };
        (result, Completion::Code)
    });
    Ok(())
}

#[must_use]
pub fn unlink_sync(path: &Path) -> i32 {
    match NativePath::new(path) {
        Ok(path) => sys::unlink(&path),
        Err(code) => code,
    }
}
