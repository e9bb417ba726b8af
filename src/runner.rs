//! Awaitable driver over the bridge
//!
//! [`Runner`] owns one context and one slot and turns each operation into a
//! plain `async fn` returning decoded results. In [`Mode::Async`] the
//! context's handler forwards `(id, result)` into a channel the runner
//! awaits; in [`Mode::Sync`] the sync forms are called directly. The command
//! line binary is built on it.

use crate::buffer::HostBuffer;
use crate::context::Context;
use crate::dir::DirHandle;
use crate::error::FsError;
use crate::layout::{DirentRecord, StatRecord, SIZEOF_DIRENT, SIZEOF_PATH, SIZEOF_STAT};
use crate::ops;
use crate::slot::RequestSlot;
use anyhow::{bail, Context as _, Result};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use std::path::Path;
use tracing::debug;

/// How operations are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Blocking sync forms
    Sync,
    /// Async forms completed through the context handler
    Async,
}

/// Sequential operation driver
#[derive(Debug)]
pub struct Runner {
    mode: Mode,
    context: Context,
    slot: RequestSlot,
    responses: UnboundedReceiver<(u32, i32)>,
    next_id: u32,
}

impl Runner {
    /// Create a runner with its own context and slot
    ///
    /// # Errors
    ///
    /// Fails if the slot cannot be bound.
    pub fn new(mode: Mode) -> Result<Self> {
        let (tx, responses) = unbounded();
        let context = Context::init(tx, |tx: &UnboundedSender<(u32, i32)>, id, result| {
            tx.unbounded_send((id, result))
                .context("response receiver dropped")
        });
        let slot = RequestSlot::new();
        slot.bind(&context)?;
        Ok(Self {
            mode,
            context,
            slot,
            responses,
            next_id: 0,
        })
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The runner's context, for inspecting its counters
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Issue one operation in the configured mode and return its result code
    async fn run(
        &mut self,
        submit: impl FnOnce(&RequestSlot) -> crate::Result<()>,
        blocking: impl FnOnce() -> i32,
    ) -> Result<i32> {
        match self.mode {
            Mode::Sync => Ok(blocking()),
            Mode::Async => {
                self.next_id = self.next_id.wrapping_add(1);
                self.slot.set_id(self.next_id);
                submit(&self.slot)?;

                let Some((id, result)) = self.responses.next().await else {
                    bail!("completion channel closed");
                };
                if id != self.next_id {
                    bail!("completion for request {id}, expected {}", self.next_id);
                }
                debug!(id, result, "completion received");
                Ok(result)
            }
        }
    }

    /// stat or lstat a path
    ///
    /// # Errors
    ///
    /// Returns the named errno on failure.
    pub async fn stat(&mut self, path: &Path, follow: bool) -> Result<StatRecord> {
        let buffer = HostBuffer::zeroed(SIZEOF_STAT);
        let code = self
            .run(
                |slot| {
                    if follow {
                        ops::stat(slot, path, &buffer)
                    } else {
                        ops::lstat(slot, path, &buffer)
                    }
                },
                || {
                    let mut dst = buffer.borrow_mut();
                    if follow {
                        ops::stat_sync(path, &mut dst)
                    } else {
                        ops::lstat_sync(path, &mut dst)
                    }
                },
            )
            .await?;
        FsError::check(code).with_context(|| format!("stat {}", path.display()))?;

        let bytes = buffer.borrow();
        StatRecord::decode(&bytes).context("short stat record")
    }

    /// Read a symlink target
    ///
    /// # Errors
    ///
    /// Returns the named errno on failure.
    pub async fn readlink(&mut self, path: &Path) -> Result<Vec<u8>> {
        let buffer = HostBuffer::zeroed(SIZEOF_PATH);
        let code = self
            .run(
                |slot| ops::readlink(slot, path, &buffer),
                || ops::readlink_sync(path, &mut buffer.borrow_mut()),
            )
            .await?;
        FsError::check(code).with_context(|| format!("readlink {}", path.display()))?;

        let bytes = buffer.borrow();
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(bytes[..len].to_vec())
    }

    /// List a directory, `batch` entries per readdir call
    ///
    /// # Errors
    ///
    /// Returns the named errno of the first failing call. The stream is
    /// closed before a readdir failure is reported.
    pub async fn list(&mut self, path: &Path, batch: usize) -> Result<Vec<DirentRecord>> {
        let handle = DirHandle::new();
        let code = self
            .run(
                |slot| ops::opendir(slot, path, &handle),
                || ops::opendir_sync(path, &handle),
            )
            .await?;
        FsError::check(code).with_context(|| format!("opendir {}", path.display()))?;

        let entries = HostBuffer::zeroed(SIZEOF_DIRENT * batch.max(1));
        let mut listed = Vec::new();
        let outcome = loop {
            let code = self
                .run(
                    |slot| ops::readdir(slot, &handle, &entries),
                    || ops::readdir_sync(&handle, &mut entries.borrow_mut()),
                )
                .await?;
            match FsError::check(code) {
                Ok(0) => break Ok(()),
                Ok(count) => {
                    let count = usize::try_from(count).unwrap_or(0);
                    listed.extend(DirentRecord::decode_all(&entries.borrow(), count));
                }
                Err(e) => break Err(e),
            }
        };

        let code = self
            .run(
                |slot| ops::closedir(slot, &handle),
                || ops::closedir_sync(&handle),
            )
            .await?;
        outcome.with_context(|| format!("readdir {}", path.display()))?;
        FsError::check(code).with_context(|| format!("closedir {}", path.display()))?;
        Ok(listed)
    }

    /// Read a whole file in `chunk`-sized reads
    ///
    /// # Errors
    ///
    /// Returns the named errno of the first failing call.
    pub async fn read_file(&mut self, path: &Path, chunk: usize) -> Result<Vec<u8>> {
        let fd = self.open(path, crate::constants::O_RDONLY, 0).await?;
        let buffer = HostBuffer::zeroed(chunk.max(1));
        let len = buffer.len();
        let mut contents = Vec::new();

        let outcome = loop {
            let pos = i64::try_from(contents.len()).unwrap_or(i64::MAX);
            let code = self
                .run(
                    |slot| ops::read(slot, fd, &buffer, 0, len, pos),
                    || ops::read_sync(fd, &mut buffer.borrow_mut(), 0, len, pos),
                )
                .await?;
            match FsError::check(code) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    let n = usize::try_from(n).unwrap_or(0);
                    contents.extend_from_slice(&buffer.borrow()[..n]);
                }
                Err(e) => break Err(e),
            }
        };

        self.close(fd).await?;
        outcome.with_context(|| format!("read {}", path.display()))?;
        Ok(contents)
    }

    /// Write `data` to `path` opened with `flags` and `mode`
    ///
    /// # Errors
    ///
    /// Returns the named errno of the first failing call.
    pub async fn write_file(
        &mut self,
        path: &Path,
        data: &[u8],
        flags: i32,
        mode: u32,
    ) -> Result<usize> {
        let fd = self.open(path, flags, mode).await?;
        let buffer = HostBuffer::from(data);
        let mut written = 0;

        let outcome = loop {
            if written == data.len() {
                break Ok(());
            }
            let len = data.len() - written;
            let code = self
                .run(
                    |slot| ops::write(slot, fd, &buffer, written, len, -1),
                    || ops::write_sync(fd, &buffer.borrow(), written, len, -1),
                )
                .await?;
            match FsError::check(code) {
                Ok(0) => break Err(None),
                Ok(n) => written += usize::try_from(n).unwrap_or(0),
                Err(e) => break Err(Some(e)),
            }
        };

        self.close(fd).await?;
        match outcome {
            Ok(()) => Ok(written),
            Err(Some(e)) => Err(e).with_context(|| format!("write {}", path.display())),
            Err(None) => bail!("write {} made no progress", path.display()),
        }
    }

    /// Create one directory
    ///
    /// # Errors
    ///
    /// Returns the named errno on failure.
    pub async fn mkdir(&mut self, path: &Path, mode: u32) -> Result<()> {
        let code = self.mkdir_code(path, mode).await?;
        FsError::check(code).with_context(|| format!("mkdir {}", path.display()))?;
        Ok(())
    }

    /// Create a directory and any missing parents
    ///
    /// A component that already exists as a directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns the named errno of the first mkdir that fails for a reason
    /// other than a missing parent, unless the path turns out to be a
    /// directory anyway.
    pub async fn mkdir_all(&mut self, path: &Path, mode: u32) -> Result<()> {
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.last().cloned() {
            let code = self.mkdir_code(&dir, mode).await?;
            match FsError::check(code) {
                Ok(_) => {
                    pending.pop();
                }
                Err(e) if e.errno() == libc::ENOENT => match dir.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new("/") => {
                        pending.push(parent.to_path_buf());
                    }
                    _ => return Err(e).with_context(|| format!("mkdir {}", dir.display())),
                },
                Err(e) => {
                    let is_dir = self.stat(&dir, true).await.is_ok_and(|st| st.is_dir());
                    if !is_dir {
                        return Err(e).with_context(|| format!("mkdir {}", dir.display()));
                    }
                    pending.pop();
                }
            }
        }
        Ok(())
    }

    async fn mkdir_code(&mut self, path: &Path, mode: u32) -> Result<i32> {
        self.run(
            |slot| ops::mkdir(slot, path, mode),
            || ops::mkdir_sync(path, mode),
        )
        .await
    }

    async fn open(&mut self, path: &Path, flags: i32, mode: u32) -> Result<i32> {
        let code = self
            .run(
                |slot| ops::open(slot, path, flags, mode),
                || ops::open_sync(path, flags, mode),
            )
            .await?;
        FsError::check(code).with_context(|| format!("open {}", path.display()))
    }

    async fn close(&mut self, fd: i32) -> Result<()> {
        let code = self
            .run(|slot| ops::close(slot, fd), || ops::close_sync(fd))
            .await?;
        FsError::check(code).context("close")?;
        Ok(())
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Err(e) = self.context.destroy() {
            debug!("runner context already destroyed: {e}");
        }
    }
}
