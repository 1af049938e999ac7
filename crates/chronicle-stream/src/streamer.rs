// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Disk-buffered producer/consumer pipeline for raw commit blocks
//!
//! A background producer walks the pager and caches each block in a numbered
//! slot file. The consumer reads the slots back in sequence order and deletes
//! them. Both sides share one counter guarded by a mutex and a condvar; the
//! producer blocks while `buffer_capacity` slots are unread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::blocks::BlockReader;
use crate::error::StreamError;
use crate::pager::{LogPager, PageSource};

/// Default number of commits fetched per page
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Default number of unread slots before the producer waits
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Options for [`CommitStreamer::spawn`]
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Commits fetched per upstream page
    pub page_size: usize,
    /// Maximum number of cached but unread blocks
    pub buffer_capacity: usize,
    /// Slot directory; a temporary directory is used when unset
    pub buffer_dir: Option<PathBuf>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffer_dir: None,
        }
    }
}

impl StreamOptions {
    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the buffer capacity (at least one slot)
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Cache blocks in `dir`; the directory is purged on spawn and removed on drop
    #[must_use]
    pub fn with_buffer_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.buffer_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, Default)]
struct State {
    produced: usize,
    consumed: usize,
    finished: bool,
    fatal: Option<String>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

impl Shared {
    fn fail(&self, reason: String) {
        let mut state = self.state.lock();
        if state.fatal.is_none() && !state.finished {
            state.fatal = Some(reason);
        }
        drop(state);
        self.cond.notify_all();
    }
}

/// Marks the pipeline fatal if the producer unwinds
struct ProducerGuard {
    shared: Arc<Shared>,
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Commit producer panicked");
            self.shared.fail("producer thread panicked".to_string());
        }
    }
}

#[derive(Debug)]
enum BufferDir {
    Temporary(TempDir),
    Configured(PathBuf),
}

impl BufferDir {
    fn create(configured: Option<&Path>) -> Result<Self, StreamError> {
        match configured {
            Some(path) => {
                if path.exists() {
                    debug!(path = %path.display(), "Purging buffer directory");
                    fs::remove_dir_all(path)?;
                }
                fs::create_dir_all(path)?;
                Ok(Self::Configured(path.to_path_buf()))
            }
            None => Ok(Self::Temporary(
                tempfile::Builder::new()
                    .prefix("chronicle-stream-")
                    .tempdir()?,
            )),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Temporary(dir) => dir.path(),
            Self::Configured(path) => path,
        }
    }
}

fn slot_path(dir: &Path, seq: usize) -> PathBuf {
    dir.join(format!("{seq}.block"))
}

/// Streams raw commit blocks from a [`PageSource`] in upstream order
///
/// Dropping the streamer stops the producer after the page in flight and
/// removes the buffer directory.
#[derive(Debug)]
pub struct CommitStreamer {
    shared: Arc<Shared>,
    buffer: BufferDir,
    producer: Option<JoinHandle<()>>,
    next_seq: usize,
    commit_count: usize,
    page_count: usize,
    done: bool,
}

impl CommitStreamer {
    /// Start the producer thread
    ///
    /// # Errors
    ///
    /// Returns an error if the pager cannot be built (zero page size or a
    /// failing commit count), the buffer directory cannot be prepared, or the
    /// thread cannot be spawned.
    pub fn spawn<S>(source: S, options: StreamOptions) -> Result<Self, StreamError>
    where
        S: PageSource + Send + 'static,
    {
        let pager = LogPager::new(source, options.page_size)?;
        let commit_count = pager.commit_count();
        let page_count = pager.page_count();
        let buffer = BufferDir::create(options.buffer_dir.as_deref())?;
        let shared = Arc::new(Shared::default());

        info!(
            commits = commit_count,
            pages = page_count,
            buffer = %buffer.path().display(),
            "Starting commit stream"
        );

        let producer = {
            let shared = Arc::clone(&shared);
            let dir = buffer.path().to_path_buf();
            let capacity = options.buffer_capacity.max(1);
            thread::Builder::new()
                .name("chronicle-producer".to_string())
                .spawn(move || {
                    let _guard = ProducerGuard {
                        shared: Arc::clone(&shared),
                    };
                    match produce(&pager, &dir, &shared, capacity) {
                        Ok(()) => {
                            shared.state.lock().finished = true;
                            shared.cond.notify_all();
                        }
                        Err(e) => {
                            error!(error = %e, "Commit producer failed");
                            shared.fail(e.to_string());
                        }
                    }
                })?
        };

        Ok(Self {
            shared,
            buffer,
            producer: Some(producer),
            next_seq: 0,
            commit_count,
            page_count,
            done: false,
        })
    }

    /// Number of commits upstream
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Number of pages the producer walks
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Directory holding the slot files
    #[must_use]
    pub fn buffer_dir(&self) -> &Path {
        self.buffer.path()
    }

    /// Number of blocks returned so far
    #[must_use]
    pub fn blocks_read(&self) -> usize {
        self.next_seq
    }

    /// Wait for the next block
    ///
    /// Returns `Ok(None)` once every upstream block has been returned. Blocks
    /// cached before a producer failure are still returned first.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::PipelineFatal` if the producer failed and no
    /// cached block remains, or an IO error reading the slot.
    pub fn next_block(&mut self) -> Result<Option<String>, StreamError> {
        let seq = self.next_seq;
        {
            let mut state = self.shared.state.lock();
            while state.produced <= seq {
                if let Some(reason) = &state.fatal {
                    return Err(StreamError::PipelineFatal {
                        last_cached: state.produced.checked_sub(1),
                        reason: reason.clone(),
                    });
                }
                if state.finished {
                    return Ok(None);
                }
                self.shared.cond.wait(&mut state);
            }
        }

        let path = slot_path(self.buffer.path(), seq);
        let block = fs::read_to_string(&path)?;
        fs::remove_file(&path)?;
        self.next_seq += 1;

        self.shared.state.lock().consumed += 1;
        self.shared.cond.notify_all();
        Ok(Some(block))
    }

    fn close(&mut self) {
        self.shared.state.lock().closed = true;
        self.shared.cond.notify_all();
        if let Some(producer) = self.producer.take()
            && producer.join().is_err()
        {
            warn!("Commit producer exited with a panic");
        }
    }
}

impl Iterator for CommitStreamer {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for CommitStreamer {
    fn drop(&mut self) {
        self.close();
        if let BufferDir::Configured(path) = &self.buffer
            && let Err(e) = fs::remove_dir_all(path)
        {
            warn!(path = %path.display(), error = %e, "Failed to remove buffer directory");
        }
        debug!(blocks = self.next_seq, "Closed commit stream");
    }
}

fn produce<S: PageSource>(
    pager: &LogPager<S>,
    dir: &Path,
    shared: &Shared,
    capacity: usize,
) -> Result<(), StreamError> {
    let mut seq = 0;
    for page in 0..pager.page_count() {
        if shared.state.lock().closed {
            return Ok(());
        }
        for block in BlockReader::new(pager.page(page)?) {
            let block = block?;
            {
                let mut state = shared.state.lock();
                while state.produced - state.consumed >= capacity && !state.closed {
                    shared.cond.wait(&mut state);
                }
                if state.closed {
                    debug!(seq, "Producer stopping, stream closed");
                    return Ok(());
                }
            }
            fs::write(slot_path(dir, seq), block)?;
            shared.state.lock().produced += 1;
            shared.cond.notify_all();
            seq += 1;
        }
        debug!(page, blocks = seq, "Cached page");
    }
    Ok(())
}
