//! Single-file tailer.
//!
//! Follows one log file from a start position and yields whole lines as they
//! are appended. A missing file is waited for, and a truncated or replaced
//! file is re-read from its start. Neither condition escapes as an error.

use std::fs::{File, Metadata};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TailError;
use crate::wake::WakeHint;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bytes of the file head remembered to detect in-place rewrites.
const HEAD_LEN: usize = 64;

/// Upper bound on bytes consumed by a single poll.
const MAX_READ_PER_POLL: u64 = 8 * 1024 * 1024;

/// Where to begin reading the file present at the first open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    /// Skip existing content; only future appends are yielded.
    End,
    /// Resume from a byte offset (clamped to the file length).
    Offset(u64),
}

/// Lifecycle transitions observed during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEvent {
    /// The file does not exist (yet).
    Waiting,
    /// The file was opened and is being followed.
    Opened,
    /// The file shrank, was rewritten, or was replaced; reading restarted at 0.
    Rotated,
}

/// Output of one poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TailBatch {
    pub lines: Vec<String>,
    pub events: Vec<TailEvent>,
}

impl TailBatch {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.events.is_empty()
    }
}

/// Device and inode of the followed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

fn identity(meta: &Metadata) -> Option<FileIdentity> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Some(FileIdentity {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    {
        let _ = meta;
        None
    }
}

/// Follows a single growing file.
pub struct TailReader {
    path: PathBuf,
    start: StartAt,
    poll_interval: Duration,
    file: Option<File>,
    identity: Option<FileIdentity>,
    /// Bytes consumed from the current file.
    offset: u64,
    /// Incomplete trailing line.
    pending: Vec<u8>,
    /// First bytes of the current file, up to `HEAD_LEN`.
    head: Vec<u8>,
    /// `start` applies only to a file present at the first poll.
    use_start: bool,
    waiting: bool,
    ticker: Option<Interval>,
    wake: Option<WakeHint>,
    wake_tried: bool,
}

impl TailReader {
    /// Creates a reader; nothing is opened until the first poll.
    pub fn new(path: impl Into<PathBuf>, start: StartAt) -> Self {
        Self {
            path: path.into(),
            start,
            poll_interval: DEFAULT_POLL_INTERVAL,
            file: None,
            identity: None,
            offset: 0,
            pending: Vec::new(),
            head: Vec::new(),
            use_start: true,
            waiting: false,
            ticker: None,
            wake: None,
            wake_tried: false,
        }
    }

    /// Sets the delay between polls in [`TailReader::next_batch`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed from the current file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Waits for the next non-empty batch.
    ///
    /// Returns `None` once `cancel` fires; the file handle is released before
    /// returning. An `Err` is terminal for this reader.
    pub async fn next_batch(
        &mut self,
        cancel: &CancellationToken,
    ) -> Option<Result<TailBatch, TailError>> {
        loop {
            if cancel.is_cancelled() {
                self.close();
                return None;
            }

            match self.poll() {
                Ok(batch) => {
                    if batch.events.contains(&TailEvent::Opened) && !self.wake_tried {
                        self.wake_tried = true;
                        self.wake = WakeHint::watch(&self.path);
                    }
                    if !batch.is_empty() {
                        return Some(Ok(batch));
                    }
                }
                Err(e) => {
                    self.close();
                    return Some(Err(e));
                }
            }

            let period = self.poll_interval;
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut t = tokio::time::interval_at(Instant::now() + period, period);
                t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                t
            });
            let wake = self.wake.as_ref();

            let cancelled = tokio::select! {
                _ = cancel.cancelled() => true,
                _ = ticker.tick() => false,
                _ = async {
                    match wake {
                        Some(w) => w.notified().await,
                        None => std::future::pending::<()>().await,
                    }
                } => false,
            };
            if cancelled {
                self.close();
                return None;
            }
        }
    }

    /// Runs one check of the file and returns whatever it produced.
    pub fn poll(&mut self) -> Result<TailBatch, TailError> {
        let mut batch = TailBatch::default();

        let meta = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.file.is_some() {
                    tracing::debug!(path = %self.path.display(), "log file removed, waiting for replacement");
                    self.close();
                    self.reset_position();
                }
                self.use_start = false;
                if !self.waiting {
                    self.waiting = true;
                    batch.events.push(TailEvent::Waiting);
                }
                return Ok(batch);
            }
            Err(e) => return Err(TailError::unreadable(&self.path, e)),
        };

        if !meta.is_file() {
            return Err(TailError::NotAFile {
                path: self.path.clone(),
            });
        }

        let ident = identity(&meta);
        if self.file.is_some() && ident.is_some() && ident != self.identity {
            tracing::debug!(path = %self.path.display(), "log file replaced, restarting from 0");
            self.close();
            self.reset_position();
            batch.events.push(TailEvent::Rotated);
        }

        if self.file.is_none() {
            let reopen = !self.use_start;
            self.open(&meta)?;
            self.identity = ident;
            self.waiting = false;
            if !batch.events.contains(&TailEvent::Rotated) {
                batch.events.push(TailEvent::Opened);
            }
            tracing::debug!(
                path = %self.path.display(),
                offset = self.offset,
                reopen,
                "log file opened"
            );
        }

        let len = meta.len();
        if len < self.offset || !self.head_matches()? {
            tracing::debug!(
                path = %self.path.display(),
                len,
                offset = self.offset,
                "log file truncated, restarting from 0"
            );
            self.reset_position();
            batch.events.push(TailEvent::Rotated);
        }

        if len > self.offset {
            batch.lines = self.read_appended()?;
        }

        Ok(batch)
    }

    /// Releases the file handle.
    pub fn close(&mut self) {
        self.file = None;
        self.identity = None;
    }

    fn reset_position(&mut self) {
        self.offset = 0;
        self.pending.clear();
        self.head.clear();
    }

    fn open(&mut self, meta: &Metadata) -> Result<(), TailError> {
        let mut file = File::open(&self.path).map_err(|e| TailError::unreadable(&self.path, e))?;

        self.offset = if self.use_start {
            match self.start {
                StartAt::End => meta.len(),
                StartAt::Offset(n) => n.min(meta.len()),
            }
        } else {
            // Appeared after a wait, or replaced: all of it is new.
            0
        };
        self.use_start = false;
        self.pending.clear();

        let head_len = self.offset.min(HEAD_LEN as u64) as usize;
        self.head = read_head(&mut file, head_len).map_err(|e| TailError::unreadable(&self.path, e))?;
        self.file = Some(file);
        Ok(())
    }

    /// Whether the file still begins with the remembered head bytes.
    fn head_matches(&mut self) -> Result<bool, TailError> {
        if self.head.is_empty() {
            return Ok(true);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(true);
        };
        match read_head(file, self.head.len()) {
            Ok(current) => Ok(current == self.head),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(TailError::unreadable(&self.path, e)),
        }
    }

    fn read_appended(&mut self) -> Result<Vec<String>, TailError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };

        let path = &self.path;
        let before = self.offset;
        let mut buf = Vec::new();
        file.seek(SeekFrom::Start(before))
            .map_err(|e| TailError::unreadable(path, e))?;
        file.by_ref()
            .take(MAX_READ_PER_POLL)
            .read_to_end(&mut buf)
            .map_err(|e| TailError::unreadable(path, e))?;
        self.offset += buf.len() as u64;

        // Extend the head while it still covers a contiguous prefix.
        if self.head.len() < HEAD_LEN && self.head.len() as u64 == before {
            let take = (HEAD_LEN - self.head.len()).min(buf.len());
            self.head.extend_from_slice(&buf[..take]);
        }

        self.pending.extend_from_slice(&buf);
        Ok(self.drain_lines())
    }

    /// Splits complete lines off `pending`, keeping any partial tail.
    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            let mut line = &self.pending[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
        }

        self.pending.drain(..start);
        lines
    }
}

/// Reads exactly `len` bytes from the start of `file`.
fn read_head(file: &mut File, len: usize) -> std::io::Result<Vec<u8>> {
    let mut head = vec![0u8; len];
    if len > 0 {
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut head)?;
    }
    Ok(head)
}
