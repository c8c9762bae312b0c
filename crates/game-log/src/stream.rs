//! One stream's lifecycle: tail, filter, classify, forward.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use modwatch_matcher::PatternMatcher;
use modwatch_types::{ClassifiedLine, LogRole};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::LogStream;
use crate::tailer::{StartAt, TailEvent, TailReader};

/// Output of a running stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A line that passed the relevance test.
    Line(ClassifiedLine),
    /// The file does not exist yet.
    Waiting { role: LogRole, path: PathBuf },
    /// The file is open and being followed.
    Following { role: LogRole, path: PathBuf },
    /// The file cannot be read; the stream has stopped.
    Failed { role: LogRole, reason: String },
}

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    Cancelled,
    Failed,
    /// The receiving side went away.
    Closed,
}

/// Binds a [`LogStream`] to a reader and a matcher.
pub struct StreamProcessor {
    role: LogRole,
    reader: TailReader,
    matcher: Arc<PatternMatcher>,
}

impl StreamProcessor {
    /// Follows `stream` from its current end.
    pub fn new(stream: &LogStream, matcher: Arc<PatternMatcher>, poll_interval: Duration) -> Self {
        let reader = TailReader::new(&stream.path, StartAt::End).with_poll_interval(poll_interval);
        Self::with_reader(stream.role, reader, matcher)
    }

    /// Uses a preconfigured reader.
    pub fn with_reader(role: LogRole, reader: TailReader, matcher: Arc<PatternMatcher>) -> Self {
        Self {
            role,
            reader,
            matcher,
        }
    }

    pub fn role(&self) -> LogRole {
        self.role
    }

    /// Runs until cancelled, failed, or the receiver is dropped.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> StreamExit {
        let role = self.role;
        let path = self.reader.path().to_path_buf();
        tracing::info!(%role, path = %path.display(), "stream started");

        let exit = loop {
            let batch = match self.reader.next_batch(&cancel).await {
                None => break StreamExit::Cancelled,
                Some(Ok(batch)) => batch,
                Some(Err(e)) => {
                    tracing::warn!(%role, error = %e, "stream failed");
                    let event = StreamEvent::Failed {
                        role,
                        reason: e.to_string(),
                    };
                    // Best effort: the session may already be stopping.
                    let _ = send(&tx, event, &cancel).await;
                    break StreamExit::Failed;
                }
            };

            let mut open = true;
            for event in &batch.events {
                let notice = match event {
                    TailEvent::Waiting => Some(StreamEvent::Waiting {
                        role,
                        path: path.clone(),
                    }),
                    TailEvent::Opened => Some(StreamEvent::Following {
                        role,
                        path: path.clone(),
                    }),
                    TailEvent::Rotated => {
                        tracing::debug!(%role, "log rotated");
                        None
                    }
                };
                if let Some(notice) = notice {
                    open = send(&tx, notice, &cancel).await;
                    if !open {
                        break;
                    }
                }
            }

            if open {
                for raw in &batch.lines {
                    let Some(line) = self.matcher.classify(role, raw) else {
                        continue;
                    };
                    open = send(&tx, StreamEvent::Line(line), &cancel).await;
                    if !open {
                        break;
                    }
                }
            }

            if !open {
                break if cancel.is_cancelled() {
                    StreamExit::Cancelled
                } else {
                    StreamExit::Closed
                };
            }
        };

        self.reader.close();
        tracing::info!(%role, ?exit, "stream stopped");
        exit
    }
}

/// Sends with backpressure, giving up on cancellation or a closed channel.
async fn send(
    tx: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        res = tx.send(event) => res.is_ok(),
    }
}
