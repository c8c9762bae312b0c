//! Alert View: numbered alert blocks plus an audible cue.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use modwatch_types::ClassifiedLine;
use tokio::sync::mpsc;

use crate::error::NotifyError;

/// Separator framing an alert block.
pub const ALERT_SEPARATOR: &str =
    "============================================================";

/// One emitted alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertBlock {
    /// Running alert number, starting at 1.
    pub number: u64,
    pub at: DateTime<Local>,
    pub line: ClassifiedLine,
}

impl fmt::Display for AlertBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{ALERT_SEPARATOR}")?;
        writeln!(f, "ALERT #{}  {}", self.number, self.at.format("%H:%M:%S"))?;
        writeln!(f, "{}", self.line.raw)?;
        write!(f, "{ALERT_SEPARATOR}")
    }
}

/// Callback invoked with each alert block.
pub type OnAlertFn = Box<dyn Fn(&AlertBlock) + Send + Sync + 'static>;

/// Produces the audible cue.
///
/// Called off the async runtime; implementations may block.
pub trait Beeper: Send + Sync {
    fn beep(&self) -> Result<(), NotifyError>;
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Beeper for TerminalBell {
    fn beep(&self) -> Result<(), NotifyError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| NotifyError::SinkUnavailable(e.to_string()))
    }
}

/// No audible cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBeeper;

impl Beeper for SilentBeeper {
    fn beep(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Numbers alert-worthy lines, emits them, and rings the beeper.
///
/// Owned by a single consumer, so the counter needs no synchronisation.
pub struct AlertNotifier {
    on_alert: OnAlertFn,
    beeper: Arc<dyn Beeper>,
    alert_count: u64,
    /// Set after the first beeper failure; later alerts are visual only.
    muted: Arc<AtomicBool>,
}

impl AlertNotifier {
    pub fn new(on_alert: OnAlertFn, beeper: Arc<dyn Beeper>) -> Self {
        Self {
            on_alert,
            beeper,
            alert_count: 0,
            muted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Alerts emitted so far.
    pub fn alert_count(&self) -> u64 {
        self.alert_count
    }

    /// Whether the beeper has failed and alerts are now visual only.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Emits one alert.
    ///
    /// The text block is always emitted; the cue is fired without waiting.
    pub fn notify(&mut self, line: ClassifiedLine) -> AlertBlock {
        self.alert_count += 1;
        let block = AlertBlock {
            number: self.alert_count,
            at: Local::now(),
            line,
        };
        (self.on_alert)(&block);
        self.ring();
        block
    }

    /// Consumes alerts until the sender side closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ClassifiedLine>) -> Self {
        while let Some(line) = rx.recv().await {
            self.notify(line);
        }
        self
    }

    fn ring(&self) {
        if self.muted.load(Ordering::Relaxed) {
            return;
        }

        let beeper = Arc::clone(&self.beeper);
        let muted = Arc::clone(&self.muted);
        let ring = move || {
            if let Err(e) = beeper.beep() {
                if !muted.swap(true, Ordering::Relaxed) {
                    tracing::warn!(error = %e, "audible alert unavailable, continuing visual only");
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(ring);
            }
            Err(_) => ring(),
        }
    }
}
