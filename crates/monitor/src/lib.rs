//! Live monitoring of Stellaris logs for one mod.
//!
//! A [`MonitorSession`] follows `game.log` and `error.log` concurrently,
//! feeds every relevant line to the Combined View callback, and hands
//! relevant error-log lines to an [`AlertNotifier`] for the Alert View.

mod alert;
mod error;
mod game;
mod session;

pub use alert::{
    ALERT_SEPARATOR, AlertBlock, AlertNotifier, Beeper, OnAlertFn, SilentBeeper, TerminalBell,
};
pub use error::{LaunchError, NotifyError, SessionError};
pub use game::{GameControl, GameFuture, STELLARIS_APP_ID, StellarisProcess};
pub use session::{
    DEFAULT_CHANNEL_CAPACITY, LaunchPolicy, MonitorSession, Notice, OnLineFn, OnNoticeFn,
    PromptFn, PromptFuture, SessionOptions, SessionOutputs, SessionState, SessionSummary,
};
