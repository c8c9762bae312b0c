//! Monitor session orchestration.
//!
//! Spawns one [`StreamProcessor`] per watched file, merges their output in
//! arrival order, routes every line to the Combined View and relevant
//! error-log lines to the [`AlertNotifier`], and owns session cancellation.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use modwatch_config::Config;
use modwatch_game_log::{DEFAULT_POLL_INTERVAL, LogStream, StreamEvent, StreamProcessor};
use modwatch_matcher::PatternMatcher;
use modwatch_types::{ClassifiedLine, LogRole};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::alert::AlertNotifier;
use crate::error::SessionError;
use crate::game::GameControl;

/// Default capacity of the merge and alert channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Human-facing lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    WaitingForFile { role: LogRole, path: PathBuf },
    Following { role: LogRole, path: PathBuf },
    StreamFailed { role: LogRole, reason: String },
    /// No mod folder names are configured, so nothing can alert.
    NoFolderNames,
    GameNotRunning,
    LaunchRequested,
    LaunchFailed { reason: String },
    Stopped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::WaitingForFile { role, path } => {
                write!(f, "waiting for {role} log: {}", path.display())
            }
            Notice::Following { role, path } => {
                write!(f, "following {role} log: {}", path.display())
            }
            Notice::StreamFailed { role, reason } => {
                write!(f, "{role} stream failed: {reason}")
            }
            Notice::NoFolderNames => write!(
                f,
                "no mod folder names configured; error alerts are disabled"
            ),
            Notice::GameNotRunning => write!(f, "Stellaris is not running"),
            Notice::LaunchRequested => write!(f, "launching Stellaris via Steam"),
            Notice::LaunchFailed { reason } => write!(f, "could not launch Stellaris: {reason}"),
            Notice::Stopped => write!(f, "session stopped"),
        }
    }
}

/// Callback invoked with each line for the Combined View.
pub type OnLineFn = Box<dyn Fn(&ClassifiedLine) + Send + Sync + 'static>;

/// Callback invoked with each lifecycle notice.
pub type OnNoticeFn = Box<dyn Fn(&Notice) + Send + Sync + 'static>;

/// Resolves to the user's launch decision.
pub type PromptFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

/// Asks the user whether to launch the game.
pub type PromptFn = Box<dyn FnOnce() -> PromptFuture + Send>;

/// What to do when the game is not running at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPolicy {
    /// Continue without launching.
    Skip,
    /// Launch without asking.
    Launch,
    /// Ask via the prompt; no answer within `timeout` means continue.
    Ask { timeout: Duration },
}

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub channel_capacity: usize,
    pub launch: LaunchPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            launch: LaunchPolicy::Skip,
        }
    }
}

impl SessionOptions {
    /// Options derived from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            launch: LaunchPolicy::Ask {
                timeout: config.launch_prompt_timeout(),
            },
            ..Self::default()
        }
    }
}

/// Consumers of a running session.
pub struct SessionOutputs {
    /// Combined View.
    pub on_line: OnLineFn,
    pub on_notice: OnNoticeFn,
    /// Alert View.
    pub notifier: AlertNotifier,
}

/// Totals reported when a session stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub lines: u64,
    pub alerts: u64,
    pub failed_streams: Vec<LogRole>,
}

/// Orchestrates the concurrent log streams of one monitoring session.
pub struct MonitorSession {
    config: Config,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    game: Option<Arc<dyn GameControl>>,
    prompt: Option<PromptFn>,
    /// The not-ready warning is logged once per session.
    config_warned: bool,
}

impl MonitorSession {
    pub fn new(config: Config, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            options,
            state,
            cancel: CancellationToken::new(),
            game: None,
            prompt: None,
            config_warned: false,
        }
    }

    /// Enables game detection and launch.
    pub fn with_game_control(mut self, game: Arc<dyn GameControl>) -> Self {
        self.game = Some(game);
        self
    }

    /// Sets the prompt used by [`LaunchPolicy::Ask`].
    pub fn with_prompt(mut self, prompt: PromptFn) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observes state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Token that stops the session when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests shutdown. Safe to call repeatedly.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The files this session watches.
    pub fn streams(&self) -> Vec<LogStream> {
        vec![
            LogStream::new(LogRole::GameLog, self.config.game_log_path()),
            LogStream::new(LogRole::ErrorLog, self.config.error_log_path()),
        ]
    }

    /// Runs the session until cancelled or until every stream has ended.
    ///
    /// Fails before opening any file when the configuration is not ready.
    pub async fn run(&mut self, outputs: SessionOutputs) -> Result<SessionSummary, SessionError> {
        if self.state() != SessionState::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        self.set_state(SessionState::Starting);

        if let Err(e) = self.config.validate() {
            if !self.config_warned {
                self.config_warned = true;
                tracing::warn!(error = %e, "refusing to start monitor");
            }
            self.set_state(SessionState::Idle);
            return Err(SessionError::ConfigNotReady(e));
        }

        let SessionOutputs {
            on_line,
            on_notice,
            notifier,
        } = outputs;

        self.check_game(&on_notice).await;

        let matcher = Arc::new(PatternMatcher::new(&self.config));
        if !matcher.has_folder_names() {
            on_notice(&Notice::NoFolderNames);
        }

        let capacity = self.options.channel_capacity.max(1);
        let (tx, mut rx) = mpsc::channel(capacity);
        let (alert_tx, alert_rx) = mpsc::channel(capacity);
        let alerts = tokio::spawn(notifier.run(alert_rx));

        let mut tasks = JoinSet::new();
        for stream in self.streams() {
            let processor =
                StreamProcessor::new(&stream, Arc::clone(&matcher), self.options.poll_interval);
            tasks.spawn(processor.run(tx.clone(), self.cancel.child_token()));
        }
        // Streams hold the only senders; the merge ends when all of them do.
        drop(tx);

        self.set_state(SessionState::Running);
        tracing::info!(streams = tasks.len(), "monitor session running");

        let mut summary = SessionSummary::default();
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = rx.recv() => event,
            };
            let Some(event) = event else {
                tracing::warn!("all log streams ended");
                break;
            };

            match event {
                StreamEvent::Line(line) => {
                    summary.lines += 1;
                    on_line(&line);
                    if line.is_alert_worthy() && alert_tx.send(line).await.is_err() {
                        tracing::error!("alert notifier stopped unexpectedly");
                    }
                }
                StreamEvent::Waiting { role, path } => {
                    on_notice(&Notice::WaitingForFile { role, path });
                }
                StreamEvent::Following { role, path } => {
                    on_notice(&Notice::Following { role, path });
                }
                StreamEvent::Failed { role, reason } => {
                    summary.failed_streams.push(role);
                    on_notice(&Notice::StreamFailed { role, reason });
                }
            }
        }

        self.set_state(SessionState::Stopping);
        self.cancel.cancel();
        drop(rx);

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                tracing::error!(error = %e, "stream task panicked");
            }
        }

        drop(alert_tx);
        match alerts.await {
            Ok(notifier) => summary.alerts = notifier.alert_count(),
            Err(e) => tracing::error!(error = %e, "alert notifier panicked"),
        }

        on_notice(&Notice::Stopped);
        self.set_state(SessionState::Stopped);
        tracing::info!(
            lines = summary.lines,
            alerts = summary.alerts,
            "monitor session stopped"
        );
        Ok(summary)
    }

    /// Offers to launch the game when it is not running. Never blocks past
    /// the prompt timeout or cancellation.
    async fn check_game(&mut self, on_notice: &OnNoticeFn) {
        let Some(game) = self.game.clone() else {
            tracing::debug!("game detection unavailable");
            return;
        };

        if game.is_running().await {
            tracing::debug!("Stellaris is running");
            return;
        }
        on_notice(&Notice::GameNotRunning);

        let launch = match self.options.launch {
            LaunchPolicy::Skip => false,
            LaunchPolicy::Launch => true,
            LaunchPolicy::Ask { timeout } => match self.prompt.take() {
                Some(prompt) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => false,
                        answer = tokio::time::timeout(timeout, prompt()) => answer.unwrap_or_else(|_| {
                            tracing::debug!("launch prompt timed out, continuing");
                            false
                        }),
                    }
                }
                None => false,
            },
        };

        if !launch {
            return;
        }

        on_notice(&Notice::LaunchRequested);
        if let Err(e) = game.launch().await {
            tracing::warn!(error = %e, "game launch failed");
            on_notice(&Notice::LaunchFailed {
                reason: e.to_string(),
            });
        }
    }

    fn set_state(&self, state: SessionState) {
        tracing::debug!(?state, "session state");
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertBlock, SilentBeeper};
    use crate::error::LaunchError;
    use crate::game::GameFuture;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    const POLL: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Clone, Default)]
    struct Recorder {
        lines: Arc<Mutex<Vec<ClassifiedLine>>>,
        notices: Arc<Mutex<Vec<Notice>>>,
        alerts: Arc<Mutex<Vec<AlertBlock>>>,
    }

    impl Recorder {
        fn outputs(&self) -> SessionOutputs {
            let lines = Arc::clone(&self.lines);
            let notices = Arc::clone(&self.notices);
            let alerts = Arc::clone(&self.alerts);
            SessionOutputs {
                on_line: Box::new(move |l| lines.lock().unwrap().push(l.clone())),
                on_notice: Box::new(move |n| notices.lock().unwrap().push(n.clone())),
                notifier: AlertNotifier::new(
                    Box::new(move |b| alerts.lock().unwrap().push(b.clone())),
                    Arc::new(SilentBeeper),
                ),
            }
        }

        fn raw_lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().iter().map(|l| l.raw.clone()).collect()
        }

        fn count_notices(&self, pred: impl Fn(&Notice) -> bool) -> usize {
            self.notices.lock().unwrap().iter().filter(|n| pred(n)).count()
        }

        async fn wait_until(&self, what: &str, cond: impl Fn(&Recorder) -> bool) {
            let deadline = tokio::time::Instant::now() + WAIT;
            while !cond(self) {
                assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        async fn wait_following(&self, count: usize) {
            self.wait_until("streams to open", |r| {
                r.count_notices(|n| matches!(n, Notice::Following { .. })) >= count
            })
            .await;
        }
    }

    fn config(docs: &Path) -> Config {
        Config {
            mod_prefixes: vec!["LN".into()],
            mod_folder_names: vec!["the_living_network".into()],
            stellaris_docs_path: docs.to_path_buf(),
            ..Config::default()
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            poll_interval: POLL,
            ..SessionOptions::default()
        }
    }

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    fn logs(docs: &Path) -> (PathBuf, PathBuf) {
        let dir = docs.join("logs");
        std::fs::create_dir_all(&dir).unwrap();
        let game = dir.join("game.log");
        let error = dir.join("error.log");
        append(&game, "");
        append(&error, "");
        (game, error)
    }

    fn spawn(
        mut session: MonitorSession,
        recorder: &Recorder,
    ) -> tokio::task::JoinHandle<(MonitorSession, Result<SessionSummary, SessionError>)> {
        let outputs = recorder.outputs();
        tokio::spawn(async move {
            let result = session.run(outputs).await;
            (session, result)
        })
    }

    #[tokio::test]
    async fn unready_config_refuses_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let mut session = MonitorSession::new(
            Config {
                stellaris_docs_path: tmp.path().to_path_buf(),
                ..Config::default()
            },
            options(),
        );

        let result = session.run(recorder.outputs()).await;
        assert!(matches!(result, Err(SessionError::ConfigNotReady(_))));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(recorder.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn routes_lines_and_alerts_by_role() {
        let tmp = tempfile::tempdir().unwrap();
        let (game, error) = logs(tmp.path());
        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let handle = spawn(session, &recorder);

        recorder.wait_following(2).await;

        append(&game, "[LN] Spawned fleet\n[OTHER] noise\n[LN] ERROR: fallback invoked\n");
        append(
            &error,
            "mod/the_living_network/events/x.txt: error\n\
             common/events/nomad_events.txt: error\n\
             mod/ugc_12345.mod: error\n",
        );

        recorder
            .wait_until("lines", |r| r.lines.lock().unwrap().len() >= 3)
            .await;
        recorder
            .wait_until("alert", |r| !r.alerts.lock().unwrap().is_empty())
            .await;
        cancel.cancel();

        let (session, result) = handle.await.unwrap();
        let summary = result.unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.alerts, 1);

        let raws = recorder.raw_lines();
        assert!(raws.contains(&"[LN] Spawned fleet".to_string()));
        assert!(raws.contains(&"mod/the_living_network/events/x.txt: error".to_string()));
        assert!(!raws.iter().any(|r| r.contains("nomad") || r.contains("ugc_")));

        let alerts = recorder.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].number, 1);
        assert_eq!(alerts[0].line.source_role, LogRole::ErrorLog);

        assert_eq!(
            recorder.notices.lock().unwrap().last(),
            Some(&Notice::Stopped)
        );
    }

    #[tokio::test]
    async fn per_stream_order_is_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let (game, error) = logs(tmp.path());
        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let handle = spawn(session, &recorder);

        recorder.wait_following(2).await;

        for i in 0..30 {
            append(&game, &format!("[LN] game {i}\n"));
            append(&error, &format!("mod/the_living_network/e{i}.txt: error\n"));
            if i % 5 == 0 {
                tokio::time::sleep(Duration::from_millis(15)).await;
            }
        }

        recorder
            .wait_until("all lines", |r| r.lines.lock().unwrap().len() >= 60)
            .await;
        recorder
            .wait_until("all alerts", |r| r.alerts.lock().unwrap().len() >= 30)
            .await;
        cancel.cancel();
        let (_, result) = handle.await.unwrap();
        let summary = result.unwrap();
        assert_eq!(summary.lines, 60);
        assert_eq!(summary.alerts, 30);

        let lines = recorder.lines.lock().unwrap();
        let game_order: Vec<String> = lines
            .iter()
            .filter(|l| l.source_role == LogRole::GameLog)
            .map(|l| l.raw.clone())
            .collect();
        let expected: Vec<String> = (0..30).map(|i| format!("[LN] game {i}")).collect();
        assert_eq!(game_order, expected);

        // Alert numbers are 1..=n without gaps, in error-log order.
        let alerts = recorder.alerts.lock().unwrap();
        let numbers: Vec<u64> = alerts.iter().map(|a| a.number).collect();
        assert_eq!(numbers, (1..=30).collect::<Vec<u64>>());
        for (i, alert) in alerts.iter().enumerate() {
            assert_eq!(alert.line.raw, format!("mod/the_living_network/e{i}.txt: error"));
        }
    }

    #[tokio::test]
    async fn failed_stream_does_not_stop_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let logs_dir = tmp.path().join("logs");
        std::fs::create_dir_all(&logs_dir).unwrap();
        let game = logs_dir.join("game.log");
        append(&game, "");
        // A directory where the file should be cannot be read.
        std::fs::create_dir(logs_dir.join("error.log")).unwrap();

        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let mut state = session.subscribe();
        let handle = spawn(session, &recorder);

        recorder.wait_following(1).await;
        recorder
            .wait_until("failure notice", |r| {
                r.count_notices(|n| matches!(n, Notice::StreamFailed { .. })) == 1
            })
            .await;

        append(&game, "[LN] still alive\n");
        recorder
            .wait_until("game line", |r| r.lines.lock().unwrap().len() == 1)
            .await;
        assert_eq!(*state.borrow_and_update(), SessionState::Running);

        // Reported once, not every poll.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            recorder.count_notices(|n| matches!(n, Notice::StreamFailed { .. })),
            1
        );

        cancel.cancel();
        let (_, result) = handle.await.unwrap();
        let summary = result.unwrap();
        assert_eq!(summary.failed_streams, vec![LogRole::ErrorLog]);
        assert_eq!(summary.lines, 1);
    }

    #[tokio::test]
    async fn stream_failing_mid_session_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let (game, error) = logs(tmp.path());
        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let handle = spawn(session, &recorder);

        recorder.wait_following(2).await;

        std::fs::remove_file(&error).unwrap();
        std::fs::create_dir(&error).unwrap();
        recorder
            .wait_until("failure notice", |r| {
                r.count_notices(|n| matches!(n, Notice::StreamFailed { role: LogRole::ErrorLog, .. })) == 1
            })
            .await;

        for i in 0..5 {
            append(&game, &format!("[LN] tick {i}\n"));
        }
        recorder
            .wait_until("game lines", |r| r.lines.lock().unwrap().len() == 5)
            .await;

        cancel.cancel();
        let (session, result) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn idle_session_stays_silent() {
        let tmp = tempfile::tempdir().unwrap();
        let (game, _error) = logs(tmp.path());
        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let handle = spawn(session, &recorder);

        recorder.wait_following(2).await;
        append(&game, "vanilla output only\n");
        tokio::time::sleep(Duration::from_millis(200)).await;

        cancel.cancel();
        let (_, result) = handle.await.unwrap();
        let summary = result.unwrap();
        assert_eq!(summary.alerts, 0);
        assert_eq!(summary.lines, 0);
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_files_are_waited_for() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let session = MonitorSession::new(config(tmp.path()), options());
        let cancel = session.cancel_token();
        let handle = spawn(session, &recorder);

        recorder
            .wait_until("waiting notices", |r| {
                r.count_notices(|n| matches!(n, Notice::WaitingForFile { .. })) == 2
            })
            .await;

        // The game starts and creates its logs.
        let dir = tmp.path().join("logs");
        std::fs::create_dir_all(&dir).unwrap();
        append(&dir.join("error.log"), "mod/the_living_network/a.txt: error\n");

        recorder
            .wait_until("alert", |r| r.alerts.lock().unwrap().len() == 1)
            .await;

        cancel.cancel();
        let (_, result) = handle.await.unwrap();
        assert_eq!(result.unwrap().alerts, 1);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        logs(tmp.path());
        let recorder = Recorder::default();
        let session = MonitorSession::new(
            config(tmp.path()),
            SessionOptions {
                poll_interval: Duration::from_millis(500),
                ..SessionOptions::default()
            },
        );
        let cancel = session.cancel_token();
        let mut state = session.subscribe();
        let handle = spawn(session, &recorder);

        state
            .wait_for(|s| *s == SessionState::Running)
            .await
            .unwrap();
        cancel.cancel();
        cancel.cancel();

        let (session, result) = tokio::time::timeout(Duration::from_millis(600), handle)
            .await
            .expect("session did not stop within one poll interval")
            .unwrap();
        assert!(result.is_ok());
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        logs(tmp.path());
        let recorder = Recorder::default();
        let mut session = MonitorSession::new(config(tmp.path()), options());
        session.stop();

        assert!(session.run(recorder.outputs()).await.is_ok());
        assert!(matches!(
            session.run(recorder.outputs()).await,
            Err(SessionError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn no_folder_names_is_announced() {
        let tmp = tempfile::tempdir().unwrap();
        logs(tmp.path());
        let recorder = Recorder::default();
        let mut session = MonitorSession::new(
            Config {
                mod_folder_names: vec![],
                ..config(tmp.path())
            },
            options(),
        );
        session.stop();
        session.run(recorder.outputs()).await.unwrap();

        assert_eq!(recorder.count_notices(|n| *n == Notice::NoFolderNames), 1);
    }

    struct FakeGame {
        running: bool,
        launches: Arc<AtomicU32>,
    }

    impl GameControl for FakeGame {
        fn is_running(&self) -> GameFuture<'_, bool> {
            let running = self.running;
            Box::pin(async move { running })
        }

        fn launch(&self) -> GameFuture<'_, Result<(), LaunchError>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(LaunchError::Unavailable) })
        }
    }

    async fn run_with_game(
        running: bool,
        launch: LaunchPolicy,
        prompt: Option<PromptFn>,
    ) -> (u32, Recorder) {
        let tmp = tempfile::tempdir().unwrap();
        logs(tmp.path());
        let launches = Arc::new(AtomicU32::new(0));
        let recorder = Recorder::default();

        let mut session = MonitorSession::new(
            config(tmp.path()),
            SessionOptions {
                launch,
                ..options()
            },
        )
        .with_game_control(Arc::new(FakeGame {
            running,
            launches: Arc::clone(&launches),
        }));
        if let Some(prompt) = prompt {
            session = session.with_prompt(prompt);
        }
        let cancel = session.cancel_token();
        let mut state = session.subscribe();
        let handle = spawn(session, &recorder);

        state
            .wait_for(|s| *s == SessionState::Running)
            .await
            .unwrap();
        cancel.cancel();
        let (_, result) = handle.await.unwrap();
        result.unwrap();

        (launches.load(Ordering::SeqCst), recorder)
    }

    #[tokio::test]
    async fn running_game_is_not_launched() {
        let (launches, recorder) = run_with_game(true, LaunchPolicy::Launch, None).await;
        assert_eq!(launches, 0);
        assert_eq!(recorder.count_notices(|n| *n == Notice::GameNotRunning), 0);
    }

    #[tokio::test]
    async fn accepted_prompt_launches_once() {
        let prompt: PromptFn = Box::new(|| -> PromptFuture { Box::pin(async { true }) });
        let (launches, recorder) = run_with_game(
            false,
            LaunchPolicy::Ask {
                timeout: Duration::from_secs(1),
            },
            Some(prompt),
        )
        .await;
        assert_eq!(launches, 1);
        assert_eq!(recorder.count_notices(|n| *n == Notice::LaunchRequested), 1);
        assert_eq!(
            recorder.count_notices(|n| matches!(n, Notice::LaunchFailed { .. })),
            1
        );
    }

    #[tokio::test]
    async fn unanswered_prompt_times_out_and_continues() {
        let prompt: PromptFn =
            Box::new(|| -> PromptFuture { Box::pin(std::future::pending::<bool>()) });
        let (launches, recorder) = run_with_game(
            false,
            LaunchPolicy::Ask {
                timeout: Duration::from_millis(50),
            },
            Some(prompt),
        )
        .await;
        assert_eq!(launches, 0);
        assert_eq!(recorder.count_notices(|n| *n == Notice::GameNotRunning), 1);
        assert_eq!(recorder.count_notices(|n| *n == Notice::Stopped), 1);
    }
}
