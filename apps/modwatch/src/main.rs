mod cli;
mod output;
mod prompt;
mod views;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use modwatch_config::{Config, config_path};
use modwatch_history::{FreshnessComparator, StaticScanner};
use modwatch_monitor::{
    AlertNotifier, LaunchPolicy, MonitorSession, SessionOptions, SessionOutputs,
    StellarisProcess, TerminalBell,
};

use cli::{Cli, Command, ConfigCmd};
use views::Style;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics share the terminal with the views; keep them quiet by default.
    let default_filter = if cli.verbose {
        "info,modwatch=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let path = match cli.config {
        Some(path) => path,
        None => config_path()?,
    };

    match cli.command.unwrap_or_default() {
        Command::Config { cmd } => show_config(cmd, &path),
        Command::Monitor { no_launch, json } => {
            let config = load_ready(&path)?;
            monitor(config, no_launch, Style::detect(json)).await
        }
        Command::Errors { lines } => {
            let config = load_ready(&path)?;
            let n = lines.unwrap_or(config.tail_lines);
            let report = StaticScanner::new(&config).errors(n)?;
            output::print_all(&Style::detect(false).scan(&report))?;
            Ok(())
        }
        Command::Game { lines } => {
            let config = load_ready(&path)?;
            let n = lines.unwrap_or(config.tail_lines);
            let report = StaticScanner::new(&config).game(n)?;
            output::print_all(&Style::detect(false).scan(&report))?;
            Ok(())
        }
        Command::Summary => {
            let config = load_ready(&path)?;
            let summary = StaticScanner::new(&config).summary()?;
            output::print_all(&Style::detect(false).summary(&summary))?;
            Ok(())
        }
        Command::Fresh => {
            let config = load_ready(&path)?;
            let report = FreshnessComparator::new(&config).compare()?;
            output::print_all(&Style::detect(false).freshness(&report))?;
            Ok(())
        }
    }
}

/// Loads the config and refuses to continue while it still holds the
/// install-time placeholder.
fn load_ready(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load_from(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("set mod_prefixes in {} and try again", path.display()))?;
    Ok(config)
}

fn show_config(cmd: ConfigCmd, path: &Path) -> anyhow::Result<()> {
    let lines = match cmd {
        ConfigCmd::Path => vec![path.display().to_string()],
        ConfigCmd::Show => {
            let config = Config::load_from(path)?;
            let ready = if config.is_ready() { "ready" } else { "not ready" };
            let mut lines = vec![
                format!("# {} ({ready})", path.display()),
                format!("# game log:  {}", config.game_log_path().display()),
                format!("# error log: {}", config.error_log_path().display()),
            ];
            lines.extend(config.to_toml()?.lines().map(str::to_string));
            lines
        }
    };
    output::print_all(&lines)?;
    Ok(())
}

async fn monitor(config: Config, no_launch: bool, style: Style) -> anyhow::Result<()> {
    let mut options = SessionOptions::from_config(&config);
    if no_launch || !std::io::stdin().is_terminal() {
        options.launch = LaunchPolicy::Skip;
    }

    let mut session = MonitorSession::new(config, options)
        .with_game_control(Arc::new(StellarisProcess))
        .with_prompt(prompt::launch_prompt());

    let alert_cancel = session.cancel_token();
    let line_cancel = session.cancel_token();
    let notifier = AlertNotifier::new(
        Box::new(move |block| {
            if let Err(e) = output::emit(&style.alert(block)) {
                stop_on_write_error(&alert_cancel, &e);
            }
        }),
        Arc::new(TerminalBell),
    );
    let outputs = SessionOutputs {
        on_line: Box::new(move |line| {
            if let Err(e) = output::emit(&style.line(line)) {
                stop_on_write_error(&line_cancel, &e);
            }
        }),
        on_notice: Box::new(move |notice| eprintln!("{}", style.notice(notice))),
        notifier,
    };

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel.cancel(),
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    let summary = session.run(outputs).await?;
    eprintln!("{}", style.session_summary(&summary));
    Ok(())
}

/// Stdout is gone, so nothing can be shown; end the session.
fn stop_on_write_error(cancel: &CancellationToken, e: &std::io::Error) {
    if !cancel.is_cancelled() {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            tracing::debug!("stdout closed, stopping");
        } else {
            tracing::warn!(error = %e, "cannot write to stdout, stopping");
        }
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_stdout_cancels_session() {
        let cancel = CancellationToken::new();
        let e = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        stop_on_write_error(&cancel, &e);
        assert!(cancel.is_cancelled());

        // Later failures while stopping are harmless.
        stop_on_write_error(&cancel, &e);
        assert!(cancel.is_cancelled());
    }
}
