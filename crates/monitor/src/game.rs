//! Stellaris process detection and launch via Steam.

use std::future::Future;
use std::pin::Pin;

use crate::error::LaunchError;

/// Steam app ID of Stellaris.
pub const STELLARIS_APP_ID: u32 = 281990;

/// Boxed future returned by [`GameControl`] methods.
pub type GameFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Optional capability to query and launch the game.
pub trait GameControl: Send + Sync {
    /// Whether the game process is currently running.
    fn is_running(&self) -> GameFuture<'_, bool>;

    /// Asks the platform launcher to start the game.
    fn launch(&self) -> GameFuture<'_, Result<(), LaunchError>>;
}

/// Detects and launches the local Stellaris install.
#[derive(Debug, Default, Clone, Copy)]
pub struct StellarisProcess;

impl GameControl for StellarisProcess {
    fn is_running(&self) -> GameFuture<'_, bool> {
        Box::pin(is_running())
    }

    fn launch(&self) -> GameFuture<'_, Result<(), LaunchError>> {
        Box::pin(launch())
    }
}

fn launch_uri() -> String {
    format!("steam://rungameid/{STELLARIS_APP_ID}")
}

/// Checks for the game via `pgrep -x stellaris`.
#[cfg(not(target_os = "windows"))]
async fn is_running() -> bool {
    let output = tokio::process::Command::new("pgrep")
        .args(["-x", "stellaris"])
        .output()
        .await;

    match output {
        Ok(o) => o.status.success() && !o.stdout.is_empty(),
        Err(_) => false,
    }
}

/// Checks for the game via `tasklist`.
#[cfg(target_os = "windows")]
async fn is_running() -> bool {
    let output = tokio::process::Command::new("tasklist")
        .args(["/FI", "IMAGENAME eq stellaris.exe", "/NH"])
        .output()
        .await;

    match output {
        Ok(o) => {
            let stdout = String::from_utf8_lossy(&o.stdout).to_lowercase();
            stdout.contains("stellaris.exe")
        }
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
async fn launch() -> Result<(), LaunchError> {
    let uri = launch_uri();
    let spawned = spawn_detached("steam", &[uri.as_str()]);
    if spawned.is_ok() {
        return Ok(());
    }
    tracing::debug!("steam binary not found, falling back to xdg-open");
    spawn_detached("xdg-open", &[uri.as_str()])
}

#[cfg(target_os = "windows")]
async fn launch() -> Result<(), LaunchError> {
    let uri = launch_uri();
    spawn_detached("cmd", &["/C", "start", uri.as_str()])
}

#[cfg(target_os = "macos")]
async fn launch() -> Result<(), LaunchError> {
    let uri = launch_uri();
    spawn_detached("open", &[uri.as_str()])
}

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
async fn launch() -> Result<(), LaunchError> {
    Err(LaunchError::Unavailable)
}

#[cfg(any(target_os = "linux", target_os = "windows", target_os = "macos"))]
fn spawn_detached(program: &str, args: &[&str]) -> Result<(), LaunchError> {
    tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;
    Ok(())
}
