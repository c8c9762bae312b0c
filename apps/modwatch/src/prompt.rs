//! Launch prompt read from stdin.

use std::io::Write;

use modwatch_monitor::{PromptFn, PromptFuture};
use tokio::sync::oneshot;

/// Asks on stderr whether to launch the game.
///
/// Stdin is read on a plain thread. If the session's timeout fires first the
/// thread stays blocked until the process exits.
pub fn launch_prompt() -> PromptFn {
    Box::new(|| -> PromptFuture {
        Box::pin(async {
            let mut err = std::io::stderr();
            let _ = write!(err, "Stellaris is not running. Launch it via Steam? [y/N] ");
            let _ = err.flush();

            let (tx, rx) = oneshot::channel();
            std::thread::spawn(move || {
                let mut answer = String::new();
                let yes = match std::io::stdin().read_line(&mut answer) {
                    Ok(_) => is_yes(&answer),
                    Err(_) => false,
                };
                let _ = tx.send(yes);
            });

            rx.await.unwrap_or(false)
        })
    })
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
