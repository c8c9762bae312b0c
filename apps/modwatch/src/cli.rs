use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "modwatch",
    version,
    about = "Follow Stellaris logs and surface what your mod writes"
)]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow game.log and error.log live (default)
    Monitor {
        /// Do not offer to launch the game
        #[arg(long)]
        no_launch: bool,

        /// Print one JSON object per line instead of colored text
        #[arg(long)]
        json: bool,
    },

    /// Show recent error.log lines from the mod's folders
    Errors {
        /// Number of lines (default: tail_lines from config)
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
    },

    /// Show recent game.log lines carrying the mod prefix
    Game {
        /// Number of lines (default: tail_lines from config)
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
    },

    /// Per-file line counts by severity
    Summary,

    /// Check whether the logs are newer than the mod source
    Fresh,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Monitor {
            no_launch: false,
            json: false,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}
