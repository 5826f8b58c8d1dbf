use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "remorch-connect",
    version,
    about = "AI CLI remote access: run an assistant in tmux and show how to connect to it",
    after_help = "Examples:\n  remorch-connect                  Show connection info\n  remorch-connect claude           Start Claude Code in tmux\n  remorch-connect claude --resume  With arguments\n  remorch-connect --no-attach codex --full-auto  Start in the background\n\nOptions for remorch-connect go before the command."
)]
pub struct Cli {
    /// Command to start in a tmux session (session is named after its first word)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Don't attach to the session after starting it
    #[arg(long)]
    pub no_attach: bool,

    /// Add shell aliases (claude, gemini, codex, remorch) and exit
    #[arg(long)]
    pub setup: bool,

    /// Path to config file [default: ~/.config/remorch/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The command line to launch, words joined by spaces.
    pub fn command_line(&self) -> Option<String> {
        let line = self.command.join(" ");
        (!line.trim().is_empty()).then_some(line)
    }
}
