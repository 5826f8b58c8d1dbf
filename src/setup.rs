//! `--setup`: append shortcut aliases to the user's shell config.
//!
//! The edit is guarded by [`MARKER`]: if the config file already mentions it,
//! nothing is written. Aliases are only defined outside tmux so that the
//! command typed into a launched session resolves to the real CLI.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ConnectError;
use crate::present::Palette;

pub const MARKER: &str = "remorch-connect";

/// CLIs that get a shortcut alias.
const WRAPPED_CLIS: &[&str] = &["claude", "gemini", "codex"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Zsh,
    Bash,
    Fish,
}

impl ShellKind {
    pub fn from_shell_var(shell: &str) -> Option<Self> {
        if shell.contains("zsh") {
            Some(Self::Zsh)
        } else if shell.contains("bash") {
            Some(Self::Bash)
        } else if shell.contains("fish") {
            Some(Self::Fish)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Zsh => "zsh",
            Self::Bash => "bash",
            Self::Fish => "fish",
        }
    }
}

/// What `--setup` learned about the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellEnv {
    pub shell_var: String,
    pub shell: Option<ShellKind>,
    pub config_file: Option<PathBuf>,
    pub platform_name: String,
}

impl ShellEnv {
    pub fn detect(shell_var: &str, home: Option<&Path>, os: &str, is_wsl: bool) -> Self {
        let shell = ShellKind::from_shell_var(shell_var);
        let config_file = home.zip(shell).map(|(home, kind)| match kind {
            ShellKind::Zsh => home.join(".zshrc"),
            ShellKind::Bash if os == "macos" => home.join(".bash_profile"),
            ShellKind::Bash => home.join(".bashrc"),
            ShellKind::Fish => home.join(".config").join("fish").join("config.fish"),
        });
        let platform_name = match os {
            "macos" => "macOS".to_string(),
            "linux" if is_wsl => "WSL".to_string(),
            "linux" => "Linux".to_string(),
            other => other.to_string(),
        };
        Self {
            shell_var: shell_var.to_string(),
            shell,
            config_file,
            platform_name,
        }
    }

    pub fn from_process() -> Self {
        let shell_var = std::env::var("SHELL").unwrap_or_default();
        let home = dirs::home_dir();
        Self::detect(
            &shell_var,
            home.as_deref(),
            std::env::consts::OS,
            running_under_wsl(),
        )
    }
}

fn running_under_wsl() -> bool {
    fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|r| {
            let r = r.to_ascii_lowercase();
            r.contains("microsoft") || r.contains("wsl")
        })
        .unwrap_or(false)
}

/// The alias definitions for `shell`, one per line, without the guard.
pub fn alias_lines(shell: Option<ShellKind>) -> Vec<String> {
    let mut lines: Vec<String> = WRAPPED_CLIS
        .iter()
        .map(|cli| match shell {
            Some(ShellKind::Fish) => format!("function {cli}; {MARKER} {cli} $argv; end"),
            _ => format!("alias {cli}='{MARKER} {cli}'"),
        })
        .collect();
    lines.push(match shell {
        Some(ShellKind::Fish) => format!("function remorch; {MARKER} $argv; end"),
        _ => format!("alias remorch='{MARKER}'"),
    });
    lines
}

/// The block appended to the config file.
pub fn alias_block(shell: ShellKind, date: &str) -> String {
    let mut block = format!("\n# RemOrch Connect aliases (added {date})\n");
    let (open, close) = match shell {
        ShellKind::Fish => ("if not set -q TMUX", "end"),
        ShellKind::Zsh | ShellKind::Bash => ("if [ -z \"$TMUX\" ]; then", "fi"),
    };
    let _ = writeln!(block, "{open}");
    for line in alias_lines(Some(shell)) {
        let _ = writeln!(block, "  {line}");
    }
    let _ = writeln!(block, "{close}");
    block
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Installed { path: PathBuf },
    AlreadyPresent { path: PathBuf },
}

/// Append the alias block unless the marker is already present.
pub fn install(env: &ShellEnv, date: &str) -> Result<SetupOutcome, ConnectError> {
    let (Some(shell), Some(path)) = (env.shell, env.config_file.as_ref()) else {
        return Err(ConnectError::ShellDetection {
            shell: env.shell_var.clone(),
        });
    };

    let write_err = |source| ConnectError::FileWrite {
        path: path.display().to_string(),
        source,
    };

    // Only a missing file counts as "not configured yet"; rc files may hold
    // non-UTF-8 bytes, so the marker is searched in a lossy decode.
    let existing = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(write_err(e)),
    };
    if String::from_utf8_lossy(&existing).contains(MARKER) {
        tracing::info!(path = %path.display(), "aliases already present");
        return Ok(SetupOutcome::AlreadyPresent { path: path.clone() });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(alias_block(shell, date).as_bytes())
        .map_err(write_err)?;

    tracing::info!(path = %path.display(), shell = shell.name(), "aliases installed");
    Ok(SetupOutcome::Installed { path: path.clone() })
}

/// Run `--setup` end to end and return the text to print. Detection and write
/// failures are reported with manual instructions rather than as errors.
pub fn run(env: &ShellEnv, date: &str, p: &Palette) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}\n", p.header.apply_to("RemOrch Connect - Shell Setup"));
    let _ = writeln!(
        out,
        "Detected: {} ({})",
        p.accent.apply_to(&env.platform_name),
        env.shell.map_or("unknown", ShellKind::name)
    );
    if let Some(ref path) = env.config_file {
        let _ = writeln!(out, "Config:   {}\n", p.dim.apply_to(path.display()));
    }

    match install(env, date) {
        Ok(SetupOutcome::Installed { path }) => {
            let _ = writeln!(
                out,
                "{}\n",
                p.success.apply_to(format!("✓ Added aliases to {}", path.display()))
            );
            let _ = writeln!(out, "Added:");
            push_snippet(&mut out, env.shell, p);
            let _ = writeln!(out, "\n{}", p.header.apply_to("To activate now, run:"));
            let _ = writeln!(out, "  source {}\n", path.display());
            let _ = writeln!(out, "{}", p.dim.apply_to("Or restart your terminal."));
        }
        Ok(SetupOutcome::AlreadyPresent { path }) => {
            let _ = writeln!(
                out,
                "{}\n",
                p.warn.apply_to(format!(
                    "! RemOrch aliases already exist in {}",
                    path.display()
                ))
            );
            let _ = writeln!(out, "Current aliases:");
            push_snippet(&mut out, env.shell, p);
        }
        Err(e @ ConnectError::ShellDetection { .. }) => {
            tracing::warn!("{e}");
            let _ = writeln!(
                out,
                "{}\n",
                p.error.apply_to("Could not detect shell configuration file.")
            );
            let _ = writeln!(out, "Please manually add these lines to your shell config:\n");
            push_snippet(&mut out, env.shell, p);
        }
        Err(e) => {
            tracing::warn!("{e}");
            let _ = writeln!(out, "{}\n", p.error.apply_to(&e));
            let _ = writeln!(out, "Please manually add these lines:\n");
            push_snippet(&mut out, env.shell, p);
        }
    }
    out
}

fn push_snippet(out: &mut String, shell: Option<ShellKind>, p: &Palette) {
    for line in alias_lines(shell) {
        let _ = writeln!(out, "{}", p.dim.apply_to(format!("  {line}")));
    }
}
