//! tmux session management: create-if-missing, list, attach.
//!
//! All tmux calls take an argument vector; the user's command text only
//! ever reaches tmux as literal keystrokes, never through a host shell.

use std::process::{Command, Stdio};

use crate::error::ConnectError;

/// Outcome of [`ensure_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Created,
    AlreadyExisted,
    Failed(String),
}

/// Operations the launcher needs from a terminal multiplexer.
pub trait SessionBackend {
    fn has_session(&self, name: &str) -> bool;
    fn create_detached(&self, name: &str) -> Result<(), ConnectError>;
    /// Type `text` into the session and press Enter.
    fn submit(&self, name: &str, text: &str) -> Result<(), ConnectError>;
    fn list_sessions(&self) -> Vec<String>;
    /// Hand the terminal to the session until the user detaches.
    fn attach(&self, name: &str) -> Result<(), ConnectError>;
}

/// Derive a session name from a command: first token, ASCII alphanumerics only.
pub fn session_name_for(command: &str) -> Option<String> {
    let first = command.split_whitespace().next()?;
    let name: String = first.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (!name.is_empty()).then_some(name)
}

/// Make sure `name` exists and is running `command`. Never restarts an
/// existing session.
pub fn ensure_session(backend: &impl SessionBackend, name: &str, command: &str) -> SessionResult {
    if backend.has_session(name) {
        tracing::info!(session = name, "session already exists");
        return SessionResult::AlreadyExisted;
    }

    let created = backend
        .create_detached(name)
        .and_then(|()| backend.submit(name, command));

    match created {
        Ok(()) => {
            tracing::info!(session = name, command, "session created");
            SessionResult::Created
        }
        Err(e) => {
            tracing::warn!(session = name, "session creation failed: {e}");
            SessionResult::Failed(e.to_string())
        }
    }
}

// ── tmux ──────────────────────────────────────────────────

pub struct TmuxBackend {
    binary: String,
}

impl TmuxBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<(), ConnectError> {
        tracing::debug!(binary = %self.binary, ?args, "running tmux");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ConnectError::Io {
                context: format!("running {}", self.binary),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ConnectError::ExternalCommand {
                command: format!("{} {}", self.binary, args.first().unwrap_or(&"")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl SessionBackend for TmuxBackend {
    fn has_session(&self, name: &str) -> bool {
        // `=` forces an exact match instead of tmux's prefix matching
        let target = format!("={name}");
        self.run(&["has-session", "-t", target.as_str()]).is_ok()
    }

    fn create_detached(&self, name: &str) -> Result<(), ConnectError> {
        self.run(&["new-session", "-d", "-s", name])
    }

    fn submit(&self, name: &str, text: &str) -> Result<(), ConnectError> {
        self.run(&["send-keys", "-t", name, "-l", text])?;
        self.run(&["send-keys", "-t", name, "Enter"])
    }

    fn list_sessions(&self) -> Vec<String> {
        let output = Command::new(&self.binary)
            .args(["list-sessions", "-F", "#{session_name}"])
            .stdin(Stdio::null())
            .output();
        match output {
            Ok(o) if o.status.success() => parse_session_list(&String::from_utf8_lossy(&o.stdout)),
            _ => Vec::new(),
        }
    }

    fn attach(&self, name: &str) -> Result<(), ConnectError> {
        let status = Command::new(&self.binary)
            .args(["attach", "-t", name])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ConnectError::Io {
                context: format!("running {} attach", self.binary),
                source: e,
            })?;

        if !status.success() {
            tracing::warn!(session = name, "tmux attach exited with {status}");
        }
        Ok(())
    }
}

fn parse_session_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        sessions: RefCell<Vec<String>>,
        created: RefCell<Vec<String>>,
        submitted: RefCell<Vec<(String, String)>>,
        fail_create: bool,
    }

    impl SessionBackend for FakeBackend {
        fn has_session(&self, name: &str) -> bool {
            self.sessions.borrow().iter().any(|s| s == name)
        }

        fn create_detached(&self, name: &str) -> Result<(), ConnectError> {
            if self.fail_create {
                return Err(ConnectError::ExternalCommand {
                    command: "tmux new-session".into(),
                    message: "no server".into(),
                });
            }
            self.created.borrow_mut().push(name.to_string());
            self.sessions.borrow_mut().push(name.to_string());
            Ok(())
        }

        fn submit(&self, name: &str, text: &str) -> Result<(), ConnectError> {
            self.submitted
                .borrow_mut()
                .push((name.to_string(), text.to_string()));
            Ok(())
        }

        fn list_sessions(&self) -> Vec<String> {
            self.sessions.borrow().clone()
        }

        fn attach(&self, _name: &str) -> Result<(), ConnectError> {
            Ok(())
        }
    }

    #[test]
    fn second_call_reuses_session() {
        let backend = FakeBackend::default();
        assert_eq!(
            ensure_session(&backend, "claude", "claude"),
            SessionResult::Created
        );
        assert_eq!(
            ensure_session(&backend, "claude", "claude"),
            SessionResult::AlreadyExisted
        );
        assert_eq!(backend.created.borrow().len(), 1);
        assert_eq!(backend.submitted.borrow().len(), 1);
    }

    #[test]
    fn command_is_submitted_verbatim() {
        let backend = FakeBackend::default();
        ensure_session(&backend, "claude", "claude --resume \"$(id)\"");
        assert_eq!(
            backend.submitted.borrow()[0],
            ("claude".to_string(), "claude --resume \"$(id)\"".to_string())
        );
    }

    #[test]
    fn creation_failure_is_reported() {
        let backend = FakeBackend {
            fail_create: true,
            ..Default::default()
        };
        match ensure_session(&backend, "gemini", "gemini") {
            SessionResult::Failed(msg) => assert!(msg.contains("no server")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(backend.submitted.borrow().is_empty());
    }

    #[test]
    fn session_name_uses_first_token() {
        assert_eq!(session_name_for("claude --help").as_deref(), Some("claude"));
        assert_eq!(session_name_for("  codex  ").as_deref(), Some("codex"));
    }

    #[test]
    fn session_name_strips_non_alphanumerics() {
        assert_eq!(
            session_name_for("./my-tool.sh arg").as_deref(),
            Some("mytoolsh")
        );
        assert_eq!(session_name_for("foo:bar;rm").as_deref(), Some("foobarrm"));
    }

    #[test]
    fn session_name_rejects_empty() {
        assert_eq!(session_name_for(""), None);
        assert_eq!(session_name_for("--- x"), None);
    }

    #[test]
    fn parse_session_list_skips_blank_lines() {
        assert_eq!(
            parse_session_list("claude\n\ncodex\n"),
            vec!["claude".to_string(), "codex".to_string()]
        );
    }
}
