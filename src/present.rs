//! Human-readable output. Every function returns the text to print; styling
//! comes from the [`Palette`] passed in.

use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::path::Path;

use console::Style;

use crate::descriptor::ConnectionDescriptor;
use crate::qr::QrDisplay;
use crate::session::SessionResult;

const RULE: &str = "─────────────────────────────────────────";

#[derive(Debug, Clone)]
pub struct Palette {
    pub header: Style,
    pub accent: Style,
    pub success: Style,
    pub warn: Style,
    pub error: Style,
    pub dim: Style,
    pub bold: Style,
}

impl Palette {
    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold().force_styling(true),
            accent: Style::new().cyan().force_styling(true),
            success: Style::new().green().force_styling(true),
            warn: Style::new().yellow().force_styling(true),
            error: Style::new().red().force_styling(true),
            dim: Style::new().dim().force_styling(true),
            bold: Style::new().bold().force_styling(true),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            accent: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            bold: Style::new(),
        }
    }

    /// Colored when stdout is a terminal that supports it.
    pub fn for_stdout() -> Self {
        if console::colors_enabled() && console::Term::stdout().is_term() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

/// Everything the connection summary shows.
pub struct ConnectionSummary<'a> {
    pub descriptor: &'a ConnectionDescriptor,
    pub short_code: &'a str,
    pub web_url: &'a str,
    /// Set when the overlay CLI supplied the address.
    pub overlay_address: Option<Ipv4Addr>,
    pub sessions: &'a [String],
}

pub fn banner(p: &Palette) -> String {
    let mut out = String::from("\n");
    for line in [
        "┌─────────────────────────────────────────┐",
        "│         RemOrch Connect                 │",
        "│         AI CLI Remote Access            │",
        "└─────────────────────────────────────────┘",
    ] {
        let _ = writeln!(out, "{}", p.header.apply_to(line));
    }
    out
}

pub fn launch_header(p: &Palette, command: &str, session: &str) -> String {
    format!(
        "{} {command}\n{}  {session}\n",
        p.bold.apply_to("Starting:"),
        p.bold.apply_to("Session:"),
    )
}

pub fn session_outcome(p: &Palette, result: &SessionResult, session: &str, command: &str) -> String {
    match result {
        SessionResult::Created => format!(
            "{}\n{}\n",
            p.success.apply_to(format!("✓ Created tmux session \"{session}\"")),
            p.success.apply_to(format!("✓ Started \"{command}\"")),
        ),
        SessionResult::AlreadyExisted => format!(
            "{}\n",
            p.warn.apply_to(format!("→ Using existing session \"{session}\""))
        ),
        SessionResult::Failed(message) => format!(
            "{}\n",
            p.error.apply_to(format!("✗ Failed to create session: {message}"))
        ),
    }
}

pub fn connection_summary(p: &Palette, s: &ConnectionSummary<'_>) -> String {
    let d = s.descriptor;
    let mut out = String::new();
    let _ = writeln!(out, "{}", p.bold.apply_to("Connection Info:"));
    let _ = writeln!(out, "  Host:     {}", p.accent.apply_to(&d.host));
    let _ = writeln!(out, "  Port:     {}", d.port);
    let _ = writeln!(out, "  User:     {}", d.user);
    if let Some(ref session) = d.session {
        let _ = writeln!(out, "  Session:  {}", p.success.apply_to(session));
    }
    out.push('\n');

    if let Some(addr) = s.overlay_address {
        let _ = writeln!(out, "{}", p.success.apply_to(format!("  ✓ Tailscale detected: {addr}")));
    }
    if !s.sessions.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            p.success.apply_to(format!("  ✓ tmux sessions: {}", s.sessions.join(", ")))
        );
    }
    out
}

pub fn qr_section(p: &Palette, display: &QrDisplay, image: &Path, app_uri: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", p.header.apply_to("Scan with RemOrch app:"));
    match display {
        QrDisplay::Opened => {
            let _ = writeln!(
                out,
                "{}",
                p.success.apply_to(format!("  ✓ QR code opened: {}", image.display()))
            );
        }
        QrDisplay::Saved => {
            let _ = writeln!(
                out,
                "{}",
                p.success.apply_to(format!("  ✓ QR code saved: {}", image.display()))
            );
        }
        QrDisplay::Terminal(text) => out.push_str(text),
        QrDisplay::Unavailable => {
            let _ = writeln!(out, "  {}", p.accent.apply_to(app_uri));
            let _ = writeln!(
                out,
                "{}",
                p.dim.apply_to("  (could not render a QR code for this link)")
            );
        }
    }
    out
}

pub fn access_details(p: &Palette, s: &ConnectionSummary<'_>) -> String {
    let d = s.descriptor;
    let mut out = String::from("\n");
    let _ = writeln!(
        out,
        "Or enter code: {}\n",
        p.header.apply_to(s.short_code)
    );
    let _ = writeln!(out, "{}", p.dim.apply_to("Or open on your phone:"));
    let _ = writeln!(out, "  {}\n", p.accent.apply_to(s.web_url));

    let _ = writeln!(out, "{}", p.dim.apply_to(RULE));
    let _ = writeln!(out, "{}", p.dim.apply_to("Manual connection:"));
    let _ = writeln!(out, "{}", p.dim.apply_to(format!("  ssh {}@{}", d.user, d.host)));
    if let Some(ref session) = d.session {
        let _ = writeln!(out, "{}", p.dim.apply_to(format!("  tmux attach -t {session}")));
    }
    let _ = writeln!(out, "{}", p.dim.apply_to(RULE));
    out
}

pub fn attach_notice(p: &Palette) -> String {
    format!(
        "{}\n{}\n",
        p.bold.apply_to("Attaching to session..."),
        p.dim.apply_to("(Press Ctrl+B, then D to detach)"),
    )
}

pub fn background_notice(p: &Palette, session: &str) -> String {
    format!(
        "{}\n{}\n",
        p.dim.apply_to("Session running in background."),
        p.dim.apply_to(format!("Attach later with: tmux attach -t {session}")),
    )
}

pub fn detached_notice(p: &Palette, session: &str) -> String {
    format!(
        "\n{}\n{}\n{}\n",
        p.dim.apply_to(format!("Detached from session \"{session}\"")),
        p.dim.apply_to("Session continues running in background."),
        p.dim.apply_to(format!("Reattach with: tmux attach -t {session}")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(session: Option<&str>) -> ConnectionDescriptor {
        ConnectionDescriptor::at(
            Ipv4Addr::new(100, 64, 1, 2),
            "alice",
            session.map(String::from),
            1,
        )
    }

    #[test]
    fn summary_lists_host_user_and_session() {
        let d = descriptor(Some("claude"));
        let sessions = vec!["claude".to_string(), "work".to_string()];
        let s = ConnectionSummary {
            descriptor: &d,
            short_code: "A1B2-C3D4",
            web_url: "https://example.com/#abc",
            overlay_address: Some(Ipv4Addr::new(100, 64, 1, 2)),
            sessions: &sessions,
        };
        let text = connection_summary(&Palette::plain(), &s);
        assert!(text.contains("  Host:     100.64.1.2\n"));
        assert!(text.contains("  Port:     22\n"));
        assert!(text.contains("  User:     alice\n"));
        assert!(text.contains("  Session:  claude\n"));
        assert!(text.contains("✓ Tailscale detected: 100.64.1.2"));
        assert!(text.contains("✓ tmux sessions: claude, work"));
    }

    #[test]
    fn summary_omits_session_and_overlay_when_absent() {
        let d = descriptor(None);
        let s = ConnectionSummary {
            descriptor: &d,
            short_code: "A1B2-C3D4",
            web_url: "https://example.com/#abc",
            overlay_address: None,
            sessions: &[],
        };
        let text = connection_summary(&Palette::plain(), &s);
        assert!(!text.contains("Session:"));
        assert!(!text.contains("Tailscale"));
        assert!(!text.contains("tmux sessions"));
    }

    #[test]
    fn access_details_show_code_url_and_manual_steps() {
        let d = descriptor(Some("codex"));
        let s = ConnectionSummary {
            descriptor: &d,
            short_code: "0F0F-ABCD",
            web_url: "https://example.com/#payload",
            overlay_address: None,
            sessions: &[],
        };
        let text = access_details(&Palette::plain(), &s);
        assert!(text.contains("Or enter code: 0F0F-ABCD"));
        assert!(text.contains("  https://example.com/#payload"));
        assert!(text.contains("  ssh alice@100.64.1.2"));
        assert!(text.contains("  tmux attach -t codex"));
    }

    #[test]
    fn plain_palette_emits_no_escape_codes() {
        let text = banner(&Palette::plain());
        assert!(!text.contains('\x1b'));
        assert!(text.contains("RemOrch Connect"));
    }

    #[test]
    fn colored_palette_emits_escape_codes() {
        assert!(banner(&Palette::colored()).contains('\x1b'));
    }

    #[test]
    fn qr_section_falls_back_to_uri() {
        let text = qr_section(
            &Palette::plain(),
            &QrDisplay::Unavailable,
            Path::new("/tmp/remorch-qr.png"),
            "remorch://abc",
        );
        assert!(text.contains("remorch://abc"));
        assert!(text.contains("could not render a QR code"));
    }

    #[test]
    fn session_outcome_messages() {
        let p = Palette::plain();
        assert!(session_outcome(&p, &SessionResult::Created, "claude", "claude")
            .contains("Created tmux session \"claude\""));
        assert!(session_outcome(&p, &SessionResult::AlreadyExisted, "claude", "claude")
            .contains("Using existing session"));
        assert!(session_outcome(&p, &SessionResult::Failed("boom".into()), "claude", "claude")
            .contains("boom"));
    }
}
