use std::path::Path;
use std::process::Stdio;

use indicatif::{ProgressBar, ProgressStyle};
use qrcode::QrCode;
use qrcode::render::unicode;

use crate::config::QrConfig;
use crate::error::ConnectError;

/// How the QR code ended up in front of the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrDisplay {
    /// PNG written and handed to the platform image viewer.
    Opened,
    /// PNG written but no viewer could be launched.
    Saved,
    /// Rendered as text for the terminal.
    Terminal(String),
    /// The data could not be encoded as a QR code.
    Unavailable,
}

/// Write a PNG QR code for `data` to `path` using `qrencode`.
pub async fn write_png(data: &str, path: &Path, config: &QrConfig) -> Result<(), ConnectError> {
    let output = tokio::process::Command::new("qrencode")
        .arg("-o")
        .arg(path)
        .args(["-t", "PNG"])
        .arg("-s")
        .arg(config.size.to_string())
        .arg("-m")
        .arg(config.margin.to_string())
        .arg("--")
        .arg(data)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ConnectError::Io {
            context: "running qrencode".into(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(ConnectError::ExternalCommand {
            command: "qrencode".into(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tracing::info!(path = %path.display(), "wrote QR image");
    Ok(())
}

/// Render `data` as a compact Unicode block QR code, in-process.
pub fn render_terminal(data: &str) -> Result<String, ConnectError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| ConnectError::Validation {
        message: format!("encoding QR code: {e}"),
    })?;
    let text = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    Ok(format!("{text}\n"))
}

/// Program and leading arguments that open a file with the default viewer.
pub fn viewer_command() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(windows) {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    }
}

pub async fn open_in_viewer(path: &Path) -> Result<(), ConnectError> {
    let (program, args) = viewer_command();
    let status = tokio::process::Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| ConnectError::Io {
            context: format!("running {program}"),
            source: e,
        })?;

    if !status.success() {
        return Err(ConnectError::ExternalCommand {
            command: program.into(),
            message: format!("exited with {status}"),
        });
    }
    Ok(())
}

/// Produce a QR code for `data`: image + viewer first, terminal text second.
/// Only the image step needs `qrencode`.
pub async fn show(data: &str, path: &Path, config: &QrConfig, spinner: bool) -> QrDisplay {
    let bar = spinner.then(|| {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message("Generating QR code...");
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        bar
    });

    let written = write_png(data, path, config).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    match written {
        Ok(()) if !config.open_viewer => return QrDisplay::Saved,
        Ok(()) => match open_in_viewer(path).await {
            Ok(()) => return QrDisplay::Opened,
            Err(e) => tracing::debug!("could not open QR image: {e}"),
        },
        Err(e) => tracing::warn!("failed to generate QR image: {e}"),
    }

    match render_terminal(data) {
        Ok(text) => QrDisplay::Terminal(text),
        Err(e) => {
            tracing::debug!("terminal QR unavailable: {e}");
            if path.exists() {
                QrDisplay::Saved
            } else {
                QrDisplay::Unavailable
            }
        }
    }
}
