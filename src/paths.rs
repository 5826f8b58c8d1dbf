use std::path::PathBuf;

/// Default config file: `~/.config/remorch/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("remorch")
        .join("config.toml")
}

/// Log directory: `~/.local/share/remorch/logs/`
pub fn logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("remorch")
        .join("logs")
}

/// Where the QR image for a run is written, keyed by session name.
pub fn qr_image_path(session: Option<&str>) -> PathBuf {
    let filename = match session {
        Some(s) => format!("remorch-qr-{s}.png"),
        None => "remorch-qr.png".to_string(),
    };
    std::env::temp_dir().join(filename)
}
