use std::path::Path;

use facet::Facet;

use crate::error::ConnectError;

pub const DEFAULT_SCHEME: &str = "remorch";
pub const DEFAULT_WEB_BASE: &str = "https://koshikawa-masato.github.io/remorch-web/";

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct Config {
    #[facet(default)]
    pub links: LinksConfig,
    #[facet(default)]
    pub qr: QrConfig,
    #[facet(default)]
    pub tmux: TmuxConfig,
    #[facet(default)]
    pub network: NetworkConfig,
}

/// Where the encoded payload is embedded.
#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct LinksConfig {
    #[facet(default = "remorch")]
    pub scheme: String,
    #[facet(default = "https://koshikawa-masato.github.io/remorch-web/")]
    pub web_base: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.into(),
            web_base: DEFAULT_WEB_BASE.into(),
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct QrConfig {
    #[facet(default = true)]
    pub open_viewer: bool,
    /// Module size in pixels passed to qrencode.
    #[facet(default = 10)]
    pub size: u32,
    #[facet(default = 2)]
    pub margin: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            open_viewer: true,
            size: 10,
            margin: 2,
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct TmuxConfig {
    #[facet(default = "tmux")]
    pub binary: String,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            binary: "tmux".into(),
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct NetworkConfig {
    /// Overlay-network CLI queried for its assigned address.
    #[facet(default = "tailscale")]
    pub overlay_cli: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            overlay_cli: "tailscale".into(),
        }
    }
}

// ── validation ────────────────────────────────────────────

fn validate_config(config: &Config) -> Result<(), ConnectError> {
    let scheme = &config.links.scheme;
    let scheme_ok = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(ConnectError::Validation {
            message: format!("links.scheme must be a valid URI scheme (got '{scheme}')"),
        });
    }

    let base = &config.links.web_base;
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConnectError::Validation {
            message: format!("links.web_base must be an http(s) URL (got '{base}')"),
        });
    }

    if !(1..=40).contains(&config.qr.size) {
        return Err(ConnectError::Validation {
            message: format!("qr.size must be between 1 and 40 (got {})", config.qr.size),
        });
    }

    if config.tmux.binary.trim().is_empty() {
        return Err(ConnectError::Validation {
            message: "tmux.binary must not be empty".into(),
        });
    }

    Ok(())
}

// ── public API ────────────────────────────────────────────

pub fn parse_config(contents: &str, path: &Path) -> Result<Config, ConnectError> {
    let config: Config = facet_toml::from_str(contents).map_err(|e| ConnectError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the config at `path`.
///
/// A missing file is only tolerated when `explicit` is false (the default
/// location); an explicitly requested file must exist.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config, ConnectError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConnectError::ConfigLoad {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let config = parse_config(&contents, path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
