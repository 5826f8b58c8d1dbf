//! The connection descriptor handed to the companion app.
//!
//! Wire format (version 1): compact JSON with keys in the order
//! `v, h, p, u, s, t`, base64-encoded with the standard alphabet. The same
//! payload goes into the app URI and the web-page fragment.

use std::net::Ipv4Addr;
use std::time::SystemTime;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use facet::Facet;
use rand_core::{OsRng, RngCore};

use crate::error::ConnectError;

pub const SCHEMA_VERSION: u32 = 1;
pub const SSH_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct ConnectionDescriptor {
    #[facet(rename = "v")]
    pub version: u32,
    #[facet(rename = "h")]
    pub host: String,
    #[facet(rename = "p")]
    pub port: u16,
    #[facet(rename = "u")]
    pub user: String,
    #[facet(rename = "s")]
    pub session: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[facet(rename = "t")]
    pub timestamp: u64,
}

impl ConnectionDescriptor {
    pub fn new(host: Ipv4Addr, user: impl Into<String>, session: Option<String>) -> Self {
        Self::at(host, user, session, now_millis())
    }

    pub fn at(
        host: Ipv4Addr,
        user: impl Into<String>,
        session: Option<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            version: SCHEMA_VERSION,
            host: host.to_string(),
            port: SSH_PORT,
            user: user.into(),
            session,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDescriptor {
    pub payload: String,
    pub short_code: String,
}

impl EncodedDescriptor {
    /// `<scheme>://<payload>`, opened by the companion app.
    pub fn app_uri(&self, scheme: &str) -> String {
        format!("{scheme}://{}", self.payload)
    }

    /// `<base>#<payload>`, for phones without the app installed.
    pub fn web_url(&self, base: &str) -> String {
        format!("{base}#{}", self.payload)
    }
}

pub fn encode(descriptor: &ConnectionDescriptor) -> Result<EncodedDescriptor, ConnectError> {
    let json = facet_json::to_string(descriptor).map_err(|e| ConnectError::Validation {
        message: format!("serializing connection descriptor: {e}"),
    })?;
    Ok(EncodedDescriptor {
        payload: STANDARD.encode(json.as_bytes()),
        short_code: generate_short_code(),
    })
}

pub fn decode(payload: &str) -> Result<ConnectionDescriptor, ConnectError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ConnectError::PayloadDecode {
            message: format!("not base64: {e}"),
        })?;
    let json = String::from_utf8(bytes).map_err(|_| ConnectError::PayloadDecode {
        message: "payload is not UTF-8".into(),
    })?;
    let descriptor: ConnectionDescriptor =
        facet_json::from_str(&json).map_err(|e| ConnectError::PayloadDecode {
            message: e.to_string(),
        })?;

    if descriptor.version != SCHEMA_VERSION {
        return Err(ConnectError::PayloadDecode {
            message: format!("unsupported version {}", descriptor.version),
        });
    }
    if descriptor.host.parse::<Ipv4Addr>().is_err() {
        return Err(ConnectError::PayloadDecode {
            message: format!("host '{}' is not an IPv4 address", descriptor.host),
        });
    }
    Ok(descriptor)
}

// ── short code ────────────────────────────────────────────

/// Fresh `XXXX-XXXX` code from the OS RNG. Not tied to the descriptor.
pub fn generate_short_code() -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    short_code_from_bytes(bytes)
}

pub fn short_code_from_bytes(bytes: [u8; 4]) -> String {
    format!(
        "{:02X}{:02X}-{:02X}{:02X}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Login name of the current user.
pub fn current_user() -> Result<String, ConnectError> {
    resolve_user(|var| std::env::var(var).ok(), account_name)
}

/// Login name from the environment, then from the account database.
fn resolve_user(
    env: impl Fn(&str) -> Option<String>,
    lookup: impl FnOnce() -> Option<String>,
) -> Result<String, ConnectError> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|var| env(var).filter(|v| !v.trim().is_empty()))
        .or_else(|| lookup().filter(|v| !v.is_empty()))
        .ok_or(ConnectError::UnknownUser)
}

/// Name of the effective uid as recorded in passwd, via `id -un`.
fn account_name() -> Option<String> {
    let output = std::process::Command::new("id")
        .arg("-un")
        .stdin(std::process::Stdio::null())
        .output()
        .map_err(|e| tracing::debug!("id not available: {e}"))
        .ok()?;
    if !output.status.success() {
        tracing::debug!(status = %output.status, "id -un failed");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
