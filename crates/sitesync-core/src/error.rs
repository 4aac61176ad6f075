// ── Core error types ──
//
// Domain errors for sitesync-core. Callers never see HTTP status codes or
// JSON envelopes directly; the `From<sitesync_api::Error>` impl translates
// transport-layer failures into the variants below.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Dashboard at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Dashboard request timed out")]
    Timeout,

    #[error("Rate limited by the Dashboard -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Site not found: {name}")]
    SiteNotFound { name: String },

    #[error("VLANs are not enabled for site {site}")]
    VlansDisabled { site: String },

    #[error("Port {port} does not exist on site {site}")]
    PortNotFound { site: String, port: u32 },

    #[error("VLAN {vlan_id} does not exist on site {site}")]
    VlanNotFound { site: String, vlan_id: u16 },

    // ── Input errors ─────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid input for site {site}: {}", summarize(.errors))]
    InvalidSite {
        site: String,
        errors: Vec<ValidationError>,
    },

    // ── Backup errors ────────────────────────────────────────────────
    #[error(transparent)]
    Backup(#[from] BackupError),

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Dashboard rejected the request: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Local I/O ────────────────────────────────────────────────────
    #[error("Cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse grouping of failures, carried into run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Lookup,
    Backup,
    Authentication,
    ControllerCall,
    Local,
}

impl CoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::InvalidSite { .. } => ErrorCategory::Validation,
            Self::SiteNotFound { .. }
            | Self::VlansDisabled { .. }
            | Self::PortNotFound { .. }
            | Self::VlanNotFound { .. } => ErrorCategory::Lookup,
            Self::Backup(_) => ErrorCategory::Backup,
            Self::AuthenticationFailed { .. } => ErrorCategory::Authentication,
            Self::ConnectionFailed { .. }
            | Self::Timeout
            | Self::RateLimited { .. }
            | Self::Api { .. } => ErrorCategory::ControllerCall,
            Self::Io { .. } | Self::Config { .. } | Self::Internal(_) => ErrorCategory::Local,
        }
    }

    /// Errors that make every further Dashboard call pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Input validation ─────────────────────────────────────────────────

/// A problem found while loading desired-state input files.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{source_name}: {reason}")]
    Malformed { source_name: String, reason: String },

    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("invalid CIDR '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("invalid IPv4 address '{value}'")]
    InvalidIp { value: String },

    #[error("invalid MAC address '{value}'")]
    InvalidMac { value: String },

    #[error("VLAN '{name}' has invalid ID {id} (expected 1-4094)")]
    InvalidVlanId { name: String, id: i64 },

    #[error("VLAN ID {id} is used by both '{first}' and '{second}'")]
    DuplicateVlanId {
        id: u16,
        first: String,
        second: String,
    },

    #[error("VLAN '{name}' is not in the VLAN catalog")]
    UnknownVlanName { name: String },

    #[error("port {port}: VLAN {vlan_id} is not in the VLAN catalog")]
    UnknownVlanId { port: u32, vlan_id: u16 },

    #[error("port {port} is listed more than once")]
    DuplicatePort { port: u32 },

    #[error("VLAN '{vlan}' is assigned more than one subnet")]
    DuplicateSubnet { vlan: String },

    #[error("port {port}: unknown port type '{value}' (expected access or trunk)")]
    InvalidPortType { port: String, value: String },

    #[error("port {port}: invalid secure flag '{value}' (expected y or n)")]
    InvalidSecureFlag { port: String, value: String },

    #[error("DHCP policy for VLAN '{vlan}' but the site assigns it no subnet")]
    DhcpWithoutSubnet { vlan: String },
}

// ── Backup errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup of site {site} failed: cannot write {}: {source}", .path.display())]
    Write {
        site: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Backup of site {site} failed: {source}")]
    Encode {
        site: String,
        source: serde_json::Error,
    },

    #[error("Backup of site {site} failed: {message}")]
    Unavailable { site: String, message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sitesync_api::Error> for CoreError {
    fn from(err: sitesync_api::Error) -> Self {
        match err {
            sitesync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sitesync_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "API key contains characters that cannot be sent".into(),
            },
            sitesync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            sitesync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sitesync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            sitesync_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            sitesync_api::Error::Api { status, messages } => CoreError::Api {
                message: messages.join("; "),
                status: Some(status),
            },
            sitesync_api::Error::NotFound { path } => CoreError::Api {
                message: format!("not found: {path}"),
                status: Some(404),
            },
            sitesync_api::Error::Deserialization { message, .. } => {
                CoreError::Internal(format!("unexpected Dashboard response: {message}"))
            }
        }
    }
}
