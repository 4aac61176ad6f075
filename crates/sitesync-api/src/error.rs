use thiserror::Error;

/// Top-level error type for the `sitesync-api` crate.
///
/// Covers every failure mode of the Dashboard API surface: authentication,
/// transport, rate limiting, structured API errors, and payload decoding.
/// `sitesync-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The Dashboard rejected the API key (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The API key could not be encoded as a header value.
    #[error("Invalid API key")]
    InvalidApiKey,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Rate limited and the retry budget is exhausted.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Dashboard API ───────────────────────────────────────────────
    /// Structured error from the Dashboard (`{"errors": ["..."]}`).
    #[error("Dashboard API error (HTTP {status}): {}", .messages.join("; "))]
    Api { status: u16, messages: Vec<String> },

    /// The requested resource does not exist (HTTP 404).
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the API key was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::InvalidApiKey)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` when the Dashboard reports that the appliance is not
    /// in VLAN mode (single-LAN networks answer VLAN calls with HTTP 400).
    pub fn is_vlans_disabled(&self) -> bool {
        match self {
            Self::Api { messages, .. } => messages
                .iter()
                .any(|m| m.contains("VLANs are not enabled")),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_joins_messages() {
        let err = Error::Api {
            status: 400,
            messages: vec!["first".into(), "second".into()],
        };
        assert_eq!(
            err.to_string(),
            "Dashboard API error (HTTP 400): first; second"
        );
    }

    #[test]
    fn vlans_disabled_detection() {
        let err = Error::Api {
            status: 400,
            messages: vec!["VLANs are not enabled for this network".into()],
        };
        assert!(err.is_vlans_disabled());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 502,
            messages: Vec::new(),
        };
        assert!(err.is_transient());
    }
}
