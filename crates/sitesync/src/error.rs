//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sitesync_config::ConfigError;
use sitesync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const INPUT: i32 = 5;
    pub const SITES_FAILED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Dashboard at {url}")]
    #[diagnostic(
        code(sitesync::connection_failed),
        help(
            "Check network access and the profile's base_url.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Dashboard request timed out")]
    #[diagnostic(
        code(sitesync::timeout),
        help("Increase the timeout with --timeout or in the profile.")
    )]
    Timeout,

    #[error("Rate limited by the Dashboard")]
    #[diagnostic(
        code(sitesync::rate_limited),
        help("Retry after {retry_after_secs}s, or raise max_retries in the profile.")
    )]
    RateLimited { retry_after_secs: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(sitesync::auth_failed),
        help(
            "Verify the API key has access to the organization.\n\
             Run: sitesync config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(sitesync::no_credentials),
        help(
            "Configure one with: sitesync config init\n\
             Or set the MERAKI_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sitesync::not_found),
        help("Run: sitesync {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("VLANs are not enabled for site '{site}'")]
    #[diagnostic(
        code(sitesync::vlans_disabled),
        help("Enable VLANs on the site's appliance in the Dashboard first.")
    )]
    VlansDisabled { site: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Dashboard rejected the request: {message}")]
    #[diagnostic(code(sitesync::api_error))]
    ApiError { message: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid input: {message}")]
    #[diagnostic(
        code(sitesync::input),
        help("Fix the file named above and run again.")
    )]
    Input { message: String },

    #[error("VLAN catalog not found at {path}")]
    #[diagnostic(
        code(sitesync::no_catalog),
        help(
            "Copy samples/vlans.json into the input directory and edit it\n\
             to describe your organization's VLANs."
        )
    )]
    NoCatalog { path: String },

    #[error("VLAN catalog at {path} is still the unmodified sample")]
    #[diagnostic(
        code(sitesync::sample_catalog),
        help("Edit vlans.json to describe your organization's VLANs before preparing sites.")
    )]
    SampleCatalog { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sitesync::validation))]
    Validation { field: String, reason: String },

    // ── Run outcome ──────────────────────────────────────────────────
    #[error("{failed} of {total} site(s) did not complete cleanly")]
    #[diagnostic(
        code(sitesync::sites_failed),
        help("See {report} for the per-site details.")
    )]
    SitesFailed {
        failed: usize,
        total: usize,
        report: String,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sitesync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sitesync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(sitesync::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Cannot access {path}: {source}")]
    #[diagnostic(code(sitesync::io))]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(sitesync::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RateLimited { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::VlansDisabled { .. } => exit_code::NOT_FOUND,
            Self::Input { .. } | Self::NoCatalog { .. } | Self::SampleCatalog { .. } => {
                exit_code::INPUT
            }
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            Self::SitesFailed { .. } => exit_code::SITES_FAILED,
            Self::Config(_)
            | Self::ApiError { .. }
            | Self::File { .. }
            | Self::Io(_)
            | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::RateLimited { retry_after_secs } => Self::RateLimited { retry_after_secs },

            CoreError::SiteNotFound { name } => Self::NotFound {
                resource_type: "Site".into(),
                identifier: name,
                list_command: "sites list".into(),
            },
            CoreError::VlansDisabled { site } => Self::VlansDisabled { site },
            CoreError::PortNotFound { site, port } => Self::NotFound {
                resource_type: "Port".into(),
                identifier: format!("{port} at {site}"),
                list_command: "sites list".into(),
            },
            CoreError::VlanNotFound { site, vlan_id } => Self::NotFound {
                resource_type: "VLAN".into(),
                identifier: format!("{vlan_id} at {site}"),
                list_command: "vlans-report".into(),
            },

            e @ (CoreError::Validation(_) | CoreError::InvalidSite { .. }) => Self::Input {
                message: e.to_string(),
            },

            CoreError::Api { message, .. } => Self::ApiError { message },
            CoreError::Io { path, source } => Self::File {
                path: path.display().to_string(),
                source,
            },
            e @ CoreError::Backup(_) => Self::Internal(e.to_string()),
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "run `sitesync config profiles`".into(),
            },
            other => Self::Config(other),
        }
    }
}
