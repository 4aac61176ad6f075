// ── Runtime configuration ──
//
// These types describe how to reach the Dashboard and where the local
// input/output trees live. They carry credentials and paths but never read
// config files; the CLI builds them and hands them in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file (for TLS-inspecting proxies).
    CustomCa(PathBuf),
}

/// Configuration for talking to one Dashboard organization.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API root, e.g. `https://api.meraki.com/api/v1`.
    pub base_url: Url,
    pub api_key: SecretString,
    pub org_id: String,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for throttled (429) or 5xx responses.
    pub max_retries: u32,
}

/// Default lifetime of the network name to ID cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of days a backup entry is kept.
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 120;

/// Local directory layout.
///
/// ```text
/// <input>/vlans.json
/// <input>/sites.txt
/// <input>/sites/<site>/subnets.csv
/// <input>/sites/<site>/<vlan>/dhcp.json
/// <output>/sync_report.json
/// <backups>/<site>.json
/// <cache>/network_cache.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Workspace {
    /// A workspace rooted at `root` using the conventional sub-directories.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            input_dir: root.join("input"),
            output_dir: root.join("output"),
            backup_dir: root.join("backups"),
            cache_dir: root.join("cache"),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.input_dir.join("vlans.json")
    }

    pub fn site_list_path(&self) -> PathBuf {
        self.input_dir.join("sites.txt")
    }

    pub fn sites_dir(&self) -> PathBuf {
        self.input_dir.join("sites")
    }

    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.sites_dir().join(site)
    }

    /// Resolve a user-supplied input file against the input directory.
    /// Absolute paths are returned unchanged.
    pub fn input_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.input_dir.join(name)
    }

    pub fn run_report_path(&self) -> PathBuf {
        self.output_dir.join("sync_report.json")
    }

    pub fn vlan_report_path(&self) -> PathBuf {
        self.output_dir.join("vlan_report.json")
    }

    pub fn network_cache_path(&self) -> PathBuf {
        self.cache_dir.join("network_cache.json")
    }
}
