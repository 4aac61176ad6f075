//! Clap derive structures for the `sitesync` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sitesync -- keep Meraki sites in line with a declared VLAN layout
#[derive(Debug, Parser)]
#[command(
    name = "sitesync",
    version,
    about = "Reconcile VLANs, subnets, ports, and DHCP across Meraki sites",
    long_about = "Reads a VLAN catalog and per-site tables from the input directory,\n\
        compares them with what the Meraki Dashboard reports, and creates or\n\
        updates whatever differs. Nothing is ever deleted.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "SITESYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard organization ID (overrides profile)
    #[arg(long, env = "MERAKI_ORG_ID", global = true)]
    pub org_id: Option<String>,

    /// Dashboard API key (overrides every other credential source)
    #[arg(long, env = "SITESYNC_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Dashboard API root (overrides profile)
    #[arg(long, env = "SITESYNC_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SITESYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SITESYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Directory holding vlans.json, sites.txt, and sites/ (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory reports are written to (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring sites in line with the VLAN catalog and site tables
    Sync(SyncArgs),

    /// Report missing and mismatched VLANs across every site
    #[command(name = "vlans-report", alias = "report")]
    VlansReport,

    /// Create the input files for a new site
    Prep(PrepArgs),

    /// Inspect organization networks
    Sites(SitesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SYNC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
#[command(
    group(
        ArgGroup::new("target")
            .required(true)
            .args(["site_name", "site_names_file"])
    ),
    group(
        ArgGroup::new("tables")
            .required(true)
            .multiple(true)
            .args(["vlans", "ports"])
    )
)]
pub struct SyncArgs {
    /// Site (Dashboard network name) to reconcile
    #[arg(long, value_name = "NAME")]
    pub site_name: Option<String>,

    /// File in the input directory listing one site per line
    #[arg(long, value_name = "FILE")]
    pub site_names_file: Option<PathBuf>,

    /// Subnet table: a multi-site CSV with -m, else the file name under sites/<site>/
    #[arg(long, value_name = "FILE")]
    pub vlans: Option<String>,

    /// Port table: a multi-site CSV with -m, else the file name under sites/<site>/
    #[arg(long, value_name = "FILE")]
    pub ports: Option<String>,

    /// Tables are single files keyed by a site_name column
    #[arg(long, short = 'm')]
    pub multi_site: bool,

    /// Create VLANs the site is missing
    #[arg(short = 'a', long = "add-missing", requires = "vlans")]
    pub add_missing: bool,

    /// Update VLANs whose settings differ
    #[arg(short = 'u', long = "update-existing", requires = "vlans")]
    pub update_existing: bool,

    /// Classify and report without changing anything
    #[arg(long = "test", short = 't')]
    pub dry_run: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PREP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PrepArgs {
    /// Site (Dashboard network name) to prepare
    #[arg(long, value_name = "NAME")]
    pub site_name: String,

    /// Replace files that already exist
    #[arg(long)]
    pub force: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List networks in the organization
    #[command(alias = "ls")]
    List,

    /// Drop the cached site-name to network-ID map
    Refresh,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (org_id, base_url, api_key_env, ca_cert, timeout, max_retries)
        key: String,

        /// Value to set
        value: String,
    },

    /// Store the active profile's API key in the system keyring
    SetKey,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
