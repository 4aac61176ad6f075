//! Reconciliation of declarative VLAN, subnet, port, and DHCP configuration
//! against Meraki Dashboard sites.
//!
//! The crate is organized around one pass per site:
//!
//! - **[`loader`]** reads the VLAN catalog and the per-site tables into a
//!   validated [`DesiredState`]. A bad catalog fails the run; a bad site
//!   file only rejects that site.
//!
//! - **[`NetworkController`]** is the only way the core talks to the
//!   Dashboard. [`DashboardController`] implements it over `sitesync-api`.
//!
//! - **[`reconcile`]** diffs desired against observed state and yields an
//!   ordered [`SitePlan`] of `Missing` / `Mismatched` / `MatchedNoop` deltas.
//!   It never plans a deletion.
//!
//! - **[`Applicator`]** backs the site up through a [`BackupService`], then
//!   applies each queued delta and records its outcome.
//!
//! - **[`Orchestrator`]** drives the above across sites and builds the
//!   [`RunReport`]; [`vlan_report`] is the read-only counterpart.

pub mod apply;
pub mod backup;
pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod report;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{Applicator, ApplyOutcome, ItemResult, ItemStatus};
pub use backup::{BackupHandle, BackupService, FileBackupStore};
pub use config::{
    ControllerConfig, DEFAULT_BACKUP_RETENTION_DAYS, DEFAULT_CACHE_TTL, TlsVerification,
    Workspace,
};
pub use controller::{
    DashboardController, DhcpUpdate, Network, NetworkCache, NetworkController, ObservedDhcp,
    PortUpdate, VlanPlan, VlanUpdate,
};
pub use error::{BackupError, CoreError, ErrorCategory, ValidationError};
pub use loader::{LoadRequest, TableSource};
pub use orchestrator::{Orchestrator, RunOptions, SiteFailure, SiteState, observe, vlan_report};
pub use reconcile::{Delta, DeltaKind, Operation, ReconcileOptions, SitePlan};
pub use report::{RunReport, SiteCounts, SiteReport, VlanReport, VlanReportEntry, VlanStatus};

pub use model::{
    AccessPolicy, DesiredState, DhcpHandling, DhcpPolicy, DhcpSettings, MacAddress, ObservedPort,
    ObservedSite, ObservedVlan, PortSpec, PortType, SiteDesired, SubnetAssignment, SubnetPrefix,
    VlanCatalog, VlanDefinition,
};
