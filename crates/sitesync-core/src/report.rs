// ── Run reports ──
//
// Per-site outcomes of a sync run, and the flat VLAN listing produced by
// report-only mode. Both serialize to JSON in the output directory.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::apply::{ApplyOutcome, ItemResult, ItemStatus};
use crate::backup::BackupHandle;
use crate::error::{CoreError, ErrorCategory};
use crate::orchestrator::{SiteFailure, SiteState};
use crate::reconcile::{DeltaKind, Operation, VlanDelta};

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), CoreError> {
    let io_err = |source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::Internal(format!("cannot encode report: {e}")))?;
    std::fs::write(path, body).map_err(io_err)
}

// ── Sync run ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiteCounts {
    pub created: usize,
    pub updated: usize,
    pub matched: usize,
    pub failed: usize,
    pub would_apply: usize,
    /// Differing, but excluded by the run's mode.
    pub skipped: usize,
}

impl SiteCounts {
    fn tally(items: &[ItemResult]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match (&item.status, item.operation) {
                (ItemStatus::Applied, Operation::CreateVlan) => counts.created += 1,
                (ItemStatus::Applied, _) => counts.updated += 1,
                (ItemStatus::Unchanged, _) => counts.matched += 1,
                (ItemStatus::Failed { .. }, _) => counts.failed += 1,
                (ItemStatus::WouldApply, _) => counts.would_apply += 1,
                (ItemStatus::NotQueued, _) => counts.skipped += 1,
            }
        }
        counts
    }

    fn add(&mut self, other: &Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.matched += other.matched;
        self.failed += other.failed;
        self.would_apply += other.would_apply;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub site: String,
    pub state: SiteState,
    /// Stage the site was in when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<SiteState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub counts: SiteCounts,
    pub items: Vec<ItemResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Kept only when something went wrong, so the state can be restored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupHandle>,
}

impl SiteReport {
    pub fn completed(site: impl Into<String>, outcome: ApplyOutcome) -> Self {
        let counts = SiteCounts::tally(&outcome.items);
        let backup = outcome.backup.filter(|_| counts.failed > 0);
        Self {
            site: site.into(),
            state: SiteState::Done,
            failed_at: None,
            category: None,
            counts,
            items: outcome.items,
            errors: Vec::new(),
            backup,
        }
    }

    pub fn failed(failure: SiteFailure) -> Self {
        let errors = match &failure.error {
            CoreError::InvalidSite { errors, .. } => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        };
        Self {
            site: failure.site,
            state: SiteState::Failed,
            failed_at: Some(failure.stage),
            category: Some(failure.error.category()),
            counts: SiteCounts::default(),
            items: Vec::new(),
            errors,
            backup: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == SiteState::Failed || self.counts.failed > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub sites: Vec<SiteReport>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            sites: Vec::new(),
        }
    }

    pub fn push(&mut self, site: SiteReport) {
        self.sites.push(site);
    }

    #[must_use]
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn site(&self, name: &str) -> Option<&SiteReport> {
        self.sites.iter().find(|s| s.site == name)
    }

    /// True if any site failed or recorded a failed item.
    pub fn has_failures(&self) -> bool {
        self.sites.iter().any(SiteReport::is_failed)
    }

    pub fn totals(&self) -> SiteCounts {
        let mut totals = SiteCounts::default();
        for site in &self.sites {
            totals.add(&site.counts);
        }
        totals
    }

    pub fn write_json(&self, path: &Path) -> Result<(), CoreError> {
        write_json(self, path)
    }
}

// ── VLAN report ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum VlanStatus {
    Missing,
    Mismatched,
    Matched,
}

impl From<DeltaKind> for VlanStatus {
    fn from(kind: DeltaKind) -> Self {
        match kind {
            DeltaKind::Missing => Self::Missing,
            DeltaKind::Mismatched => Self::Mismatched,
            DeltaKind::MatchedNoop => Self::Matched,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanReportEntry {
    pub site: String,
    pub vlan: String,
    pub vlan_id: u16,
    pub status: VlanStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl VlanReportEntry {
    pub fn from_delta(site: &str, delta: &VlanDelta) -> Self {
        Self {
            site: site.to_owned(),
            vlan: delta.definition.name.clone(),
            vlan_id: delta.definition.id,
            status: delta.kind.into(),
            fields: delta.fields.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteError {
    pub site: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanReport {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<VlanReportEntry>,
    pub site_errors: Vec<SiteError>,
}

impl Default for VlanReport {
    fn default() -> Self {
        Self {
            generated_at: Utc::now(),
            entries: Vec::new(),
            site_errors: Vec::new(),
        }
    }
}

impl VlanReport {
    pub fn count(&self, status: VlanStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<(), CoreError> {
        write_json(self, path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(operation: Operation, status: ItemStatus) -> ItemResult {
        ItemResult {
            subject: "VLAN 2 (Guest)".into(),
            kind: DeltaKind::Missing,
            operation,
            fields: Vec::new(),
            status,
        }
    }

    fn handle() -> BackupHandle {
        BackupHandle {
            site: "X".into(),
            path: PathBuf::from("backups/X.json"),
            timestamp: "2026-03-01_10-00-00".into(),
        }
    }

    #[test]
    fn counts_follow_item_status() {
        let outcome = ApplyOutcome {
            items: vec![
                item(Operation::CreateVlan, ItemStatus::Applied),
                item(Operation::UpdatePort, ItemStatus::Applied),
                item(Operation::None, ItemStatus::Unchanged),
                item(Operation::UpdateVlan, ItemStatus::NotQueued),
            ],
            backup: Some(handle()),
        };
        let report = SiteReport::completed("X", outcome);
        assert_eq!(
            report.counts,
            SiteCounts {
                created: 1,
                updated: 1,
                matched: 1,
                skipped: 1,
                ..SiteCounts::default()
            }
        );
        // Nothing failed, so the backup is not carried.
        assert_eq!(report.backup, None);
        assert!(!report.is_failed());
    }

    #[test]
    fn backup_is_kept_when_an_item_failed() {
        let outcome = ApplyOutcome {
            items: vec![item(
                Operation::UpdatePort,
                ItemStatus::Failed {
                    reason: "Port 9 does not exist on site X".into(),
                    category: ErrorCategory::Lookup,
                },
            )],
            backup: Some(handle()),
        };
        let report = SiteReport::completed("X", outcome);
        assert_eq!(report.backup, Some(handle()));
        assert!(report.is_failed());
    }

    #[test]
    fn failed_site_lists_validation_errors() {
        let report = SiteReport::failed(SiteFailure {
            site: "X".into(),
            stage: SiteState::Loading,
            error: CoreError::InvalidSite {
                site: "X".into(),
                errors: vec![crate::error::ValidationError::DuplicatePort { port: 3 }],
            },
        });
        assert_eq!(report.state, SiteState::Failed);
        assert_eq!(report.failed_at, Some(SiteState::Loading));
        assert_eq!(report.errors, ["port 3 is listed more than once"]);

        let mut run = RunReport::new(false);
        run.push(report);
        assert!(run.has_failures());
    }

    #[test]
    fn run_report_serializes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/sync_report.json");
        let mut run = RunReport::new(true);
        run.push(SiteReport::completed(
            "X",
            ApplyOutcome {
                items: vec![item(Operation::CreateVlan, ItemStatus::WouldApply)],
                backup: None,
            },
        ));
        run.finish().write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["sites"][0]["state"], "Done");
        assert_eq!(json["sites"][0]["items"][0]["status"], "would_apply");
        assert_eq!(json["sites"][0]["items"][0]["operation"], "create_vlan");
        assert_eq!(json["sites"][0]["counts"]["would_apply"], 1);
    }
}
