// ── Change applicator ──
//
// Walks one site's plan in order, one controller call per queued delta.
// The site is backed up once, right before its first mutating call. A
// failing call is recorded against its delta and the walk continues; only
// a failed backup stops the site.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backup::{BackupHandle, BackupService};
use crate::controller::NetworkController;
use crate::error::{CoreError, ErrorCategory};
use crate::model::ObservedSite;
use crate::reconcile::{Delta, DeltaKind, Operation, SitePlan};

/// What happened to one delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Applied,
    /// Dry run: the call would have been made.
    WouldApply,
    /// Already matched; nothing to do.
    Unchanged,
    /// Differs, but the run's mode does not apply this kind of change.
    NotQueued,
    Failed {
        reason: String,
        category: ErrorCategory,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub subject: String,
    pub kind: DeltaKind,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemResult {
    fn new(delta: &Delta, status: ItemStatus) -> Self {
        Self {
            subject: delta.subject(),
            kind: delta.kind(),
            operation: delta.operation(),
            fields: delta.changed_fields(),
            status,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }
}

/// Result of applying one site's plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub items: Vec<ItemResult>,
    pub backup: Option<BackupHandle>,
}

pub struct Applicator<'a> {
    controller: &'a dyn NetworkController,
    backups: &'a dyn BackupService,
    dry_run: bool,
}

impl<'a> Applicator<'a> {
    pub fn new(
        controller: &'a dyn NetworkController,
        backups: &'a dyn BackupService,
        dry_run: bool,
    ) -> Self {
        Self {
            controller,
            backups,
            dry_run,
        }
    }

    /// Apply every queued delta of `plan`.
    ///
    /// `observed` is the state the plan was computed from; it is what gets
    /// backed up. No backup is taken when no delta gets as far as a
    /// controller call. Fails only when the backup cannot be taken, in
    /// which case no mutating call has been made.
    pub async fn apply(
        &self,
        plan: &SitePlan,
        observed: &ObservedSite,
    ) -> Result<ApplyOutcome, CoreError> {
        let site = plan.site.as_str();
        let mut outcome = ApplyOutcome::default();

        // VLANs a port or DHCP change may reference: those already on the
        // appliance plus those created during this walk.
        let mut available: BTreeSet<u16> = observed.vlans.iter().map(|v| v.id).collect();
        let mut halted: Option<(String, ErrorCategory)> = None;

        for planned in &plan.deltas {
            let delta = &planned.delta;
            if !planned.queued {
                let status = if delta.kind() == DeltaKind::MatchedNoop {
                    ItemStatus::Unchanged
                } else {
                    ItemStatus::NotQueued
                };
                outcome.items.push(ItemResult::new(delta, status));
                continue;
            }

            if let Some((reason, category)) = &halted {
                outcome.items.push(ItemResult::new(
                    delta,
                    ItemStatus::Failed {
                        reason: reason.clone(),
                        category: *category,
                    },
                ));
                continue;
            }

            let result = match check(site, delta, &available) {
                Ok(()) => {
                    if !self.dry_run && outcome.backup.is_none() {
                        outcome.backup = Some(self.backups.snapshot(site, observed).await?);
                    }
                    self.dispatch(site, delta, &mut available).await
                }
                Err(e) => Err(e),
            };
            let status = match result {
                Ok(()) if self.dry_run => {
                    info!(site, subject = %delta.subject(), operation = %delta.operation(), "would apply");
                    ItemStatus::WouldApply
                }
                Ok(()) => {
                    info!(site, subject = %delta.subject(), operation = %delta.operation(), "applied");
                    ItemStatus::Applied
                }
                Err(e) => {
                    warn!(site, subject = %delta.subject(), error = %e, "change failed");
                    if e.is_fatal() {
                        halted = Some((e.to_string(), e.category()));
                    }
                    ItemStatus::Failed {
                        reason: e.to_string(),
                        category: e.category(),
                    }
                }
            };
            outcome.items.push(ItemResult::new(delta, status));
        }

        Ok(outcome)
    }

    async fn dispatch(
        &self,
        site: &str,
        delta: &Delta,
        available: &mut BTreeSet<u16>,
    ) -> Result<(), CoreError> {
        match delta {
            Delta::Vlan(d) => match d.kind {
                DeltaKind::Missing => {
                    let plan = d.plan().ok_or_else(|| {
                        CoreError::Internal(format!(
                            "no subnet to create VLAN {} with",
                            d.definition.id
                        ))
                    })?;
                    if !self.dry_run {
                        self.controller.create_vlan(site, &plan).await?;
                    }
                    available.insert(plan.id);
                }
                DeltaKind::Mismatched => {
                    if !self.dry_run {
                        self.controller
                            .update_vlan(site, d.definition.id, &d.update())
                            .await?;
                    }
                }
                DeltaKind::MatchedNoop => {}
            },
            Delta::Port(d) => {
                if !self.dry_run {
                    self.controller
                        .update_port(site, d.desired.number, &d.update())
                        .await?;
                }
            }
            Delta::Dhcp(d) => {
                if !self.dry_run {
                    self.controller
                        .update_dhcp(site, d.vlan_id, &d.update())
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Failures known before any controller call: ports are never created,
/// and port or DHCP changes need their VLAN on the appliance.
fn check(site: &str, delta: &Delta, available: &BTreeSet<u16>) -> Result<(), CoreError> {
    match delta {
        Delta::Vlan(d) => {
            if d.kind == DeltaKind::Missing && d.subnet.is_none() {
                return Err(CoreError::Internal(format!(
                    "no subnet to create VLAN {} with",
                    d.definition.id
                )));
            }
            Ok(())
        }
        Delta::Port(d) => {
            if d.kind == DeltaKind::Missing {
                return Err(CoreError::PortNotFound {
                    site: site.to_owned(),
                    port: d.desired.number,
                });
            }
            require_vlan(site, available, d.desired.vlan_id)
        }
        Delta::Dhcp(d) => require_vlan(site, available, d.vlan_id),
    }
}

fn require_vlan(site: &str, available: &BTreeSet<u16>, vlan_id: u16) -> Result<(), CoreError> {
    if available.contains(&vlan_id) {
        Ok(())
    } else {
        debug!(site, vlan_id, "referenced VLAN is not on the appliance");
        Err(CoreError::VlanNotFound {
            site: site.to_owned(),
            vlan_id,
        })
    }
}
