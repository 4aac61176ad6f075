// ── Multi-site orchestration ──
//
// Runs load → reconcile → apply for each site in turn. A site that fails at
// any stage becomes a failed entry in the report; the next site starts
// regardless.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::Display;
use tracing::{error, info, warn};

use crate::apply::Applicator;
use crate::backup::BackupService;
use crate::controller::NetworkController;
use crate::error::CoreError;
use crate::model::{DesiredState, ObservedSite, SiteDesired};
use crate::reconcile::{ReconcileOptions, reconcile_catalog, reconcile_site};
use crate::report::{RunReport, SiteError, SiteReport, VlanReport, VlanReportEntry};

/// Lifecycle of one site within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum SiteState {
    Pending,
    Loading,
    Reconciling,
    Applying,
    Done,
    Failed,
}

/// Why a site did not reach `Done`.
#[derive(Debug)]
pub struct SiteFailure {
    pub site: String,
    /// The stage that was running when the error occurred.
    pub stage: SiteState,
    pub error: CoreError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub reconcile: ReconcileOptions,
    pub dry_run: bool,
}

struct SiteProgress<'s> {
    site: &'s str,
    state: SiteState,
}

impl<'s> SiteProgress<'s> {
    fn new(site: &'s str) -> Self {
        Self {
            site,
            state: SiteState::Pending,
        }
    }

    fn advance(&mut self, next: SiteState) {
        info!(site = self.site, from = %self.state, to = %next, "site state");
        self.state = next;
    }

    fn fail(&self, error: CoreError) -> SiteFailure {
        error!(site = self.site, stage = %self.state, error = %error, "site failed");
        SiteFailure {
            site: self.site.to_owned(),
            stage: self.state,
            error,
        }
    }
}

pub struct Orchestrator<'a> {
    controller: &'a dyn NetworkController,
    backups: &'a dyn BackupService,
    desired: &'a DesiredState,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        controller: &'a dyn NetworkController,
        backups: &'a dyn BackupService,
        desired: &'a DesiredState,
        options: RunOptions,
    ) -> Self {
        Self {
            controller,
            backups,
            desired,
            options,
        }
    }

    /// Process every site in order and collect the outcomes.
    pub async fn run(&self, sites: &[String]) -> RunReport {
        let mut report = RunReport::new(self.options.dry_run);
        for site in sites {
            let entry = match self.run_site(site).await {
                Ok(done) => done,
                Err(failure) => SiteReport::failed(failure),
            };
            report.push(entry);
        }
        report.finish()
    }

    pub async fn run_site(&self, site: &str) -> Result<SiteReport, SiteFailure> {
        let mut progress = SiteProgress::new(site);

        progress.advance(SiteState::Loading);
        let desired = self.desired.site(site).map_err(|e| progress.fail(e))?;
        let observed = observe(self.controller, site, &desired)
            .await
            .map_err(|e| progress.fail(e))?;

        progress.advance(SiteState::Reconciling);
        let plan = reconcile_site(
            site,
            &self.desired.catalog,
            &desired,
            &observed,
            self.options.reconcile,
        )
        .map_err(|e| progress.fail(e))?;

        progress.advance(SiteState::Applying);
        let outcome = Applicator::new(self.controller, self.backups, self.options.dry_run)
            .apply(&plan, &observed)
            .await
            .map_err(|e| progress.fail(e))?;

        progress.advance(SiteState::Done);
        Ok(SiteReport::completed(site, outcome))
    }
}

/// Fetch what the plan for `desired` needs to compare against.
///
/// Ports are read only when a port table was given; DHCP only for VLANs
/// that have a policy and already exist.
pub async fn observe(
    controller: &dyn NetworkController,
    site: &str,
    desired: &SiteDesired,
) -> Result<ObservedSite, CoreError> {
    let vlans = controller.fetch_vlans(site).await?;

    let ports = match desired.ports {
        Some(_) => Some(controller.fetch_ports(site).await?),
        None => None,
    };

    let mut dhcp = BTreeMap::new();
    for policy in &desired.dhcp {
        if vlans.iter().any(|v| v.id == policy.vlan_id) {
            let settings = controller.fetch_dhcp(site, policy.vlan_id).await?;
            dhcp.insert(policy.vlan_id, settings);
        }
    }

    Ok(ObservedSite { vlans, ports, dhcp })
}

/// Compare the VLAN catalog against every site in the organization.
///
/// Per-site fetch errors are listed in the report; only errors that make
/// further calls pointless abort it.
pub async fn vlan_report(
    controller: &dyn NetworkController,
    desired: &DesiredState,
) -> Result<VlanReport, CoreError> {
    let mut report = VlanReport::default();
    for site in controller.list_sites().await? {
        let observed = match controller.fetch_vlans(&site).await {
            Ok(vlans) => vlans,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(site = %site, error = %e, "cannot read VLANs");
                report.site_errors.push(SiteError {
                    site,
                    error: e.to_string(),
                });
                continue;
            }
        };
        let deltas = reconcile_catalog(&desired.catalog, desired.sites.get(&site), &observed);
        report
            .entries
            .extend(deltas.iter().map(|d| VlanReportEntry::from_delta(&site, d)));
    }
    info!(
        entries = report.entries.len(),
        failed_sites = report.site_errors.len(),
        "VLAN report complete"
    );
    Ok(report)
}
