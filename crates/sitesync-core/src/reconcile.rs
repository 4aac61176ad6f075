// ── Reconciliation engine ──
//
// Pure comparison of desired against observed state for one site. Produces
// an ordered delta list (VLANs, then ports, then DHCP) and marks which
// deltas the run's mode allows to be applied. Nothing here performs I/O,
// and nothing here ever deletes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::controller::{DhcpUpdate, PortUpdate, VlanPlan, VlanUpdate};
use crate::error::CoreError;
use crate::model::{
    DhcpHandling, DhcpPolicy, DhcpSettings, ObservedPort, ObservedSite, ObservedVlan, PortSpec,
    SiteDesired, SubnetPrefix, VlanCatalog, VlanDefinition,
};

// ── Classification ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum DeltaKind {
    /// Desired but absent from the controller.
    Missing,
    /// Present on both sides with differing fields.
    Mismatched,
    /// Identical; never applied.
    MatchedNoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VlanField {
    Name,
    Subnet,
    ApplianceIp,
    VpnMode,
    DhcpHandling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PortField {
    #[serde(rename = "type")]
    #[strum(serialize = "type")]
    PortType,
    Vlan,
    AccessPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "key", rename_all = "snake_case")]
pub enum DhcpField {
    DnsNameservers,
    LeaseTime,
    Option(String),
    Reservation(Ipv4Addr),
    ReservedRange(Ipv4Addr),
}

impl fmt::Display for DhcpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsNameservers => f.write_str("dns_nameservers"),
            Self::LeaseTime => f.write_str("lease_time"),
            Self::Option(code) => write!(f, "option {code}"),
            Self::Reservation(ip) => write!(f, "reservation {ip}"),
            Self::ReservedRange(start) => write!(f, "reserved_range {start}"),
        }
    }
}

/// One differing DHCP setting or entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpChange {
    pub field: DhcpField,
    /// `Missing` for desired-only entries, `Mismatched` for changed ones.
    pub kind: DeltaKind,
}

// ── Deltas ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanDelta {
    pub kind: DeltaKind,
    pub definition: VlanDefinition,
    /// The site's subnet for this VLAN, if one is assigned.
    pub subnet: Option<SubnetPrefix>,
    pub observed: Option<ObservedVlan>,
    pub fields: Vec<VlanField>,
}

impl VlanDelta {
    /// Creation request; `None` without a subnet to create it with.
    pub fn plan(&self) -> Option<VlanPlan> {
        self.subnet.map(|subnet| VlanPlan {
            id: self.definition.id,
            name: self.definition.name.clone(),
            subnet,
            vpn_enabled: self.definition.vpn_enabled,
            dhcp_enabled: self.definition.dhcp_enabled,
        })
    }

    /// Update carrying only the differing fields.
    pub fn update(&self) -> VlanUpdate {
        let has = |field| self.fields.contains(&field);
        let subnet_changed = has(VlanField::Subnet);
        VlanUpdate {
            name: has(VlanField::Name).then(|| self.definition.name.clone()),
            subnet: self.subnet.filter(|_| subnet_changed),
            appliance_ip: self
                .subnet
                .filter(|_| subnet_changed || has(VlanField::ApplianceIp))
                .map(|s| s.address()),
            vpn_enabled: has(VlanField::VpnMode).then_some(self.definition.vpn_enabled),
            dhcp_handling: has(VlanField::DhcpHandling)
                .then(|| DhcpHandling::for_enabled(self.definition.dhcp_enabled)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDelta {
    pub kind: DeltaKind,
    pub desired: PortSpec,
    pub observed: Option<ObservedPort>,
    pub fields: Vec<PortField>,
}

impl PortDelta {
    /// Update carrying only the differing fields.
    pub fn update(&self) -> PortUpdate {
        let has = |field| self.fields.contains(&field);
        PortUpdate {
            port_type: has(PortField::PortType).then_some(self.desired.port_type),
            vlan: has(PortField::Vlan).then_some(self.desired.vlan_id),
            access_policy: if has(PortField::AccessPolicy) {
                self.desired.access_policy()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpDelta {
    pub kind: DeltaKind,
    pub vlan_name: String,
    pub vlan_id: u16,
    pub desired: DhcpSettings,
    pub observed: DhcpSettings,
    pub changes: Vec<DhcpChange>,
}

impl DhcpDelta {
    /// Update for the changed settings. Collections are merged: observed
    /// entries stay, desired entries are added or replace the same key.
    pub fn update(&self) -> DhcpUpdate {
        let touched = |pick: fn(&DhcpField) -> bool| self.changes.iter().any(|c| pick(&c.field));
        let mut update = DhcpUpdate::default();

        if touched(|f| matches!(f, DhcpField::DnsNameservers)) {
            update.dns_nameservers.clone_from(&self.desired.dns_nameservers);
        }
        if touched(|f| matches!(f, DhcpField::LeaseTime)) {
            update.lease_time.clone_from(&self.desired.lease_time);
        }
        if touched(|f| matches!(f, DhcpField::Option(_))) {
            let mut merged = self.observed.options.clone();
            merged.extend(self.desired.options.clone());
            update.options = Some(merged.into_values().collect());
        }
        if touched(|f| matches!(f, DhcpField::Reservation(_))) {
            // The Dashboard keys reservations by MAC: a client moved to a
            // new address must not keep its old entry.
            let claimed: BTreeSet<_> = self.desired.reservations.values().map(|r| r.mac).collect();
            let mut merged = self.observed.reservations.clone();
            merged.retain(|_, r| !claimed.contains(&r.mac));
            merged.extend(self.desired.reservations.clone());
            update.reservations = Some(merged);
        }
        if touched(|f| matches!(f, DhcpField::ReservedRange(_))) {
            let mut merged = self.observed.reserved_ranges.clone();
            merged.extend(self.desired.reserved_ranges.clone());
            update.reserved_ranges = Some(merged);
        }
        update
    }
}

/// The controller operation a delta maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    CreateVlan,
    UpdateVlan,
    UpdatePort,
    UpdateDhcp,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Delta {
    Vlan(VlanDelta),
    Port(PortDelta),
    Dhcp(DhcpDelta),
}

impl Delta {
    pub fn kind(&self) -> DeltaKind {
        match self {
            Self::Vlan(d) => d.kind,
            Self::Port(d) => d.kind,
            Self::Dhcp(d) => d.kind,
        }
    }

    pub fn operation(&self) -> Operation {
        match (self, self.kind()) {
            (_, DeltaKind::MatchedNoop) => Operation::None,
            (Self::Vlan(_), DeltaKind::Missing) => Operation::CreateVlan,
            (Self::Vlan(_), DeltaKind::Mismatched) => Operation::UpdateVlan,
            (Self::Port(_), _) => Operation::UpdatePort,
            (Self::Dhcp(_), _) => Operation::UpdateDhcp,
        }
    }

    /// Human-readable name of the entity, e.g. `VLAN 20 (Voice)`.
    pub fn subject(&self) -> String {
        match self {
            Self::Vlan(d) => format!("VLAN {} ({})", d.definition.id, d.definition.name),
            Self::Port(d) => format!("port {}", d.desired.number),
            Self::Dhcp(d) => format!("DHCP on VLAN {} ({})", d.vlan_id, d.vlan_name),
        }
    }

    pub fn changed_fields(&self) -> Vec<String> {
        match self {
            Self::Vlan(d) => d.fields.iter().map(ToString::to_string).collect(),
            Self::Port(d) => d.fields.iter().map(ToString::to_string).collect(),
            Self::Dhcp(d) => d.changes.iter().map(|c| c.field.to_string()).collect(),
        }
    }
}

// ── Site plan ────────────────────────────────────────────────────────

/// Which kinds of VLAN delta a run may apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// `-a`: create missing VLANs and configure their DHCP.
    pub add_missing: bool,
    /// `-u`: correct mismatched VLANs and DHCP on existing VLANs.
    pub update_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDelta {
    pub delta: Delta,
    pub queued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitePlan {
    pub site: String,
    pub deltas: Vec<PlannedDelta>,
}

impl SitePlan {
    pub fn queued(&self) -> impl Iterator<Item = &Delta> {
        self.deltas.iter().filter(|d| d.queued).map(|d| &d.delta)
    }

    pub fn has_queued(&self) -> bool {
        self.deltas.iter().any(|d| d.queued)
    }

    /// True when every delta is `MatchedNoop`.
    pub fn is_converged(&self) -> bool {
        self.deltas
            .iter()
            .all(|d| d.delta.kind() == DeltaKind::MatchedNoop)
    }
}

/// Compute the ordered delta list for one site.
pub fn reconcile_site(
    site: &str,
    catalog: &VlanCatalog,
    desired: &SiteDesired,
    observed: &ObservedSite,
    options: ReconcileOptions,
) -> Result<SitePlan, CoreError> {
    let mut deltas = Vec::new();

    for assignment in &desired.subnets {
        let definition = catalog.by_id(assignment.vlan_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "VLAN {} is assigned at {site} but missing from the catalog",
                assignment.vlan_id
            ))
        })?;
        let delta = diff_vlan(
            definition,
            Some(assignment.prefix),
            observed.vlan(assignment.vlan_id),
        );
        let queued = match delta.kind {
            DeltaKind::Missing => options.add_missing,
            DeltaKind::Mismatched => options.update_existing,
            DeltaKind::MatchedNoop => false,
        };
        push(site, &mut deltas, Delta::Vlan(delta), queued);
    }

    if let Some(ports) = &desired.ports {
        for spec in ports {
            let delta = diff_port(spec, observed.port(spec.number));
            let queued = delta.kind != DeltaKind::MatchedNoop;
            push(site, &mut deltas, Delta::Port(delta), queued);
        }
    }

    for policy in &desired.dhcp {
        let vlan_missing = observed.vlan(policy.vlan_id).is_none();
        let delta = diff_dhcp(policy, observed.dhcp.get(&policy.vlan_id), vlan_missing);
        let allowed = if vlan_missing {
            options.add_missing
        } else {
            options.update_existing
        };
        let queued = allowed && delta.kind != DeltaKind::MatchedNoop;
        push(site, &mut deltas, Delta::Dhcp(delta), queued);
    }

    Ok(SitePlan {
        site: site.to_owned(),
        deltas,
    })
}

fn push(site: &str, deltas: &mut Vec<PlannedDelta>, delta: Delta, queued: bool) {
    debug!(
        site,
        subject = %delta.subject(),
        kind = %delta.kind(),
        queued,
        fields = ?delta.changed_fields(),
        "classified"
    );
    deltas.push(PlannedDelta { delta, queued });
}

/// Compare every catalog VLAN against a site's VLANs, using the site's
/// subnets where known. Used by the report-only mode.
pub fn reconcile_catalog(
    catalog: &VlanCatalog,
    desired: Option<&SiteDesired>,
    observed: &[ObservedVlan],
) -> Vec<VlanDelta> {
    catalog
        .iter()
        .map(|definition| {
            let subnet = desired
                .and_then(|d| d.subnet_for(definition.id))
                .map(|s| s.prefix);
            let current = observed.iter().find(|v| v.id == definition.id);
            diff_vlan(definition, subnet, current)
        })
        .collect()
}

// ── Per-entity comparison ────────────────────────────────────────────

pub fn diff_vlan(
    definition: &VlanDefinition,
    subnet: Option<SubnetPrefix>,
    observed: Option<&ObservedVlan>,
) -> VlanDelta {
    let Some(current) = observed else {
        return VlanDelta {
            kind: DeltaKind::Missing,
            definition: definition.clone(),
            subnet,
            observed: None,
            fields: Vec::new(),
        };
    };

    let mut fields = Vec::new();
    if current.name != definition.name {
        fields.push(VlanField::Name);
    }
    if let Some(prefix) = subnet {
        if !current.subnet.is_some_and(|s| s.same_network(&prefix)) {
            fields.push(VlanField::Subnet);
        }
        if current.appliance_ip != Some(prefix.address()) {
            fields.push(VlanField::ApplianceIp);
        }
    }
    if current.vpn_enabled.is_some_and(|v| v != definition.vpn_enabled) {
        fields.push(VlanField::VpnMode);
    }
    if current.runs_dhcp_server() != definition.dhcp_enabled {
        fields.push(VlanField::DhcpHandling);
    }

    VlanDelta {
        kind: classify(fields.is_empty()),
        definition: definition.clone(),
        subnet,
        observed: Some(current.clone()),
        fields,
    }
}

pub fn diff_port(desired: &PortSpec, observed: Option<&ObservedPort>) -> PortDelta {
    let Some(current) = observed else {
        return PortDelta {
            kind: DeltaKind::Missing,
            desired: desired.clone(),
            observed: None,
            fields: Vec::new(),
        };
    };

    let mut fields = Vec::new();
    if !current
        .port_type
        .eq_ignore_ascii_case(&desired.port_type.to_string())
    {
        fields.push(PortField::PortType);
    }
    if current.vlan != Some(desired.vlan_id) {
        fields.push(PortField::Vlan);
    }
    if let Some(policy) = desired.access_policy() {
        if current.access_policy.as_deref() != Some(policy.as_str()) {
            fields.push(PortField::AccessPolicy);
        }
    }

    PortDelta {
        kind: classify(fields.is_empty()),
        desired: desired.clone(),
        observed: Some(current.clone()),
        fields,
    }
}

pub fn diff_dhcp(
    policy: &DhcpPolicy,
    observed: Option<&DhcpSettings>,
    vlan_missing: bool,
) -> DhcpDelta {
    let current = observed.cloned().unwrap_or_default();
    let want = &policy.settings;
    let mut changes = Vec::new();

    scalar_change(
        &mut changes,
        DhcpField::DnsNameservers,
        want.dns_nameservers.as_ref(),
        current.dns_nameservers.as_ref(),
    );
    scalar_change(
        &mut changes,
        DhcpField::LeaseTime,
        want.lease_time.as_ref(),
        current.lease_time.as_ref(),
    );
    keyed_changes(
        &mut changes,
        &want.options,
        &current.options,
        |code| DhcpField::Option(code.clone()),
        |w, c| w == c,
    );
    keyed_changes(
        &mut changes,
        &want.reservations,
        &current.reservations,
        |ip| DhcpField::Reservation(*ip),
        |w, c| w.mac == c.mac && (w.name.is_none() || w.name == c.name),
    );
    keyed_changes(
        &mut changes,
        &want.reserved_ranges,
        &current.reserved_ranges,
        |start| DhcpField::ReservedRange(*start),
        |w, c| w.end == c.end && (w.comment.is_none() || w.comment == c.comment),
    );

    let kind = if vlan_missing {
        DeltaKind::Missing
    } else {
        classify(changes.is_empty())
    };
    DhcpDelta {
        kind,
        vlan_name: policy.vlan_name.clone(),
        vlan_id: policy.vlan_id,
        desired: want.clone(),
        observed: current,
        changes,
    }
}

fn classify(unchanged: bool) -> DeltaKind {
    if unchanged {
        DeltaKind::MatchedNoop
    } else {
        DeltaKind::Mismatched
    }
}

/// A desired scalar of `None` means "leave as is".
fn scalar_change(
    changes: &mut Vec<DhcpChange>,
    field: DhcpField,
    want: Option<&String>,
    current: Option<&String>,
) {
    let Some(want) = want else { return };
    match current {
        None => changes.push(DhcpChange {
            field,
            kind: DeltaKind::Missing,
        }),
        Some(current) if current != want => changes.push(DhcpChange {
            field,
            kind: DeltaKind::Mismatched,
        }),
        Some(_) => {}
    }
}

/// Desired-only keys are `Missing`, differing ones `Mismatched`;
/// observed-only keys are ignored.
fn keyed_changes<K: Ord, V>(
    changes: &mut Vec<DhcpChange>,
    want: &BTreeMap<K, V>,
    current: &BTreeMap<K, V>,
    field: impl Fn(&K) -> DhcpField,
    same: impl Fn(&V, &V) -> bool,
) {
    for (key, wanted) in want {
        match current.get(key) {
            None => changes.push(DhcpChange {
                field: field(key),
                kind: DeltaKind::Missing,
            }),
            Some(existing) if !same(wanted, existing) => changes.push(DhcpChange {
                field: field(key),
                kind: DeltaKind::Mismatched,
            }),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{
        AccessPolicy, DhcpOptionSpec, PortType, Reservation, ReservedRange, SubnetAssignment,
    };
    use pretty_assertions::assert_eq;

    fn catalog() -> VlanCatalog {
        VlanCatalog::new([
            VlanDefinition {
                name: "Guest".into(),
                id: 2,
                vpn_enabled: false,
                dhcp_enabled: true,
            },
            VlanDefinition {
                name: "Data".into(),
                id: 10,
                vpn_enabled: true,
                dhcp_enabled: true,
            },
            VlanDefinition {
                name: "Cameras".into(),
                id: 30,
                vpn_enabled: false,
                dhcp_enabled: false,
            },
        ])
        .unwrap()
    }

    fn assignment(name: &str, id: u16, cidr: &str) -> SubnetAssignment {
        SubnetAssignment {
            vlan_name: name.into(),
            vlan_id: id,
            prefix: cidr.parse().unwrap(),
        }
    }

    fn port(number: u32, port_type: PortType, vlan_id: u16, secure: bool) -> PortSpec {
        PortSpec {
            number,
            port_type,
            vlan_id,
            secure,
        }
    }

    fn observed_port(number: u32, port_type: &str, vlan: u16, policy: Option<&str>) -> ObservedPort {
        ObservedPort {
            number,
            enabled: true,
            port_type: port_type.into(),
            vlan: Some(vlan),
            access_policy: policy.map(Into::into),
        }
    }

    /// Observed state matching `desired` exactly, as after a successful apply.
    fn converged(catalog: &VlanCatalog, desired: &SiteDesired) -> ObservedSite {
        let vlans = desired
            .subnets
            .iter()
            .map(|s| {
                let def = catalog.by_id(s.vlan_id).unwrap();
                ObservedVlan {
                    id: s.vlan_id,
                    name: def.name.clone(),
                    subnet: Some(s.prefix.network_cidr().parse().unwrap()),
                    appliance_ip: Some(s.prefix.address()),
                    vpn_enabled: Some(def.vpn_enabled),
                    dhcp_handling: Some(DhcpHandling::for_enabled(def.dhcp_enabled)),
                }
            })
            .collect();
        let ports = desired.ports.as_ref().map(|ports| {
            ports
                .iter()
                .map(|p| ObservedPort {
                    number: p.number,
                    enabled: true,
                    port_type: p.port_type.to_string(),
                    vlan: Some(p.vlan_id),
                    access_policy: p.access_policy().map(|a| a.as_str().to_owned()),
                })
                .collect()
        });
        let dhcp = desired
            .dhcp
            .iter()
            .map(|p| (p.vlan_id, p.settings.clone()))
            .collect();
        ObservedSite { vlans, ports, dhcp }
    }

    fn dhcp_policy() -> DhcpPolicy {
        let mut settings = DhcpSettings {
            dns_nameservers: Some("upstream_dns".into()),
            ..DhcpSettings::default()
        };
        settings.reservations.insert(
            Ipv4Addr::new(10, 0, 0, 5),
            Reservation {
                mac: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
                name: Some("printer".into()),
            },
        );
        settings.options.insert(
            "42".into(),
            DhcpOptionSpec {
                code: "42".into(),
                option_type: "ip".into(),
                value: "10.0.0.1".into(),
            },
        );
        DhcpPolicy {
            vlan_name: "Data".into(),
            vlan_id: 10,
            settings,
        }
    }

    fn full_site() -> SiteDesired {
        SiteDesired {
            subnets: vec![
                assignment("Guest", 2, "10.0.2.1/24"),
                assignment("Data", 10, "10.0.0.1/24"),
                assignment("Cameras", 30, "10.0.30.1/24"),
            ],
            ports: Some(vec![
                port(3, PortType::Access, 10, true),
                port(4, PortType::Trunk, 2, true),
            ]),
            dhcp: vec![dhcp_policy()],
        }
    }

    const BOTH: ReconcileOptions = ReconcileOptions {
        add_missing: true,
        update_existing: true,
    };

    #[test]
    fn converged_site_yields_only_noops() {
        let catalog = catalog();
        let desired = full_site();
        let observed = converged(&catalog, &desired);
        let plan = reconcile_site("X", &catalog, &desired, &observed, BOTH).unwrap();
        assert_eq!(plan.deltas.len(), 6);
        assert!(plan.is_converged());
        assert!(!plan.has_queued());
    }

    #[test]
    fn deltas_are_ordered_vlan_port_dhcp() {
        let plan = reconcile_site(
            "X",
            &catalog(),
            &full_site(),
            &ObservedSite::default(),
            BOTH,
        )
        .unwrap();
        let order: Vec<_> = plan
            .deltas
            .iter()
            .map(|d| match d.delta {
                Delta::Vlan(_) => 'v',
                Delta::Port(_) => 'p',
                Delta::Dhcp(_) => 'd',
            })
            .collect();
        assert_eq!(order, ['v', 'v', 'v', 'p', 'p', 'd']);
    }

    #[test]
    fn absent_vlans_are_missing_never_mismatched() {
        let desired = SiteDesired {
            subnets: vec![assignment("Guest", 2, "10.0.2.1/24")],
            ..SiteDesired::default()
        };
        // A VLAN with the same name but another ID does not count.
        let observed = ObservedSite {
            vlans: vec![ObservedVlan {
                id: 99,
                name: "Guest".into(),
                subnet: None,
                appliance_ip: None,
                vpn_enabled: None,
                dhcp_handling: None,
            }],
            ..ObservedSite::default()
        };
        let plan = reconcile_site("X", &catalog(), &desired, &observed, BOTH).unwrap();
        let Delta::Vlan(delta) = &plan.deltas[0].delta else {
            panic!("expected a VLAN delta");
        };
        assert_eq!(delta.kind, DeltaKind::Missing);
        assert!(delta.fields.is_empty());
        assert_eq!(delta.plan().unwrap().subnet.to_string(), "10.0.2.1/24");
    }

    #[test]
    fn vlan_field_differences() {
        let def = catalog().get("Data").unwrap().clone();
        let observed = ObservedVlan {
            id: 10,
            name: "DATA".into(),
            subnet: Some("10.0.0.0/23".parse().unwrap()),
            appliance_ip: Some(Ipv4Addr::new(10, 0, 0, 1)),
            vpn_enabled: Some(false),
            dhcp_handling: Some(DhcpHandling::Relay),
        };
        let delta = diff_vlan(&def, Some("10.0.0.1/24".parse().unwrap()), Some(&observed));
        assert_eq!(delta.kind, DeltaKind::Mismatched);
        assert_eq!(
            delta.fields,
            [
                VlanField::Name,
                VlanField::Subnet,
                VlanField::VpnMode,
                VlanField::DhcpHandling
            ]
        );

        let update = delta.update();
        assert_eq!(update.name.as_deref(), Some("Data"));
        assert_eq!(update.subnet.unwrap().network_cidr(), "10.0.0.0/24");
        assert_eq!(update.appliance_ip, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(update.vpn_enabled, Some(true));
        assert_eq!(update.dhcp_handling, Some(DhcpHandling::Server));
    }

    #[test]
    fn unreported_vpn_mode_is_not_compared() {
        let def = catalog().get("Data").unwrap().clone();
        let observed = ObservedVlan {
            id: 10,
            name: "Data".into(),
            subnet: Some("10.0.0.0/24".parse().unwrap()),
            appliance_ip: Some(Ipv4Addr::new(10, 0, 0, 1)),
            vpn_enabled: None,
            dhcp_handling: Some(DhcpHandling::Server),
        };
        let delta = diff_vlan(&def, Some("10.0.0.1/24".parse().unwrap()), Some(&observed));
        assert_eq!(delta.kind, DeltaKind::MatchedNoop);
    }

    #[test]
    fn disabled_dhcp_accepts_relay_and_off() {
        let def = catalog().get("Cameras").unwrap().clone();
        for handling in [Some(DhcpHandling::Off), Some(DhcpHandling::Relay), None] {
            let observed = ObservedVlan {
                id: 30,
                name: "Cameras".into(),
                subnet: None,
                appliance_ip: None,
                vpn_enabled: None,
                dhcp_handling: handling,
            };
            assert_eq!(diff_vlan(&def, None, Some(&observed)).kind, DeltaKind::MatchedNoop);
        }
    }

    #[test]
    fn policy_only_port_mismatch_updates_policy_only() {
        let delta = diff_port(
            &port(7, PortType::Access, 2, true),
            Some(&observed_port(7, "access", 2, Some("open"))),
        );
        assert_eq!(delta.kind, DeltaKind::Mismatched);
        assert_eq!(delta.fields, [PortField::AccessPolicy]);
        assert_eq!(
            delta.update(),
            PortUpdate {
                access_policy: Some(AccessPolicy::HybridRadius),
                ..PortUpdate::default()
            }
        );
    }

    #[test]
    fn trunk_security_flag_never_matters() {
        let observed = observed_port(4, "trunk", 2, None);
        let secure = diff_port(&port(4, PortType::Trunk, 2, true), Some(&observed));
        let open = diff_port(&port(4, PortType::Trunk, 2, false), Some(&observed));
        assert_eq!(secure.kind, DeltaKind::MatchedNoop);
        assert_eq!(open.kind, DeltaKind::MatchedNoop);

        let observed = observed_port(4, "trunk", 2, Some("hybrid-radius"));
        assert_eq!(
            diff_port(&port(4, PortType::Trunk, 2, false), Some(&observed)).kind,
            DeltaKind::MatchedNoop
        );
    }

    #[test]
    fn access_to_trunk_changes_type_only() {
        let delta = diff_port(
            &port(5, PortType::Trunk, 10, false),
            Some(&observed_port(5, "access", 10, Some("open"))),
        );
        assert_eq!(delta.fields, [PortField::PortType]);
        assert_eq!(delta.update().port_type, Some(PortType::Trunk));
        assert_eq!(delta.update().access_policy, None);
    }

    #[test]
    fn absent_port_is_missing() {
        let delta = diff_port(&port(9, PortType::Access, 10, false), None);
        assert_eq!(delta.kind, DeltaKind::Missing);
        assert_eq!(Delta::Port(delta).operation(), Operation::UpdatePort);
    }

    #[test]
    fn missing_reservation_is_added_and_observed_only_kept() {
        let policy = dhcp_policy();
        let mut observed = policy.settings.clone();
        observed.reservations.clear();
        observed.reservations.insert(
            Ipv4Addr::new(10, 0, 0, 9),
            Reservation {
                mac: "11:22:33:44:55:66".parse().unwrap(),
                name: Some("kiosk".into()),
            },
        );

        let delta = diff_dhcp(&policy, Some(&observed), false);
        assert_eq!(delta.kind, DeltaKind::Mismatched);
        assert_eq!(
            delta.changes,
            [DhcpChange {
                field: DhcpField::Reservation(Ipv4Addr::new(10, 0, 0, 5)),
                kind: DeltaKind::Missing,
            }]
        );

        let update = delta.update();
        let merged = update.reservations.unwrap();
        assert_eq!(
            merged.keys().copied().collect::<Vec<_>>(),
            [Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 9)]
        );
        assert!(update.dns_nameservers.is_none());
        assert!(update.options.is_none());
    }

    #[test]
    fn moved_client_drops_its_old_reservation() {
        let policy = dhcp_policy();
        let mut observed = DhcpSettings::default();
        observed.reservations.insert(
            Ipv4Addr::new(10, 0, 0, 77),
            Reservation {
                mac: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
                name: None,
            },
        );
        let merged = diff_dhcp(&policy, Some(&observed), false)
            .update()
            .reservations
            .unwrap();
        assert_eq!(
            merged.keys().copied().collect::<Vec<_>>(),
            [Ipv4Addr::new(10, 0, 0, 5)]
        );
    }

    #[test]
    fn changed_entries_are_mismatched() {
        let policy = dhcp_policy();
        let mut observed = policy.settings.clone();
        observed.dns_nameservers = Some("google_dns".into());
        observed
            .options
            .get_mut("42")
            .unwrap()
            .value
            .replace_range(.., "10.9.9.9");
        observed.reserved_ranges.insert(
            Ipv4Addr::new(10, 0, 0, 200),
            ReservedRange {
                end: Ipv4Addr::new(10, 0, 0, 250),
                comment: None,
            },
        );

        let delta = diff_dhcp(&policy, Some(&observed), false);
        let fields: Vec<_> = delta.changes.iter().map(|c| c.field.to_string()).collect();
        assert_eq!(fields, ["dns_nameservers", "option 42"]);
        assert!(delta.changes.iter().all(|c| c.kind == DeltaKind::Mismatched));

        let update = delta.update();
        assert_eq!(update.dns_nameservers.as_deref(), Some("upstream_dns"));
        assert_eq!(update.options.unwrap()[0].value, "10.0.0.1");
        assert!(update.reserved_ranges.is_none());
    }

    #[test]
    fn dhcp_of_missing_vlan_is_missing() {
        let delta = diff_dhcp(&dhcp_policy(), None, true);
        assert_eq!(delta.kind, DeltaKind::Missing);
        assert_eq!(delta.changes.len(), 3);
    }

    #[test]
    fn modes_decide_what_is_queued() {
        let catalog = catalog();
        let desired = SiteDesired {
            subnets: vec![
                assignment("Guest", 2, "10.0.2.1/24"),
                assignment("Data", 10, "10.0.0.1/24"),
            ],
            ports: Some(vec![port(3, PortType::Access, 10, true)]),
            dhcp: vec![dhcp_policy()],
        };
        // Data exists with a wrong name and empty DHCP; Guest is missing.
        let mut observed = converged(&catalog, &desired);
        observed.vlans.retain(|v| v.id == 10);
        observed.vlans[0].name = "Old".into();
        observed.dhcp.insert(10, DhcpSettings::default());
        observed.ports.as_mut().unwrap()[0].access_policy = Some("open".into());

        let queued = |options| {
            reconcile_site("X", &catalog, &desired, &observed, options)
                .unwrap()
                .queued()
                .map(Delta::subject)
                .collect::<Vec<_>>()
        };

        assert_eq!(queued(ReconcileOptions::default()), ["port 3"]);
        assert_eq!(
            queued(ReconcileOptions {
                add_missing: true,
                update_existing: false
            }),
            ["VLAN 2 (Guest)", "port 3"]
        );
        assert_eq!(
            queued(ReconcileOptions {
                add_missing: false,
                update_existing: true
            }),
            ["VLAN 10 (Data)", "port 3", "DHCP on VLAN 10 (Data)"]
        );
        assert_eq!(
            queued(BOTH),
            [
                "VLAN 2 (Guest)",
                "VLAN 10 (Data)",
                "port 3",
                "DHCP on VLAN 10 (Data)"
            ]
        );
    }

    #[test]
    fn report_mode_covers_whole_catalog() {
        let catalog = catalog();
        let observed = vec![ObservedVlan {
            id: 10,
            name: "Data".into(),
            subnet: Some("10.0.0.0/24".parse().unwrap()),
            appliance_ip: Some(Ipv4Addr::new(10, 0, 0, 1)),
            vpn_enabled: None,
            dhcp_handling: Some(DhcpHandling::Server),
        }];
        let kinds: Vec<_> = reconcile_catalog(&catalog, None, &observed)
            .iter()
            .map(|d| (d.definition.id, d.kind))
            .collect();
        assert_eq!(
            kinds,
            [
                (2, DeltaKind::Missing),
                (10, DeltaKind::MatchedNoop),
                (30, DeltaKind::Missing)
            ]
        );

        let desired = SiteDesired {
            subnets: vec![assignment("Data", 10, "10.5.0.1/24")],
            ..SiteDesired::default()
        };
        let data = &reconcile_catalog(&catalog, Some(&desired), &observed)[1];
        assert_eq!(data.kind, DeltaKind::Mismatched);
        assert_eq!(data.fields, [VlanField::Subnet, VlanField::ApplianceIp]);
    }
}
