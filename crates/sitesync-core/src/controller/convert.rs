// ── Wire ↔ domain conversion ──
//
// Translates Dashboard wire models into observed-state types and domain
// change requests into request bodies. Entries the Dashboard returns in a
// shape we cannot interpret are dropped with a warning rather than failing
// the whole fetch.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use sitesync_api::models::{
    AppliancePort, CreateVlanRequest, DhcpOption, FixedIpAssignment, Ipv6Settings,
    ReservedIpRange, UpdatePortRequest, UpdateVlanRequest, Vlan,
};
use tracing::warn;

use super::{DhcpUpdate, PortUpdate, VlanPlan, VlanUpdate};
use crate::model::{
    DhcpHandling, DhcpOptionSpec, DhcpSettings, MacAddress, ObservedPort, ObservedVlan, PortType,
    Reservation, ReservedRange, SubnetPrefix,
};

fn vpn_mode(enabled: bool) -> String {
    let mode = if enabled { "enabled" } else { "disabled" };
    mode.to_owned()
}

// ── Dashboard → observed ─────────────────────────────────────────────

pub(super) fn observed_vlan(vlan: &Vlan) -> ObservedVlan {
    let subnet = vlan.subnet.as_deref().and_then(|raw| {
        raw.parse::<SubnetPrefix>()
            .inspect_err(|_| warn!(vlan = vlan.id, subnet = raw, "unparsable VLAN subnet"))
            .ok()
    });
    let appliance_ip = vlan
        .appliance_ip
        .as_deref()
        .and_then(|raw| raw.parse::<Ipv4Addr>().ok());
    let vpn_enabled = vlan.vpn_mode.as_deref().and_then(|mode| match mode {
        "enabled" => Some(true),
        "disabled" => Some(false),
        _ => None,
    });

    ObservedVlan {
        id: vlan.id,
        name: vlan.name.clone(),
        subnet,
        appliance_ip,
        vpn_enabled,
        dhcp_handling: vlan
            .dhcp_handling
            .as_deref()
            .and_then(DhcpHandling::from_dashboard),
    }
}

pub(super) fn observed_dhcp(vlan: &Vlan) -> DhcpSettings {
    let options = vlan
        .dhcp_options
        .iter()
        .map(|o| {
            (
                o.code.clone(),
                DhcpOptionSpec {
                    code: o.code.clone(),
                    option_type: o.option_type.clone(),
                    value: o.value.clone(),
                },
            )
        })
        .collect();

    let mut reservations = BTreeMap::new();
    for (mac, assignment) in &vlan.fixed_ip_assignments {
        match (mac.parse::<MacAddress>(), assignment.ip.parse::<Ipv4Addr>()) {
            (Ok(mac), Ok(ip)) => {
                reservations.insert(
                    ip,
                    Reservation {
                        mac,
                        name: assignment.name.clone().filter(|n| !n.is_empty()),
                    },
                );
            }
            _ => warn!(vlan = vlan.id, mac = %mac, ip = %assignment.ip, "skipping unreadable fixed IP assignment"),
        }
    }

    let mut reserved_ranges = BTreeMap::new();
    for range in &vlan.reserved_ip_ranges {
        match (range.start.parse::<Ipv4Addr>(), range.end.parse::<Ipv4Addr>()) {
            (Ok(start), Ok(end)) => {
                reserved_ranges.insert(
                    start,
                    ReservedRange {
                        end,
                        comment: range.comment.clone().filter(|c| !c.is_empty()),
                    },
                );
            }
            _ => warn!(vlan = vlan.id, start = %range.start, "skipping unreadable reserved range"),
        }
    }

    DhcpSettings {
        dns_nameservers: vlan.dns_nameservers.clone(),
        lease_time: vlan.dhcp_lease_time.clone(),
        options,
        reservations,
        reserved_ranges,
    }
}

pub(super) fn observed_port(port: &AppliancePort) -> ObservedPort {
    ObservedPort {
        number: port.number,
        enabled: port.enabled,
        port_type: port.port_type.clone(),
        vlan: port.vlan,
        access_policy: port.access_policy.clone(),
    }
}

// ── Domain → Dashboard ───────────────────────────────────────────────

pub(super) fn create_request(plan: &VlanPlan) -> CreateVlanRequest {
    CreateVlanRequest {
        id: plan.id,
        name: plan.name.clone(),
        subnet: plan.subnet.network_cidr(),
        appliance_ip: plan.subnet.address().to_string(),
        vpn_mode: Some(vpn_mode(plan.vpn_enabled)),
        ipv6: Some(Ipv6Settings { enabled: true }),
    }
}

pub(super) fn vlan_update_request(update: &VlanUpdate) -> UpdateVlanRequest {
    UpdateVlanRequest {
        name: update.name.clone(),
        subnet: update.subnet.map(|s| s.network_cidr()),
        appliance_ip: update.appliance_ip.map(|ip| ip.to_string()),
        vpn_mode: update.vpn_enabled.map(vpn_mode),
        dhcp_handling: update.dhcp_handling.map(|h| h.as_dashboard().to_owned()),
        ..UpdateVlanRequest::default()
    }
}

/// Ports switched to trunk carry every VLAN and keep untagged traffic.
pub(super) fn port_update_request(update: &PortUpdate) -> UpdatePortRequest {
    let trunk = update.port_type == Some(PortType::Trunk);
    UpdatePortRequest {
        port_type: update.port_type.map(|t| t.to_string()),
        vlan: update.vlan,
        access_policy: update.access_policy.map(|p| p.as_str().to_owned()),
        allowed_vlans: trunk.then(|| "all".to_owned()),
        drop_untagged_traffic: trunk.then_some(false),
        ..UpdatePortRequest::default()
    }
}

pub(super) fn dhcp_update_request(update: &DhcpUpdate) -> UpdateVlanRequest {
    UpdateVlanRequest {
        dns_nameservers: update.dns_nameservers.clone(),
        dhcp_lease_time: update.lease_time.clone(),
        dhcp_options: update.options.as_ref().map(|options| {
            options
                .iter()
                .map(|o| DhcpOption {
                    code: o.code.clone(),
                    option_type: o.option_type.clone(),
                    value: o.value.clone(),
                })
                .collect()
        }),
        fixed_ip_assignments: update.reservations.as_ref().map(|reservations| {
            reservations
                .iter()
                .map(|(ip, r)| {
                    (
                        r.mac.to_string(),
                        FixedIpAssignment {
                            ip: ip.to_string(),
                            name: r.name.clone(),
                        },
                    )
                })
                .collect()
        }),
        reserved_ip_ranges: update.reserved_ranges.as_ref().map(|ranges| {
            ranges
                .iter()
                .map(|(start, r)| ReservedIpRange {
                    start: start.to_string(),
                    end: r.end.to_string(),
                    comment: r.comment.clone(),
                })
                .collect()
        }),
        ..UpdateVlanRequest::default()
    }
}
