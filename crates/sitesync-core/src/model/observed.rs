// ── Observed state ──
//
// What the Dashboard reports for a site, reduced to the fields the
// reconciler compares. Built by the controller adapter from wire models.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::dhcp::DhcpSettings;
use super::subnet::SubnetPrefix;

/// How the appliance handles DHCP on a VLAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DhcpHandling {
    Server,
    Relay,
    Off,
}

impl DhcpHandling {
    pub const SERVER: &'static str = "Run a DHCP server";
    pub const RELAY: &'static str = "Relay DHCP to another server";
    pub const OFF: &'static str = "Do not respond to DHCP requests";

    pub fn from_dashboard(raw: &str) -> Option<Self> {
        match raw {
            Self::SERVER => Some(Self::Server),
            Self::RELAY => Some(Self::Relay),
            Self::OFF => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_dashboard(self) -> &'static str {
        match self {
            Self::Server => Self::SERVER,
            Self::Relay => Self::RELAY,
            Self::Off => Self::OFF,
        }
    }

    /// Setting written for a catalog VLAN's DHCP flag.
    pub fn for_enabled(enabled: bool) -> Self {
        if enabled { Self::Server } else { Self::Off }
    }
}

/// A VLAN as configured on the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedVlan {
    pub id: u16,
    pub name: String,
    /// Network in CIDR notation; `None` if absent or unparsable.
    pub subnet: Option<SubnetPrefix>,
    pub appliance_ip: Option<Ipv4Addr>,
    /// `None` when the Dashboard does not report VPN participation.
    pub vpn_enabled: Option<bool>,
    pub dhcp_handling: Option<DhcpHandling>,
}

impl ObservedVlan {
    pub fn runs_dhcp_server(&self) -> bool {
        self.dhcp_handling == Some(DhcpHandling::Server)
    }
}

/// An appliance LAN port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedPort {
    pub number: u32,
    pub enabled: bool,
    pub port_type: String,
    pub vlan: Option<u16>,
    pub access_policy: Option<String>,
}

/// Everything fetched for one site, in the shape it is backed up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedSite {
    pub vlans: Vec<ObservedVlan>,
    /// `None` when ports were not fetched for this run.
    pub ports: Option<Vec<ObservedPort>>,
    /// DHCP settings, keyed by VLAN ID, for the VLANs with a DHCP policy.
    pub dhcp: BTreeMap<u16, DhcpSettings>,
}

impl ObservedSite {
    pub fn vlan(&self, id: u16) -> Option<&ObservedVlan> {
        self.vlans.iter().find(|v| v.id == id)
    }

    pub fn port(&self, number: u32) -> Option<&ObservedPort> {
        self.ports.as_ref()?.iter().find(|p| p.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dhcp_handling_round_trips_dashboard_strings() {
        for handling in [DhcpHandling::Server, DhcpHandling::Relay, DhcpHandling::Off] {
            assert_eq!(
                DhcpHandling::from_dashboard(handling.as_dashboard()),
                Some(handling)
            );
        }
        assert_eq!(DhcpHandling::from_dashboard("something new"), None);
    }

    #[test]
    fn port_lookup_without_ports() {
        let site = ObservedSite::default();
        assert!(site.port(1).is_none());
    }
}
