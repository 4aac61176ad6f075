// ── DHCP settings ──
//
// One shape for both sides of the comparison: the policy a site's input
// directory asks for, and what the appliance currently serves on a VLAN.
// Collections are keyed the way entries are matched (option code,
// reserved IP, range start) so diffing is a keyed walk.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::mac::MacAddress;

/// A custom DHCP option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOptionSpec {
    pub code: String,
    #[serde(rename = "type")]
    pub option_type: String,
    pub value: String,
}

/// A fixed IP assignment for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub mac: MacAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A range held back from the pool, keyed by its first address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRange {
    pub end: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// DHCP server settings for a single VLAN.
///
/// On the desired side, `None` scalars mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_nameservers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_time: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, DhcpOptionSpec>,
    #[serde(default)]
    pub reservations: BTreeMap<Ipv4Addr, Reservation>,
    #[serde(default)]
    pub reserved_ranges: BTreeMap<Ipv4Addr, ReservedRange>,
}

impl DhcpSettings {
    /// True when nothing is specified.
    pub fn is_empty(&self) -> bool {
        self.dns_nameservers.is_none()
            && self.lease_time.is_none()
            && self.options.is_empty()
            && self.reservations.is_empty()
            && self.reserved_ranges.is_empty()
    }
}
