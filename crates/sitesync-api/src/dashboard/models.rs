// Dashboard API wire models
//
// Shapes mirror the JSON returned by the v1 endpoints. Unknown fields are
// ignored on read; request bodies skip unset fields so updates only touch
// what the caller asked to change.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Networks ────────────────────────────────────────────────────────

/// A network (site) inside an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ── VLANs ───────────────────────────────────────────────────────────

/// An appliance VLAN as returned by `GET /networks/{id}/appliance/vlans`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vlan {
    #[serde(deserialize_with = "de_vlan_id", serialize_with = "ser_vlan_id")]
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub appliance_ip: Option<String>,
    #[serde(default)]
    pub vpn_mode: Option<String>,
    #[serde(default)]
    pub dhcp_handling: Option<String>,
    #[serde(default)]
    pub dhcp_lease_time: Option<String>,
    #[serde(default)]
    pub dns_nameservers: Option<String>,
    #[serde(default)]
    pub dhcp_options: Vec<DhcpOption>,
    #[serde(default)]
    pub reserved_ip_ranges: Vec<ReservedIpRange>,
    /// Keyed by client MAC address.
    #[serde(default)]
    pub fixed_ip_assignments: BTreeMap<String, FixedIpAssignment>,
}

/// A custom DHCP option handed out by the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOption {
    pub code: String,
    #[serde(rename = "type")]
    pub option_type: String,
    pub value: String,
}

/// A range excluded from the DHCP pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedIpRange {
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A DHCP reservation for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIpAssignment {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body for `POST /networks/{id}/appliance/vlans`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVlanRequest {
    #[serde(serialize_with = "ser_vlan_id")]
    pub id: u16,
    pub name: String,
    pub subnet: String,
    pub appliance_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Settings>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ipv6Settings {
    pub enabled: bool,
}

/// Body for `PUT /networks/{id}/appliance/vlans/{vlanId}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVlanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appliance_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_handling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_lease_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_nameservers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<Vec<DhcpOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_ip_ranges: Option<Vec<ReservedIpRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_ip_assignments: Option<BTreeMap<String, FixedIpAssignment>>,
}

impl UpdateVlanRequest {
    /// True when the body would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.subnet.is_none()
            && self.appliance_ip.is_none()
            && self.vpn_mode.is_none()
            && self.dhcp_handling.is_none()
            && self.dhcp_lease_time.is_none()
            && self.dns_nameservers.is_none()
            && self.dhcp_options.is_none()
            && self.reserved_ip_ranges.is_none()
            && self.fixed_ip_assignments.is_none()
    }
}

// ── Appliance ports ─────────────────────────────────────────────────

/// A per-port configuration of the appliance's LAN ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliancePort {
    pub number: u32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type")]
    pub port_type: String,
    #[serde(default)]
    pub drop_untagged_traffic: Option<bool>,
    #[serde(default)]
    pub vlan: Option<u16>,
    #[serde(default)]
    pub allowed_vlans: Option<String>,
    #[serde(default)]
    pub access_policy: Option<String>,
}

/// Body for `PUT /networks/{id}/appliance/ports/{portId}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub port_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_untagged_traffic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_vlans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policy: Option<String>,
}

// ── VLAN ID (de)serialization ───────────────────────────────────────
//
// The Dashboard sends VLAN IDs as strings in some payloads and numbers in
// others. Accept both, always send a string.

fn de_vlan_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    struct VlanIdVisitor;

    impl Visitor<'_> for VlanIdVisitor {
        type Value = u16;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a VLAN ID as number or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("VLAN ID {v} out of range")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u16, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("VLAN ID {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u16, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid VLAN ID '{v}'")))
        }
    }

    deserializer.deserialize_any(VlanIdVisitor)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn ser_vlan_id<S: Serializer>(id: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}
