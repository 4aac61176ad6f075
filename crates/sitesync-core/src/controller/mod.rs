// ── Controller capability ──
//
// The engine, applicator, and orchestrator only see `NetworkController`.
// `DashboardController` implements it over the Meraki Dashboard client;
// tests substitute an in-memory fake.

mod cache;
mod convert;
mod dashboard;

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::model::{
    AccessPolicy, DhcpHandling, DhcpOptionSpec, DhcpSettings, ObservedPort, ObservedVlan,
    PortType, Reservation, ReservedRange, SubnetPrefix,
};

pub use cache::NetworkCache;
pub use dashboard::DashboardController;
pub use sitesync_api::models::Network;

/// DHCP settings as reported for one VLAN.
pub type ObservedDhcp = DhcpSettings;

/// A VLAN to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanPlan {
    pub id: u16,
    pub name: String,
    /// Appliance address and prefix length.
    pub subnet: SubnetPrefix,
    pub vpn_enabled: bool,
    pub dhcp_enabled: bool,
}

/// Changes to an existing VLAN. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Written as the network CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubnetPrefix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appliance_ip: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_handling: Option<DhcpHandling>,
}

/// Changes to an appliance port. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_type: Option<PortType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policy: Option<AccessPolicy>,
}

/// Changes to a VLAN's DHCP server. Collections, when set, are the full
/// merged set to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DhcpUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_nameservers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<DhcpOptionSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservations: Option<BTreeMap<Ipv4Addr, Reservation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_ranges: Option<BTreeMap<Ipv4Addr, ReservedRange>>,
}

/// Read and write access to one organization's sites.
///
/// Sites are addressed by name; implementations resolve names to
/// whatever identifiers the backend needs.
#[async_trait]
pub trait NetworkController: Send + Sync {
    /// Names of every site in the organization.
    async fn list_sites(&self) -> Result<Vec<String>, CoreError>;

    async fn fetch_vlans(&self, site: &str) -> Result<Vec<ObservedVlan>, CoreError>;

    async fn create_vlan(&self, site: &str, plan: &VlanPlan) -> Result<(), CoreError>;

    async fn update_vlan(
        &self,
        site: &str,
        vlan_id: u16,
        update: &VlanUpdate,
    ) -> Result<(), CoreError>;

    async fn fetch_ports(&self, site: &str) -> Result<Vec<ObservedPort>, CoreError>;

    /// Fails with [`CoreError::PortNotFound`] if the port does not exist.
    async fn update_port(
        &self,
        site: &str,
        number: u32,
        update: &PortUpdate,
    ) -> Result<(), CoreError>;

    async fn fetch_dhcp(&self, site: &str, vlan_id: u16) -> Result<ObservedDhcp, CoreError>;

    async fn update_dhcp(
        &self,
        site: &str,
        vlan_id: u16,
        update: &DhcpUpdate,
    ) -> Result<(), CoreError>;
}
