// ── Desired state ──
//
// What the input files ask for, after validation. Nothing in here talks to
// the Dashboard.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::dhcp::DhcpSettings;
use super::subnet::SubnetPrefix;
use crate::error::{CoreError, ValidationError};

// ── VLAN catalog ─────────────────────────────────────────────────────

/// One VLAN from the organization-wide catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanDefinition {
    pub name: String,
    pub id: u16,
    pub vpn_enabled: bool,
    pub dhcp_enabled: bool,
}

/// Organization-wide VLAN definitions, in file order.
///
/// Names and IDs are both unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanCatalog {
    by_name: IndexMap<String, VlanDefinition>,
    by_id: HashMap<u16, String>,
}

impl VlanCatalog {
    pub fn new(definitions: impl IntoIterator<Item = VlanDefinition>) -> Result<Self, ValidationError> {
        let mut catalog = Self::default();
        for def in definitions {
            if !(1..=4094).contains(&def.id) {
                return Err(ValidationError::InvalidVlanId {
                    name: def.name,
                    id: i64::from(def.id),
                });
            }
            if let Some(first) = catalog.by_id.get(&def.id) {
                return Err(ValidationError::DuplicateVlanId {
                    id: def.id,
                    first: first.clone(),
                    second: def.name,
                });
            }
            catalog.by_id.insert(def.id, def.name.clone());
            catalog.by_name.insert(def.name.clone(), def);
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&VlanDefinition> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: u16) -> Option<&VlanDefinition> {
        self.by_id.get(&id).and_then(|name| self.by_name.get(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VlanDefinition> {
        self.by_name.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ── Subnets ──────────────────────────────────────────────────────────

/// A site's subnet for one catalog VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetAssignment {
    pub vlan_name: String,
    pub vlan_id: u16,
    pub prefix: SubnetPrefix,
}

// ── Ports ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PortType {
    Access,
    Trunk,
}

/// Access policy applied to access ports, derived from the secure flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum AccessPolicy {
    #[serde(rename = "open")]
    #[strum(serialize = "open")]
    Open,
    #[serde(rename = "hybrid-radius")]
    #[strum(serialize = "hybrid-radius")]
    HybridRadius,
}

impl AccessPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::HybridRadius => "hybrid-radius",
        }
    }
}

/// Desired configuration for one appliance LAN port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub number: u32,
    pub port_type: PortType,
    /// Access VLAN, or native VLAN for trunks.
    pub vlan_id: u16,
    pub secure: bool,
}

impl PortSpec {
    /// Trunk ports carry no access policy; their secure flag is ignored.
    pub fn access_policy(&self) -> Option<AccessPolicy> {
        match self.port_type {
            PortType::Access if self.secure => Some(AccessPolicy::HybridRadius),
            PortType::Access => Some(AccessPolicy::Open),
            PortType::Trunk => None,
        }
    }
}

// ── DHCP ─────────────────────────────────────────────────────────────

/// DHCP settings requested for one VLAN at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpPolicy {
    pub vlan_name: String,
    pub vlan_id: u16,
    pub settings: DhcpSettings,
}

// ── Per-site and aggregate state ─────────────────────────────────────

/// Everything the input files ask for at one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteDesired {
    pub subnets: Vec<SubnetAssignment>,
    /// `None` when no port table was given; ports are then left alone.
    pub ports: Option<Vec<PortSpec>>,
    pub dhcp: Vec<DhcpPolicy>,
}

impl SiteDesired {
    pub fn subnet_for(&self, vlan_id: u16) -> Option<&SubnetAssignment> {
        self.subnets.iter().find(|s| s.vlan_id == vlan_id)
    }
}

/// Validated input for a whole run.
///
/// Sites whose files failed validation are kept in `invalid` so the rest
/// of the run can proceed.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub catalog: VlanCatalog,
    pub sites: BTreeMap<String, SiteDesired>,
    pub invalid: BTreeMap<String, Vec<ValidationError>>,
}

impl DesiredState {
    /// Desired state for `site`. A site with no input rows desires nothing.
    pub fn site(&self, site: &str) -> Result<SiteDesired, CoreError> {
        if let Some(errors) = self.invalid.get(site) {
            return Err(CoreError::InvalidSite {
                site: site.to_owned(),
                errors: errors.clone(),
            });
        }
        Ok(self.sites.get(site).cloned().unwrap_or_default())
    }

    pub(crate) fn reject(&mut self, site: &str, error: ValidationError) {
        self.invalid.entry(site.to_owned()).or_default().push(error);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn def(name: &str, id: u16) -> VlanDefinition {
        VlanDefinition {
            name: name.into(),
            id,
            vpn_enabled: false,
            dhcp_enabled: true,
        }
    }

    #[test]
    fn catalog_lookups() {
        let catalog = VlanCatalog::new([def("Data", 10), def("Voice", 20)]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.by_id(20).unwrap().name, "Voice");
        assert_eq!(catalog.get("Data").unwrap().id, 10);
        assert_eq!(catalog.names().collect::<Vec<_>>(), ["Data", "Voice"]);
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let err = VlanCatalog::new([def("Data", 10), def("Other", 10)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateVlanId {
                id: 10,
                first: "Data".into(),
                second: "Other".into()
            }
        );
    }

    #[test]
    fn catalog_rejects_reserved_ids() {
        assert!(VlanCatalog::new([def("Zero", 0)]).is_err());
        assert!(VlanCatalog::new([def("Top", 4095)]).is_err());
    }

    #[test]
    fn access_policy_follows_secure_flag() {
        let mut port = PortSpec {
            number: 3,
            port_type: PortType::Access,
            vlan_id: 10,
            secure: true,
        };
        assert_eq!(port.access_policy(), Some(AccessPolicy::HybridRadius));
        port.secure = false;
        assert_eq!(port.access_policy(), Some(AccessPolicy::Open));
        port.port_type = PortType::Trunk;
        port.secure = true;
        assert_eq!(port.access_policy(), None);
    }

    #[test]
    fn invalid_site_is_reported() {
        let mut state = DesiredState::default();
        state.reject("Branch", ValidationError::DuplicatePort { port: 4 });
        assert!(matches!(
            state.site("Branch"),
            Err(CoreError::InvalidSite { ref errors, .. }) if errors.len() == 1
        ));
        assert_eq!(state.site("Elsewhere").unwrap(), SiteDesired::default());
    }
}
