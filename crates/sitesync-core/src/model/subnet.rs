// ── IPv4 subnet assignments ──
//
// A site's subnet file holds one CIDR per VLAN, written with the appliance
// address as the host part (`10.0.10.1/24`). The network address and the
// appliance IP are both derived from it.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// An IPv4 address with prefix length, e.g. `10.0.10.1/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubnetPrefix {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl SubnetPrefix {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, ValidationError> {
        if prefix_len > 32 {
            return Err(ValidationError::InvalidCidr {
                value: format!("{address}/{prefix_len}"),
                reason: "prefix length must be 0-32".into(),
            });
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// The address as written, used as the appliance IP.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            len => u32::MAX << (32 - u32::from(len)),
        }
    }

    /// Network address with host bits cleared.
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask())
    }

    /// Network in CIDR notation, e.g. `10.0.10.0/24`.
    pub fn network_cidr(&self) -> String {
        format!("{}/{}", self.network(), self.prefix_len)
    }

    /// True when both describe the same network, regardless of host bits.
    pub fn same_network(&self, other: &Self) -> bool {
        self.prefix_len == other.prefix_len && self.network() == other.network()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask() == u32::from(self.network())
    }
}

impl FromStr for SubnetPrefix {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidCidr {
            value: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let (addr, len) = raw
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected address/prefix"))?;
        let address: Ipv4Addr = addr
            .parse()
            .map_err(|_| invalid("invalid IPv4 address"))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| invalid("invalid prefix length"))?;
        if prefix_len > 32 {
            return Err(invalid("prefix length must be 0-32"));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl Serialize for SubnetPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubnetPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
