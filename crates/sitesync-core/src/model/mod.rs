// ── Domain model ──
//
// Desired state (from input files) and observed state (from the
// Dashboard), plus the value types both sides share.

pub mod desired;
pub mod dhcp;
pub mod mac;
pub mod observed;
pub mod subnet;

pub use desired::{
    AccessPolicy, DesiredState, DhcpPolicy, PortSpec, PortType, SiteDesired, SubnetAssignment,
    VlanCatalog, VlanDefinition,
};
pub use dhcp::{DhcpOptionSpec, DhcpSettings, Reservation, ReservedRange};
pub use mac::MacAddress;
pub use observed::{DhcpHandling, ObservedPort, ObservedSite, ObservedVlan};
pub use subnet::SubnetPrefix;
