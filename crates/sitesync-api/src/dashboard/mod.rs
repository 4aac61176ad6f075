// Dashboard API client modules
//
// Hand-written client for the Meraki Dashboard v1 REST API. Covers the
// organization network listing and the appliance VLAN / port endpoints.
// Endpoint groups are inherent methods on `DashboardClient`, one file each.

pub mod client;
pub mod models;
pub mod networks;
pub mod ports;
pub mod vlans;

pub use client::DashboardClient;
