// Dashboard appliance VLAN endpoints
//
// All paths are network-scoped: `/networks/{networkId}/appliance/vlans`.

use tracing::debug;

use crate::dashboard::client::DashboardClient;
use crate::dashboard::models::{CreateVlanRequest, UpdateVlanRequest, Vlan};
use crate::error::Error;

impl DashboardClient {
    /// List the appliance VLANs of a network.
    ///
    /// `GET /networks/{networkId}/appliance/vlans`
    pub async fn list_vlans(&self, network_id: &str) -> Result<Vec<Vlan>, Error> {
        debug!(network_id, "listing vlans");
        self.get(&format!("networks/{network_id}/appliance/vlans"))
            .await
    }

    /// Fetch a single VLAN, including its DHCP settings.
    ///
    /// `GET /networks/{networkId}/appliance/vlans/{vlanId}`
    pub async fn get_vlan(&self, network_id: &str, vlan_id: u16) -> Result<Vlan, Error> {
        debug!(network_id, vlan_id, "fetching vlan");
        self.get(&format!("networks/{network_id}/appliance/vlans/{vlan_id}"))
            .await
    }

    /// Create a VLAN.
    ///
    /// `POST /networks/{networkId}/appliance/vlans`
    pub async fn create_vlan(
        &self,
        network_id: &str,
        body: &CreateVlanRequest,
    ) -> Result<Vlan, Error> {
        debug!(network_id, vlan_id = body.id, name = %body.name, "creating vlan");
        self.post(&format!("networks/{network_id}/appliance/vlans"), body)
            .await
    }

    /// Update a VLAN. Only the fields set in `body` are changed.
    ///
    /// `PUT /networks/{networkId}/appliance/vlans/{vlanId}`
    pub async fn update_vlan(
        &self,
        network_id: &str,
        vlan_id: u16,
        body: &UpdateVlanRequest,
    ) -> Result<Vlan, Error> {
        debug!(network_id, vlan_id, "updating vlan");
        self.put(
            &format!("networks/{network_id}/appliance/vlans/{vlan_id}"),
            body,
        )
        .await
    }
}
