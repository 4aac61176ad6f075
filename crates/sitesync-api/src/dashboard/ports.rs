// Dashboard appliance port endpoints
//
// Ports are fixed hardware; they can be reconfigured but never created.

use tracing::debug;

use crate::dashboard::client::DashboardClient;
use crate::dashboard::models::{AppliancePort, UpdatePortRequest};
use crate::error::Error;

impl DashboardClient {
    /// List the per-port configuration of the appliance.
    ///
    /// `GET /networks/{networkId}/appliance/ports`
    pub async fn list_ports(&self, network_id: &str) -> Result<Vec<AppliancePort>, Error> {
        debug!(network_id, "listing appliance ports");
        self.get(&format!("networks/{network_id}/appliance/ports"))
            .await
    }

    /// Fetch one port.
    ///
    /// `GET /networks/{networkId}/appliance/ports/{portId}`
    pub async fn get_port(&self, network_id: &str, number: u32) -> Result<AppliancePort, Error> {
        debug!(network_id, number, "fetching appliance port");
        self.get(&format!("networks/{network_id}/appliance/ports/{number}"))
            .await
    }

    /// Update one port. Only the fields set in `body` are changed.
    ///
    /// `PUT /networks/{networkId}/appliance/ports/{portId}`
    pub async fn update_port(
        &self,
        network_id: &str,
        number: u32,
        body: &UpdatePortRequest,
    ) -> Result<AppliancePort, Error> {
        debug!(network_id, number, "updating appliance port");
        self.put(
            &format!("networks/{network_id}/appliance/ports/{number}"),
            body,
        )
        .await
    }
}
