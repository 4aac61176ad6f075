// Dashboard organization endpoints
//
// Network listing is organization-scoped and paginated with `Link` headers.

use tracing::debug;

use crate::dashboard::client::DashboardClient;
use crate::dashboard::models::Network;
use crate::error::Error;

const NETWORKS_PER_PAGE: u32 = 1000;

impl DashboardClient {
    /// List every network in an organization.
    ///
    /// `GET /organizations/{orgId}/networks?perPage=1000`, following `rel=next`.
    pub async fn list_networks(&self, org_id: &str) -> Result<Vec<Network>, Error> {
        debug!(org_id, "listing networks");
        self.get_all_pages(
            &format!("organizations/{org_id}/networks"),
            &[("perPage", NETWORKS_PER_PAGE.to_string())],
        )
        .await
    }
}
