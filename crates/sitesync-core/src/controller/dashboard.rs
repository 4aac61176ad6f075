// Dashboard-backed controller
//
// Resolves site names to network IDs through the organization's network
// listing (optionally cached on disk), then maps each capability onto the
// appliance VLAN and port endpoints.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sitesync_api::models::{Network, UpdateVlanRequest};
use sitesync_api::{DashboardClient, RetryPolicy, TlsMode, TransportConfig};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::cache::NetworkCache;
use super::convert;
use super::{DhcpUpdate, NetworkController, ObservedDhcp, PortUpdate, VlanPlan, VlanUpdate};
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{DhcpHandling, ObservedPort, ObservedVlan};

/// [`NetworkController`] over the Meraki Dashboard API.
pub struct DashboardController {
    client: DashboardClient,
    org_id: String,
    cache: Option<NetworkCache>,
    networks: OnceCell<BTreeMap<String, String>>,
}

impl DashboardController {
    pub fn new(config: &ControllerConfig, cache: Option<NetworkCache>) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            },
            timeout: config.timeout,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        };
        let client =
            DashboardClient::from_api_key(config.base_url.as_str(), &config.api_key, &transport)?;
        Ok(Self::with_client(client, config.org_id.clone(), cache))
    }

    pub fn with_client(
        client: DashboardClient,
        org_id: impl Into<String>,
        cache: Option<NetworkCache>,
    ) -> Self {
        Self {
            client,
            org_id: org_id.into(),
            cache,
            networks: OnceCell::new(),
        }
    }

    /// Every network in the organization, straight from the Dashboard.
    pub async fn list_networks(&self) -> Result<Vec<Network>, CoreError> {
        Ok(self.client.list_networks(&self.org_id).await?)
    }

    /// Site name → network ID, from the cache when it is fresh.
    async fn networks(&self) -> Result<&BTreeMap<String, String>, CoreError> {
        self.networks
            .get_or_try_init(|| async {
                if let Some(cached) = self.cache.as_ref().and_then(NetworkCache::load) {
                    return Ok(cached);
                }
                let listing: BTreeMap<String, String> = self
                    .list_networks()
                    .await?
                    .into_iter()
                    .map(|n| (n.name, n.id))
                    .collect();
                info!(networks = listing.len(), "fetched organization networks");
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store(&listing) {
                        warn!(error = %e, "could not write network cache");
                    }
                }
                Ok(listing)
            })
            .await
    }

    async fn network_id(&self, site: &str) -> Result<String, CoreError> {
        self.networks()
            .await?
            .get(site)
            .cloned()
            .ok_or_else(|| CoreError::SiteNotFound {
                name: site.to_owned(),
            })
    }

    fn vlan_error(site: &str, err: sitesync_api::Error) -> CoreError {
        if err.is_vlans_disabled() {
            CoreError::VlansDisabled {
                site: site.to_owned(),
            }
        } else {
            err.into()
        }
    }

    async fn put_vlan(
        &self,
        site: &str,
        vlan_id: u16,
        body: &UpdateVlanRequest,
    ) -> Result<(), CoreError> {
        if body.is_empty() {
            debug!(site, vlan_id, "empty VLAN update skipped");
            return Ok(());
        }
        let network_id = self.network_id(site).await?;
        self.client
            .update_vlan(&network_id, vlan_id, body)
            .await
            .map_err(|e| Self::vlan_error(site, e))?;
        Ok(())
    }
}

#[async_trait]
impl NetworkController for DashboardController {
    async fn list_sites(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.networks().await?.keys().cloned().collect())
    }

    async fn fetch_vlans(&self, site: &str) -> Result<Vec<ObservedVlan>, CoreError> {
        let network_id = self.network_id(site).await?;
        let vlans = self
            .client
            .list_vlans(&network_id)
            .await
            .map_err(|e| Self::vlan_error(site, e))?;
        Ok(vlans.iter().map(convert::observed_vlan).collect())
    }

    async fn create_vlan(&self, site: &str, plan: &VlanPlan) -> Result<(), CoreError> {
        let network_id = self.network_id(site).await?;
        self.client
            .create_vlan(&network_id, &convert::create_request(plan))
            .await
            .map_err(|e| Self::vlan_error(site, e))?;

        // New VLANs start with a DHCP server; switch it off when not wanted.
        if !plan.dhcp_enabled {
            let body = UpdateVlanRequest {
                dhcp_handling: Some(DhcpHandling::Off.as_dashboard().to_owned()),
                ..UpdateVlanRequest::default()
            };
            self.put_vlan(site, plan.id, &body).await?;
        }
        Ok(())
    }

    async fn update_vlan(
        &self,
        site: &str,
        vlan_id: u16,
        update: &VlanUpdate,
    ) -> Result<(), CoreError> {
        self.put_vlan(site, vlan_id, &convert::vlan_update_request(update))
            .await
    }

    async fn fetch_ports(&self, site: &str) -> Result<Vec<ObservedPort>, CoreError> {
        let network_id = self.network_id(site).await?;
        let ports = self.client.list_ports(&network_id).await?;
        Ok(ports.iter().map(convert::observed_port).collect())
    }

    async fn update_port(
        &self,
        site: &str,
        number: u32,
        update: &PortUpdate,
    ) -> Result<(), CoreError> {
        let network_id = self.network_id(site).await?;
        self.client
            .update_port(&network_id, number, &convert::port_update_request(update))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CoreError::PortNotFound {
                        site: site.to_owned(),
                        port: number,
                    }
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    async fn fetch_dhcp(&self, site: &str, vlan_id: u16) -> Result<ObservedDhcp, CoreError> {
        let network_id = self.network_id(site).await?;
        let vlan = self
            .client
            .get_vlan(&network_id, vlan_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CoreError::VlanNotFound {
                        site: site.to_owned(),
                        vlan_id,
                    }
                } else {
                    Self::vlan_error(site, e)
                }
            })?;
        Ok(convert::observed_dhcp(&vlan))
    }

    async fn update_dhcp(
        &self,
        site: &str,
        vlan_id: u16,
        update: &DhcpUpdate,
    ) -> Result<(), CoreError> {
        self.put_vlan(site, vlan_id, &convert::dhcp_update_request(update))
            .await
    }
}
