#![allow(clippy::unwrap_used)]
// Integration tests for `DashboardClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitesync_api::models::{CreateVlanRequest, UpdatePortRequest};
use sitesync_api::{DashboardClient, Error, RetryPolicy, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DashboardClient) {
    setup_with_retry(RetryPolicy::none()).await
}

async fn setup_with_retry(retry: RetryPolicy) -> (MockServer, DashboardClient) {
    let server = MockServer::start().await;
    let client =
        DashboardClient::from_reqwest(&format!("{}/api/v1", server.uri()), reqwest::Client::new(), retry)
            .unwrap();
    (server, client)
}

fn network_path(suffix: &str) -> String {
    format!("/api/v1/networks/N_1/{suffix}")
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bearer_header_sent() {
    let server = MockServer::start().await;
    let secret: secrecy::SecretString = "test-key".to_string().into();
    let client = DashboardClient::from_api_key(
        &format!("{}/api/v1", server.uri()),
        &secret,
        &TransportConfig::default(),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path(network_path("appliance/vlans")))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let vlans = client.list_vlans("N_1").await.unwrap();
    assert!(vlans.is_empty());
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"errors": ["Invalid API key"]})),
        )
        .mount(&server)
        .await;

    let result = client.list_vlans("N_1").await;
    match result {
        Err(Error::Authentication { ref message }) => assert_eq!(message, "Invalid API key"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── Networks ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_networks_follows_link_header() {
    let (server, client) = setup().await;
    let next = format!(
        "<{}/api/v1/organizations/42/networks?perPage=1000&startingAfter=N_1>; rel=next",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/42/networks"))
        .and(query_param("startingAfter", "N_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "N_2", "name": "site 2"}])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organizations/42/networks"))
        .and(query_param("perPage", "1000"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next.as_str())
                .set_body_json(json!([{"id": "N_1", "name": "site 1", "productTypes": ["appliance"]}])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let networks = client.list_networks("42").await.unwrap();
    let names: Vec<_> = networks.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["site 1", "site 2"]);
    assert_eq!(networks[0].product_types, ["appliance"]);
}

// ── VLANs ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_vlans_parses_dhcp_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(network_path("appliance/vlans")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "10",
            "name": "Data",
            "subnet": "10.0.10.0/24",
            "applianceIp": "10.0.10.1",
            "dhcpHandling": "Run a DHCP server",
            "dnsNameservers": "upstream_dns",
            "fixedIpAssignments": {
                "aa:bb:cc:dd:ee:ff": {"ip": "10.0.10.5", "name": "printer"}
            },
            "reservedIpRanges": [
                {"start": "10.0.10.200", "end": "10.0.10.250", "comment": "static"}
            ]
        }])))
        .mount(&server)
        .await;

    let vlans = client.list_vlans("N_1").await.unwrap();
    assert_eq!(vlans.len(), 1);
    let vlan = &vlans[0];
    assert_eq!(vlan.id, 10);
    assert_eq!(vlan.appliance_ip.as_deref(), Some("10.0.10.1"));
    assert_eq!(vlan.fixed_ip_assignments["aa:bb:cc:dd:ee:ff"].ip, "10.0.10.5");
    assert_eq!(vlan.reserved_ip_ranges[0].end, "10.0.10.250");
}

#[tokio::test]
async fn test_create_vlan_posts_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(network_path("appliance/vlans")))
        .and(body_json(json!({
            "id": "2",
            "name": "Guest",
            "subnet": "10.0.2.0/24",
            "applianceIp": "10.0.2.1",
            "ipv6": {"enabled": true}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "2",
            "name": "Guest",
            "subnet": "10.0.2.0/24",
            "applianceIp": "10.0.2.1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_vlan(
            "N_1",
            &CreateVlanRequest {
                id: 2,
                name: "Guest".into(),
                subnet: "10.0.2.0/24".into(),
                appliance_ip: "10.0.2.1".into(),
                vpn_mode: None,
                ipv6: Some(sitesync_api::models::Ipv6Settings { enabled: true }),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, 2);
}

#[tokio::test]
async fn test_vlans_disabled_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(network_path("appliance/vlans")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": ["VLANs are not enabled for this network"]
        })))
        .mount(&server)
        .await;

    let err = client.list_vlans("N_1").await.unwrap_err();
    assert!(err.is_vlans_disabled(), "unexpected error: {err:?}");
}

// ── Ports ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_port_sends_only_set_fields() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(network_path("appliance/ports/7")))
        .and(body_json(json!({"accessPolicy": "hybrid-radius"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 7,
            "enabled": true,
            "type": "access",
            "vlan": 2,
            "accessPolicy": "hybrid-radius"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let port = client
        .update_port(
            "N_1",
            7,
            &UpdatePortRequest {
                access_policy: Some("hybrid-radius".into()),
                ..UpdatePortRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(port.access_policy.as_deref(), Some("hybrid-radius"));
}

#[tokio::test]
async fn test_missing_port_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(network_path("appliance/ports/99")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_port("N_1", 99).await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let (server, client) = setup_with_retry(RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    })
    .await;

    Mock::given(method("GET"))
        .and(path(network_path("appliance/ports")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(network_path("appliance/ports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 3, "enabled": true, "type": "trunk", "vlan": 1, "allowedVlans": "all"}
        ])))
        .mount(&server)
        .await;

    let ports = client.list_ports("N_1").await.unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port_type, "trunk");
}

#[tokio::test]
async fn test_rate_limit_exhausted() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = client.list_ports("N_1").await;
    assert!(
        matches!(result, Err(Error::RateLimited { retry_after_secs: 7 })),
        "expected RateLimited, got: {result:?}"
    );
}
