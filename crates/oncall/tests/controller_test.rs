//! Integration tests for the alert controller against a mocked on-call API.

use std::time::Duration;

use serde_json::{Value, json};
use vigil_oncall::{
    AlertController, AlertControllerOptions, BetterStack, HeartbeatSettings, HeartbeatType,
    Hysteresis, IncidentCategory, IncidentFilter,
};
use vigil_rpc::RetryingClient;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "cFJZVRaybb2PBwxTiAiRLiQfHY2KPoEXKwvCZNxTXzZCN2VUX";

fn client(server: &MockServer) -> BetterStack {
    let transport = RetryingClient::new("api-key", Duration::from_secs(5))
        .unwrap()
        .with_backoff(Duration::from_millis(5));

    BetterStack::with_transport(transport, &server.uri(), "ops@example.com")
}

fn controller(server: &MockServer) -> AlertController {
    AlertController::new(
        client(server),
        AlertControllerOptions {
            node_address: ADDRESS.to_string(),
            heartbeat_settings: HeartbeatSettings::default(),
            hysteresis: Hysteresis::default(),
        },
    )
}

fn page(data: Vec<Value>, next: Option<String>) -> Value {
    json!({ "data": data, "pagination": { "next": next } })
}

fn heartbeat(id: &str, name: &str, url: &str) -> Value {
    json!({
        "id": id,
        "type": "heartbeat",
        "attributes": { "name": name, "url": url, "period": 60, "grace": 300, "status": "up" }
    })
}

fn incident(id: usize, name: &str, started_at: &str, resolved: bool) -> Value {
    json!({
        "id": id.to_string(),
        "type": "incident",
        "attributes": {
            "name": name,
            "cause": "test",
            "started_at": started_at,
            "resolved_at": if resolved { Some(started_at) } else { None }
        }
    })
}

async fn mount_incident_creation(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/incidents"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": incident(1, "x", "2024-01-01T00:00:00Z", false) })),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_raise_twice_creates_one_incident() {
    let server = MockServer::start().await;
    mount_incident_creation(&server, 1).await;

    let controller = controller(&server);

    assert!(
        controller
            .raise("Chainflip", IncidentCategory::Reputation, 1999.0, "reputation fell to 1,999!")
            .await
    );
    assert!(
        !controller
            .raise("Chainflip", IncidentCategory::Reputation, 1999.0, "reputation fell to 1,999!")
            .await
    );
}

#[tokio::test]
async fn test_reputation_retrigger_requires_material_drop() {
    let server = MockServer::start().await;
    mount_incident_creation(&server, 2).await;

    let controller = controller(&server);

    assert!(controller.raise("Chainflip", IncidentCategory::Reputation, 1000.0, "1,000").await);
    assert!(!controller.raise("Chainflip", IncidentCategory::Reputation, 900.0, "900").await);
    assert!(controller.raise("Chainflip", IncidentCategory::Reputation, 700.0, "700").await);
}

#[tokio::test]
async fn test_categories_are_tracked_independently() {
    let server = MockServer::start().await;
    mount_incident_creation(&server, 3).await;

    let controller = controller(&server);

    assert!(controller.raise("Chainflip", IncidentCategory::Penalty, 10.0, "10").await);
    assert!(!controller.raise("Chainflip", IncidentCategory::Penalty, 14.0, "14").await);
    assert!(controller.raise("Chainflip", IncidentCategory::Restart, 1.0, "1").await);
    assert!(!controller.raise("Chainflip", IncidentCategory::Restart, 1.0, "1").await);
    assert!(controller.raise("Chainflip", IncidentCategory::Penalty, 15.0, "15").await);
}

#[tokio::test]
async fn test_incident_body_carries_identity_and_summary() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/incidents"))
        .and(body_partial_json(json!({
            "requester_email": "ops@example.com",
            "name": "Chainflip Penalty (2VUX)",
            "summary": "penalized for 42 reputation! (MissedHeartbeat)",
            "push": true
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": incident(9, "x", "2024-01-01T00:00:00Z", false) })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let raised = controller(&server)
        .raise(
            "Chainflip",
            IncidentCategory::Penalty,
            42.0,
            "penalized for 42 reputation! (MissedHeartbeat)",
        )
        .await;

    assert!(raised);
}

#[tokio::test]
async fn test_resolve_only_touches_open_matching_incidents() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                incident(1, "Chainflip Reputation (2VUX)", "2024-01-01T00:00:00Z", false),
                incident(2, "Chainflip Reputation (2VUX)", "2024-01-02T00:00:00Z", true),
                incident(3, "Chainflip Penalty (2VUX)", "2024-01-03T00:00:00Z", false),
            ],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/incidents/1/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/incidents/[23]/resolve$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolved = controller(&server)
        .resolve("Chainflip", IncidentCategory::Reputation)
        .await;

    assert_eq!(resolved, 1);
}

#[tokio::test]
async fn test_resolve_without_open_incident_is_noop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolved = controller(&server)
        .resolve("Chainflip", IncidentCategory::Penalty)
        .await;

    assert_eq!(resolved, 0);
}

#[tokio::test]
async fn test_return_early_stops_at_first_matching_page() {
    let server = MockServer::start().await;
    let title = "Chainflip Penalty (2VUX)";

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .and(query_param("per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![incident(1, "Solana Restart (2VUX)", "2024-01-01T00:00:00Z", false)],
            Some(format!("{}/incidents?page=2", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![incident(2, title, "2024-01-02T00:00:00Z", false)],
            Some(format!("{}/incidents?page=3", server.uri())),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![incident(3, title, "2024-01-03T00:00:00Z", false)],
            None,
        )))
        .expect(0)
        .mount(&server)
        .await;

    let filter = IncidentFilter {
        title: Some(title.to_string()),
        resolved: None,
    };
    let incidents = client(&server).incidents(&filter, true).await.unwrap();

    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].id, "2");
}

#[tokio::test]
async fn test_listing_without_return_early_walks_every_page() {
    let server = MockServer::start().await;
    let title = "Chainflip Penalty (2VUX)";

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .and(query_param("per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![incident(1, title, "2024-01-03T00:00:00Z", false)],
            Some(format!("{}/incidents?page=2", server.uri())),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![incident(2, title, "2024-01-01T00:00:00Z", false)],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let filter = IncidentFilter::unresolved(title);
    let incidents = client(&server).incidents(&filter, false).await.unwrap();

    // Sorted oldest first.
    let ids = incidents.iter().map(|i| i.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn test_cleanup_keeps_most_recent_incidents() {
    let server = MockServer::start().await;

    let incidents = (0..103)
        .map(|i| {
            incident(
                i,
                "Chainflip Penalty (2VUX)",
                &format!("2024-01-01T00:{:02}:{:02}Z", i / 60, i % 60),
                true,
            )
        })
        .collect::<Vec<_>>();

    Mock::given(method("GET"))
        .and(path("/incidents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(incidents, None)))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/incidents/[012]$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let deleted = controller(&server).cleanup(100).await;

    assert_eq!(deleted, 3);
}

#[tokio::test]
async fn test_ensure_heartbeat_reuses_existing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/heartbeats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![heartbeat("5", "Solana Health (2VUX)", "https://example.com/ping")],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller(&server);

    for _ in 0..3 {
        let heartbeat = controller
            .ensure_heartbeat("Solana", HeartbeatType::Health)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(heartbeat.id, "5");
    }
}

#[tokio::test]
async fn test_ensure_heartbeat_creates_group_and_heartbeat() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/heartbeats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/heartbeat-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/heartbeat-groups"))
        .and(body_partial_json(json!({ "name": "Polkadot (2VUX)" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "77", "type": "heartbeat_group", "attributes": { "name": "Polkadot (2VUX)" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/heartbeats"))
        .and(body_partial_json(json!({
            "name": "Polkadot Sync Status (2VUX)",
            "heartbeat_group_id": "77",
            "period": 60,
            "grace": 300
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": heartbeat("8", "Polkadot Sync Status (2VUX)", "https://example.com/ping/8")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let heartbeat = controller(&server)
        .ensure_heartbeat("Polkadot", HeartbeatType::SyncStatus)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(heartbeat.attributes.url, "https://example.com/ping/8");
}

#[tokio::test]
async fn test_send_heartbeat_pings_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/heartbeats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![heartbeat(
                "5",
                "Chainflip Version (2VUX)",
                &format!("{}/ping/abc", server.uri()),
            )],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ping/abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    controller(&server)
        .send_heartbeat("Chainflip", HeartbeatType::Version)
        .await;
}

#[tokio::test]
async fn test_init_heartbeats_creates_only_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/heartbeats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![heartbeat("1", "Chainflip Health (2VUX)", "https://example.com/1")],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/heartbeat-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": "3", "attributes": { "name": "Chainflip (2VUX)" } })],
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/heartbeats"))
        .and(body_partial_json(json!({ "name": "Chainflip Version (2VUX)" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": heartbeat("2", "Chainflip Version (2VUX)", "https://example.com/2")
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/heartbeat-groups"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    controller(&server)
        .init_heartbeats("Chainflip", &[HeartbeatType::Health, HeartbeatType::Version])
        .await;
}
