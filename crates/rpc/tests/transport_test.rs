//! Integration tests for the node and retrying clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use url::Url;
use vigil_rpc::{Error, Method, NodeClient, RetryingClient, StatusCode};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn node_client() -> NodeClient {
    NodeClient::new(Duration::from_secs(5)).expect("client")
}

fn retrying_client() -> RetryingClient {
    RetryingClient::new("secret", Duration::from_secs(5))
        .expect("client")
        .with_backoff(Duration::from_millis(5))
}

#[tokio::test]
async fn test_json_rpc_returns_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getSlot"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": 42})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let result = node_client().json_rpc(&url, "getSlot", json!([])).await.unwrap();

    assert_eq!(result, json!(42));
}

#[tokio::test]
async fn test_json_rpc_surfaces_error_member() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        })))
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let result = node_client().json_rpc(&url, "nope", json!([])).await;

    assert!(matches!(result, Err(Error::JsonRpc(_))));
}

#[tokio::test]
async fn test_json_rpc_is_single_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let result = node_client().json_rpc(&url, "system_health", json!([])).await;

    assert!(matches!(
        result,
        Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE))
    ));
}

#[tokio::test]
async fn test_graphql_returns_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"first": 10}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"auction": {"minActiveBid": "1"}}})),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let data = node_client()
        .graphql(&url, "query { auction }", json!({"first": 10}))
        .await
        .unwrap();

    assert_eq!(data["auction"]["minActiveBid"], "1");
}

#[tokio::test]
async fn test_graphql_partial_failure_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"auction": null},
            "errors": [{"message": "statement timeout"}]
        })))
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let result = node_client().graphql(&url, "query { auction }", json!({})).await;

    match result {
        Err(Error::GraphQl(message)) => assert_eq!(message, "statement timeout"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_retrying_client_retries_until_created() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    Mock::given(method("POST"))
        .and(path("/incidents"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(move |_: &Request| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "7"}}))
            }
        })
        .mount(&server)
        .await;

    let body = json!({"name": "incident"});
    let response = retrying_client()
        .send(
            Method::POST,
            &format!("{}/incidents", server.uri()),
            Some(&body),
        )
        .await
        .unwrap();

    assert_eq!(response["data"]["id"], "7");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retrying_client_treats_wrong_success_code_as_failure() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    // DELETE must answer 204; a 200 is retried.
    Mock::given(method("DELETE"))
        .respond_with(move |_: &Request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(200)
            } else {
                ResponseTemplate::new(204)
            }
        })
        .mount(&server)
        .await;

    let response = retrying_client()
        .send(Method::DELETE, &format!("{}/incidents/1", server.uri()), None)
        .await
        .unwrap();

    assert!(response.is_null());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
