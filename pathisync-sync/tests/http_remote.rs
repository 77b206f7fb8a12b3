use pathisync_sync::remote::{HttpRemote, Remote};
use pathisync_sync::transport::{RequestOptions, Transport};
use pathisync_sync::SyncError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_for(server: &MockServer) -> HttpRemote {
    // trailing slash exercises base URL normalization
    let transport = Transport::from_parts(&format!("{}/", server.uri()), "secret").expect("transport");
    HttpRemote::new(transport)
}

// ── Listing ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn fetch_all_sends_token_and_parses_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repository/flows"))
        .and(header("flow-token", "secret"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "A"}])))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let entities = tokio::task::spawn_blocking(move || remote.fetch_all("/repository/flows"))
        .await
        .expect("join")
        .expect("fetch");
    assert_eq!(entities, vec![json!({"name": "A"})]);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_listing_points_at_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = tokio::task::spawn_blocking(move || remote.fetch_all("/repository/triggers"))
        .await
        .expect("join")
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteFetch { .. }));
    assert!(err.to_string().contains(".env"));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_listing_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let err = tokio::task::spawn_blocking(move || remote.fetch_all("/repository/flows"))
        .await
        .expect("join")
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteFetch { .. }));
}

// ── Writes ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn push_posts_json_and_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repository/sharedConfig"))
        .and(body_json(json!({"referenceId": "B", "value": 1})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let status = tokio::task::spawn_blocking(move || {
        remote.push("/repository/sharedConfig", &json!({"referenceId": "B", "value": 1}))
    })
    .await
    .expect("join")
    .expect("non-2xx is not an error");
    assert_eq!(status, 500);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_targets_the_entity_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/repository/flows/A"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server);
    let status = tokio::task::spawn_blocking(move || remote.delete("/repository/flows/A"))
        .await
        .expect("join")
        .expect("delete");
    assert_eq!(status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn caller_headers_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Transport::from_parts(&server.uri(), "secret").expect("transport");
    let response = tokio::task::spawn_blocking(move || {
        transport.request("/health", RequestOptions::get().header("X-Trace", "abc"))
    })
    .await
    .expect("join")
    .expect("request");
    assert_eq!(response.status, 204);
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let transport = Transport::from_parts("http://127.0.0.1:9", "secret").expect("transport");
    let err = transport
        .request("/repository/flows", RequestOptions::get())
        .unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }));
}
