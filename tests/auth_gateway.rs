//! Integration tests for the authenticated request flow: login, refresh on
//! 401, single retry, and session teardown.
//!
//! The API is played by a wiremock server; local state lives in an
//! in-memory SQLite store so the durable `remove_all` path is exercised.

use anilog::auth::{ApiRequest, AuthGateway, Outcome, Session};
use anilog::storage::keys::{ACCESS_TOKEN, REFRESH_TOKEN, SESSION_KEYS, USER_ID};
use anilog::storage::{KeyValueStore, SqliteStore};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_store() -> SqliteStore {
    SqliteStore::open(":memory:").await.unwrap()
}

async fn session_keys_present(store: &SqliteStore) -> usize {
    let mut present = 0;
    for key in SESSION_KEYS {
        if store.get(key).await.unwrap().is_some() {
            present += 1;
        }
    }
    present
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "first",
            "refreshToken": "refresh",
            "userId": 7
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_request_with_refresh() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/user/7/list/ANIME"))
        .and(header("Authorization", "Bearer first"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "second"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/7/list/ANIME"))
        .and(header("Authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let store = test_store().await;
    let gateway = AuthGateway::new(reqwest::Client::new(), server.uri(), store.clone());
    let session = gateway.login("yui", "pw").await.unwrap();

    let outcome = gateway
        .send(&ApiRequest::get(format!("/api/user/{}/list/ANIME", session.user_id())))
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        store.get(ACCESS_TOKEN).await.unwrap().as_deref(),
        Some("second")
    );
    assert_eq!(
        store.get(REFRESH_TOKEN).await.unwrap().as_deref(),
        Some("refresh")
    );
    assert_eq!(store.get(USER_ID).await.unwrap().as_deref(), Some("7"));
}

#[tokio::test]
async fn test_failed_refresh_tears_down_whole_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile/7"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = test_store().await;
    Session::new("stale", "refresh", 7).save(&store).await.unwrap();
    store.set("discoverData", "{}").await.unwrap();
    let gateway = AuthGateway::new(reqwest::Client::new(), server.uri(), store.clone());

    let outcome = gateway
        .send(&ApiRequest::get("/api/profile/7"))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Unauthorized(_)));
    assert_eq!(session_keys_present(&store).await, 0);
    // Only the session is torn down.
    assert!(store.get("discoverData").await.unwrap().is_some());
}

#[tokio::test]
async fn test_no_session_means_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = test_store().await;
    let gateway = AuthGateway::new(reqwest::Client::new(), server.uri(), store.clone());
    let outcome = gateway
        .send(&ApiRequest::delete("/api/user/7/watched/21"))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::SessionMissing));
    assert!(outcome.needs_login());
}

#[tokio::test]
async fn test_logout_after_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let store = test_store().await;
    let gateway = AuthGateway::new(reqwest::Client::new(), server.uri(), store.clone());
    gateway.login("yui", "pw").await.unwrap();
    assert_eq!(session_keys_present(&store).await, 3);

    gateway.logout().await.unwrap();
    assert_eq!(session_keys_present(&store).await, 0);
    assert!(gateway.session().await.unwrap().is_none());
}
