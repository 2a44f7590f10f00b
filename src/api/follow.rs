use serde::{Deserialize, Serialize};

use super::{send_accepted, ApiError};
use crate::auth::{ApiRequest, AuthGateway, Session};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowStatus {
    Following,
    /// Waiting for the followee to accept.
    Requested,
    #[serde(other)]
    Unknown,
}

/// One follow relation involving the signed-in user, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    pub status: FollowStatus,
}

async fn change_relation<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    request: ApiRequest,
    target_id: i64,
) -> Result<(), ApiError> {
    send_accepted(gateway, &request).await?;
    tracing::debug!(method = %request.method(), target_id, "Follow relation updated");
    Ok(())
}

/// Follow a public account.
pub async fn follow<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    target_id: i64,
) -> Result<(), ApiError> {
    let request = ApiRequest::post(format!("/api/user/{}/follow/{target_id}", session.user_id()));
    change_relation(gateway, request, target_id).await
}

/// Ask to follow a private account.
pub async fn request_follow<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    target_id: i64,
) -> Result<(), ApiError> {
    let request = ApiRequest::post(format!("/api/user/{}/request/{target_id}", session.user_id()));
    change_relation(gateway, request, target_id).await
}

/// Stop following, or withdraw a pending request.
pub async fn unfollow<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    target_id: i64,
) -> Result<(), ApiError> {
    let request =
        ApiRequest::delete(format!("/api/user/{}/unfollow/{target_id}", session.user_id()));
    change_relation(gateway, request, target_id).await
}

pub async fn accept_request<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    requester_id: i64,
) -> Result<(), ApiError> {
    let request = ApiRequest::post(format!(
        "/api/user/{}/accept-request/{requester_id}",
        session.user_id()
    ));
    change_relation(gateway, request, requester_id).await
}

pub async fn decline_request<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    requester_id: i64,
) -> Result<(), ApiError> {
    let request = ApiRequest::delete(format!(
        "/api/user/{}/decline-request/{requester_id}",
        session.user_id()
    ));
    change_relation(gateway, request, requester_id).await
}

pub async fn follow_statuses<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
) -> Result<Vec<Follow>, ApiError> {
    let request = ApiRequest::get(format!("/api/user/{}/followStatuses", session.user_id()));
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::signed_in;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_ok(server: &MockServer, verb: &str, route: &str) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_follow_request_and_unfollow_routes() {
        let server = MockServer::start().await;
        mount_ok(&server, "POST", "/api/user/7/follow/9").await;
        mount_ok(&server, "POST", "/api/user/7/request/11").await;
        mount_ok(&server, "DELETE", "/api/user/7/unfollow/9").await;

        let (gateway, session) = signed_in(&server).await;
        follow(&gateway, &session, 9).await.unwrap();
        request_follow(&gateway, &session, 11).await.unwrap();
        unfollow(&gateway, &session, 9).await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_and_decline_requests() {
        let server = MockServer::start().await;
        mount_ok(&server, "POST", "/api/user/7/accept-request/3").await;
        mount_ok(&server, "DELETE", "/api/user/7/decline-request/4").await;

        let (gateway, session) = signed_in(&server).await;
        accept_request(&gateway, &session, 3).await.unwrap();
        decline_request(&gateway, &session, 4).await.unwrap();
    }

    #[tokio::test]
    async fn test_follow_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/7/followStatuses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "followerId": 7, "followeeId": 9, "status": "FOLLOWING"},
                {"id": 2, "followerId": 3, "followeeId": 7, "status": "REQUESTED"},
                {"id": 3, "followerId": 7, "followeeId": 5, "status": "BLOCKED"}
            ])))
            .mount(&server)
            .await;

        let (gateway, session) = signed_in(&server).await;
        let statuses = follow_statuses(&gateway, &session).await.unwrap();

        let kinds: Vec<FollowStatus> = statuses.iter().map(|f| f.status).collect();
        assert_eq!(
            kinds,
            vec![FollowStatus::Following, FollowStatus::Requested, FollowStatus::Unknown]
        );
        assert_eq!(statuses[1].follower_id, 3);
    }

    #[tokio::test]
    async fn test_follow_self_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/7/follow/7"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Cannot follow yourself"))
            .mount(&server)
            .await;

        let (gateway, session) = signed_in(&server).await;
        let err = follow(&gateway, &session, 7).await.unwrap_err();
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Cannot follow yourself");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
