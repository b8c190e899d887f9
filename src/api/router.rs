//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router with request tracing.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/alerts/permission",
            get(endpoints::alerts::permission).post(endpoints::alerts::request_permission),
        )
        .route(
            "/patients/:user_id/sources",
            put(endpoints::sessions::replace_sources),
        )
        .route("/patients/:user_id/session", delete(endpoints::sessions::end))
        .route(
            "/patients/:user_id/notifications",
            get(endpoints::notifications::list)
                .post(endpoints::notifications::create)
                .delete(endpoints::notifications::clear_all),
        )
        .route(
            "/patients/:user_id/notifications/:id",
            delete(endpoints::notifications::delete),
        )
        .route("/patients/:user_id/records", post(endpoints::records::created))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::models::NewRemoteNotification;
    use crate::notifications::feed::FeedCallback;
    use crate::notifications::{FeedError, RemoteFeed, Subscription};
    use crate::session::tests::services;
    use std::sync::Arc;

    fn test_ctx() -> ApiContext {
        let (services, _feed) = services();
        ApiContext::new(services)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(ctx: &ApiContext, req: Request<Body>) -> (StatusCode, Value) {
        let response = api_router(ctx.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn sources_with_checkup() -> Value {
        json!({
            "appointments": [{
                "id": "A1",
                "title": "Checkup",
                "date": "2025-01-16",
                "time": "10:00",
                "type": "appointment"
            }]
        })
    }

    async fn with_session(ctx: &ApiContext) {
        let (status, _) = send(
            ctx,
            request("PUT", "/api/patients/p1/sources", Some(sources_with_checkup())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_sessions() {
        let ctx = test_ctx();
        with_session(&ctx).await;
        let (status, body) = send(&ctx, request("GET", "/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 1);
    }

    #[tokio::test]
    async fn list_without_session_is_404() {
        let ctx = test_ctx();
        let (status, body) =
            send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NO_SESSION");
    }

    #[tokio::test]
    async fn sources_drive_generated_notifications() {
        let ctx = test_ctx();
        with_session(&ctx).await;

        let (status, body) =
            send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["unreadCount"], 1);
        let first = &body["notifications"][0];
        assert_eq!(first["id"], "A1-tomorrow");
        assert_eq!(first["isGenerated"], true);
        assert_eq!(first["timeAgo"], "5 minutes ago");
    }

    #[tokio::test]
    async fn dismissing_generated_notification() {
        let ctx = test_ctx();
        with_session(&ctx).await;

        let (status, body) = send(
            &ctx,
            request("DELETE", "/api/patients/p1/notifications/A1-tomorrow", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "dismissed");

        let (_, body) = send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        assert_eq!(body["totalCount"], 0);
    }

    #[tokio::test]
    async fn created_notification_joins_the_list() {
        let ctx = test_ctx();
        with_session(&ctx).await;

        let (status, body) = send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/notifications",
                Some(json!({ "title": "Lab results ready", "message": "Your results are in", "priority": "high" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (_, body) = send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        assert_eq!(body["totalCount"], 2);
        let listed: Vec<&str> = body["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|n| n["id"].as_str())
            .collect();
        assert!(listed.contains(&id.as_str()));

        let (status, body) = send(
            &ctx,
            request("DELETE", &format!("/api/patients/p1/notifications/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "deleted");
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let ctx = test_ctx();
        let (status, body) = send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/notifications",
                Some(json!({ "title": "  ", "message": "body" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn search_filters_but_keeps_counts() {
        let ctx = test_ctx();
        with_session(&ctx).await;
        send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/notifications",
                Some(json!({ "title": "Billing", "message": "Invoice available" })),
            ),
        )
        .await;

        let (_, body) = send(
            &ctx,
            request("GET", "/api/patients/p1/notifications?q=checkup", None),
        )
        .await;
        assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(body["notifications"][0]["id"], "A1-tomorrow");
        assert_eq!(body["totalCount"], 2);
    }

    #[tokio::test]
    async fn created_symptom_updates_sources_and_feed() {
        let ctx = test_ctx();
        with_session(&ctx).await;

        let (status, _) = send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/records",
                Some(json!({
                    "kind": "symptom",
                    "record": {
                        "id": "S1",
                        "name": "Migraine",
                        "severity": 4,
                        "startDate": "2025-01-14"
                    }
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let session = ctx.session("p1").unwrap();
        assert_eq!(session.center().sources().symptoms.len(), 1);
        let titles: Vec<String> = session
            .center()
            .summary()
            .notifications
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert!(titles.contains(&"New Symptom Tracked".to_string()));
    }

    /// Feed that rejects every call.
    struct DownFeed;

    impl RemoteFeed for DownFeed {
        fn subscribe(&self, _user_id: &str, _callback: FeedCallback) -> Result<Subscription, FeedError> {
            Err(FeedError::Unavailable("offline".into()))
        }

        fn delete(&self, _id: &str) -> Result<bool, FeedError> {
            Err(FeedError::Unavailable("offline".into()))
        }

        fn create(&self, _new: NewRemoteNotification) -> Result<String, FeedError> {
            Err(FeedError::Unavailable("offline".into()))
        }

        fn delete_all(&self, _user_id: &str) -> Result<usize, FeedError> {
            Err(FeedError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn created_record_is_kept_when_feed_is_down() {
        let (mut services, _feed) = services();
        services.feed = Arc::new(DownFeed);
        let ctx = ApiContext::new(services);
        with_session(&ctx).await;

        let (status, body) = send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/records",
                Some(json!({
                    "kind": "medical_record",
                    "record": {
                        "id": "R1",
                        "type": "pdf",
                        "title": "Blood panel",
                        "content": "",
                        "uploadDate": "2025-01-15",
                        "category": "test"
                    }
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notificationId"], Value::Null);

        let (_, body) = send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        let listed: Vec<&str> = body["notifications"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|n| n["id"].as_str())
            .collect();
        assert!(listed.contains(&"record-R1"));
    }

    #[tokio::test]
    async fn clear_all_empties_the_list() {
        let ctx = test_ctx();
        with_session(&ctx).await;
        send(
            &ctx,
            request(
                "POST",
                "/api/patients/p1/notifications",
                Some(json!({ "title": "Welcome", "message": "Hello" })),
            ),
        )
        .await;

        let (status, body) =
            send(&ctx, request("DELETE", "/api/patients/p1/notifications", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 2);

        let (_, body) = send(&ctx, request("GET", "/api/patients/p1/notifications", None)).await;
        assert_eq!(body["totalCount"], 0);
    }

    #[tokio::test]
    async fn ending_a_session() {
        let ctx = test_ctx();
        with_session(&ctx).await;

        let (status, _) = send(&ctx, request("DELETE", "/api/patients/p1/session", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(ctx.session_count(), 0);

        let (status, _) = send(&ctx, request("DELETE", "/api/patients/p1/session", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn alert_permission_routes() {
        let ctx = test_ctx();
        let (status, body) = send(&ctx, request("GET", "/api/alerts/permission", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permission"], "granted");

        let (status, body) = send(&ctx, request("POST", "/api/alerts/permission", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permission"], "granted");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let ctx = test_ctx();
        let (status, _) = send(&ctx, request("GET", "/api/nonexistent", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
