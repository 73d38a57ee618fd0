//! Axum router configuration with middleware.
//!
//! Conversation management lives under `/api/`, the chat socket under
//! `/ws/chat/{conversation_id}`. Middleware: CORS, tracing.
//!
//! When `{data_dir}/static` exists it is served for every other path, so
//! the chat page and its assets can ship next to the database.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/conversations",
            get(handlers::conversations::list_conversations)
                .post(handlers::conversations::create_conversation),
        )
        .route(
            "/conversations/{id}",
            axum::routing::delete(handlers::conversations::delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversations::get_messages),
        )
        .route(
            "/conversations/{id}/rename",
            post(handlers::conversations::rename_conversation),
        );

    let static_dir = state.data_dir.join("static");

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/ws/chat/{conversation_id}", get(handlers::chat_ws::chat_ws))
        .route("/health", get(handlers::health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if static_dir.is_dir() {
        tracing::info!(path = %static_dir.display(), "Static file serving enabled");
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::state::testing::test_state;

    async fn send(router: &Router, method: &str, uri: &str, owner: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header("x-owner-id", owner);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let router = build_router(test_state().await);
        let (status, body) = send(&router, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_turns"], 0);
    }

    #[tokio::test]
    async fn test_conversation_lifecycle() {
        let router = build_router(test_state().await);

        let (status, created) = send(&router, "POST", "/api/conversations", Some("5"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["data"]["owner_id"], 5);
        assert_eq!(created["data"]["title"], "New Chat");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, listed) = send(&router, "GET", "/api/conversations", Some("5"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);

        let (_, others) = send(&router, "GET", "/api/conversations", Some("6"), None).await;
        assert!(others["data"].as_array().unwrap().is_empty());

        let (status, renamed) = send(
            &router,
            "POST",
            &format!("/api/conversations/{id}/rename"),
            Some("5"),
            Some(serde_json::json!({ "title": "Tiles" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["data"]["title"], "Tiles");

        let (status, messages) = send(
            &router,
            "GET",
            &format!("/api/conversations/{id}/messages"),
            Some("5"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(messages["data"].as_array().unwrap().is_empty());

        let (status, _) = send(&router, "DELETE", &format!("/api/conversations/{id}"), Some("5"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &router,
            "GET",
            &format!("/api/conversations/{id}/messages"),
            Some("5"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "CONVERSATION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_other_owner_is_forbidden() {
        let router = build_router(test_state().await);
        let (_, created) = send(&router, "POST", "/api/conversations", Some("1"), None).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&router, "DELETE", &format!("/api/conversations/{id}"), Some("2"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errors"][0]["code"], "ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_bad_input_is_rejected() {
        let router = build_router(test_state().await);

        let (status, _) = send(&router, "GET", "/api/conversations/nope/messages", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, "GET", "/api/conversations", Some("abc"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, created) = send(&router, "POST", "/api/conversations", None, None).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let (status, body) = send(
            &router,
            "POST",
            &format!("/api/conversations/{id}/rename"),
            None,
            Some(serde_json::json!({ "title": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_static_dir_served_when_present() {
        let state = test_state().await;
        let static_dir = state.data_dir.join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("index.html"), "<h1>shop</h1>").unwrap();

        let router = build_router(state);
        let response = router
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>shop</h1>");
    }
}
