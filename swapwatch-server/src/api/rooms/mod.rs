//! Room management API.
//!
//! # Endpoints
//!
//! - `POST   /rooms`                           – create a room
//! - `DELETE /rooms/{code}`                    – delete a room
//! - `POST   /rooms/{code}/extend`             – push expiry forward
//! - `GET    /rooms/{code}/config`             – read config
//! - `PATCH  /rooms/{code}/config`             – partial config update
//! - `GET    /rooms/{code}/wallets`            – list tracked wallets
//! - `POST   /rooms/{code}/wallets`            – track a wallet
//! - `DELETE /rooms/{code}/wallets/{address}`  – stop tracking a wallet
//! - `PATCH  /rooms/{code}/wallets/{address}`  – update a wallet label
//! - `GET    /rooms/{code}/presence`           – live viewer count
//! - `GET    /rooms/{code}/ws`                 – WebSocket upgrade

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use swapwatch_core::error::RoomError;

use crate::state::AppState;

mod manage;
mod wallets;
mod ws;

/// Build the room API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(manage::create_room))
        .route("/{code}", delete(manage::delete_room))
        .route("/{code}/extend", post(manage::extend_room))
        .route(
            "/{code}/config",
            get(manage::get_config).patch(manage::patch_config),
        )
        .route(
            "/{code}/wallets",
            get(wallets::list_wallets).post(wallets::add_wallet),
        )
        .route(
            "/{code}/wallets/{address}",
            delete(wallets::remove_wallet).patch(wallets::update_label),
        )
        .route("/{code}/presence", get(wallets::get_presence))
        .route("/{code}/ws", get(ws::room_ws))
}

/// Wraps [`RoomError`] with the HTTP status mapping for this API.
#[derive(Debug)]
pub(super) struct RoomApiError(RoomError);

impl From<RoomError> for RoomApiError {
    fn from(err: RoomError) -> Self {
        Self(err)
    }
}

impl IntoResponse for RoomApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self.0 {
            RoomError::InvalidAddress(_)
            | RoomError::InvalidLabel
            | RoomError::InvalidThreshold(_)
            | RoomError::InvalidHours(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            RoomError::AlreadyExists(_) | RoomError::LimitExceeded => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            RoomError::WalletNotFound(_) | RoomError::NotFound(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            RoomError::Storage(e) => {
                tracing::error!(error = %e, "room API storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            RoomError::Index(e) => {
                tracing::error!(error = %e, "room API index error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::runtime::{RoomsConfig, SharedConfig, WebhookConfig};
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Arc;
    use swapwatch_core::index::WalletIndex;
    use swapwatch_core::notify::LogNotifier;
    use swapwatch_core::room::{RoomDeps, RoomRegistry, RoomStore};
    use swapwatch_core::router::EventRouter;
    use swapwatch_core::sync::FilterSyncHandle;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    async fn test_app() -> axum::Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        swapwatch_core::run_migrations(&pool).await.unwrap();

        let index = WalletIndex::new(pool.clone());
        let deps = RoomDeps {
            store: RoomStore::new(pool),
            index: index.clone(),
            sync: FilterSyncHandle::disconnected(),
            notifier: Arc::new(LogNotifier),
        };
        let registry = RoomRegistry::new(deps, 48);
        let router = EventRouter::new(index, registry.clone());
        let config = SharedConfig {
            webhook: Arc::new(RwLock::new(WebhookConfig::new(HashMap::new()))),
            rooms: Arc::new(RwLock::new(RoomsConfig {
                default_ttl_hours: 48,
            })),
        };
        build_router(AppState::new(registry, router, config))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_from(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const WALLET: &str = "0x00000000000000000000000000000000000000b2";

    async fn create_room(app: &axum::Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/rooms", json!({"ttlHours": 24})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_from(response).await;
        body["code"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn create_add_list_round_trip() {
        let app = test_app().await;
        let code = create_room(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/rooms/{code}/wallets"),
                json!({"address": WALLET, "label": "whale"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/rooms/{code}/wallets"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_from(response).await;
        assert_eq!(body["wallets"][0]["address"], WALLET);
        assert_eq!(body["wallets"][0]["label"], "whale");
    }

    #[tokio::test]
    async fn duplicate_wallet_conflicts() {
        let app = test_app().await;
        let code = create_room(&app).await;
        let add = || {
            json_request(
                "POST",
                &format!("/rooms/{code}/wallets"),
                json!({"address": WALLET}),
            )
        };
        assert_eq!(
            app.clone().oneshot(add()).await.unwrap().status(),
            StatusCode::CREATED
        );
        assert_eq!(
            app.clone().oneshot(add()).await.unwrap().status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn bad_address_and_label_are_rejected() {
        let app = test_app().await;
        let code = create_room(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/rooms/{code}/wallets"),
                json!({"address": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/rooms/{code}/wallets"),
                json!({"address": WALLET, "label": "x".repeat(65)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let app = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/rooms/ZZZZZZZZ/presence")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn extend_and_patch_config() {
        let app = test_app().await;
        let code = create_room(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/rooms/{code}/extend"),
                json!({"hours": 24}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/rooms/{code}/config"),
                json!({"notifyThreshold": 5000.0, "notifyTarget": "ops"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_from(response).await;
        assert_eq!(body["notifyThreshold"], 5000.0);
        assert_eq!(body["notifyTarget"], "ops");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/rooms/{code}/extend"),
                json!({"hours": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_null_clears_notification_config() {
        let app = test_app().await;
        let code = create_room(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/rooms/{code}/config"),
                json!({"notifyThreshold": 5000.0, "notifyTarget": "ops"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/rooms/{code}/config"),
                json!({"notifyTarget": null}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_from(response).await;
        assert_eq!(body["notifyThreshold"], 5000.0);
        assert!(body.get("notifyTarget").is_none());
    }

    #[tokio::test]
    async fn delete_room_then_not_found() {
        let app = test_app().await;
        let code = create_room(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/rooms/{code}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/rooms/{code}/config"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn presence_starts_at_zero() {
        let app = test_app().await;
        let code = create_room(&app).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/rooms/{code}/presence"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_from(response).await;
        assert_eq!(body["count"], 0);
    }
}
