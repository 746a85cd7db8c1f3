//! Webhook ingress handler.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use swapwatch_core::error::RouteError;
use swapwatch_sdk::objects::webhook::WebhookAck;

use crate::api::extractors::VerifiedWebhook;
use crate::state::AppState;

/// `POST /webhook/{provider}` — authenticated swap event ingress.
///
/// The [`VerifiedWebhook`] extractor has already checked the signature and
/// parsed the body; this handler only routes.  Events for untracked wallets
/// still get a 200 `ignored` ack so providers do not retry them.
pub(super) async fn receive_webhook(
    State(state): State<AppState>,
    webhook: VerifiedWebhook,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    tracing::debug!(
        provider = %webhook.provider,
        wallet = %webhook.event.wallet_address,
        "webhook delivery received"
    );
    let ack = state.router.route(webhook.event).await?;
    Ok(Json(ack))
}

/// Errors that can occur while routing a verified webhook.
#[derive(Debug)]
pub(super) enum WebhookApiError {
    /// The event's wallet address is missing or malformed.
    InvalidWallet,
    /// The wallet index could not be read.
    Index(swapwatch_core::error::IndexError),
}

impl From<RouteError> for WebhookApiError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::InvalidWallet(_) => Self::InvalidWallet,
            RouteError::Index(e) => Self::Index(e),
        }
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WebhookApiError::InvalidWallet => {
                (StatusCode::BAD_REQUEST, "missing or malformed wallet address").into_response()
            }
            WebhookApiError::Index(e) => {
                tracing::error!(error = %e, "webhook routing failed on index lookup");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::runtime::{RoomsConfig, SharedConfig, WebhookConfig};
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Arc;
    use swapwatch_core::index::WalletIndex;
    use swapwatch_core::notify::LogNotifier;
    use swapwatch_core::room::{RoomDeps, RoomRegistry, RoomStore};
    use swapwatch_core::router::EventRouter;
    use swapwatch_core::sync::FilterSyncHandle;
    use swapwatch_sdk::objects::webhook::WebhookAck;
    use swapwatch_sdk::signature::{SIGNATURE_HEADER, sign_body};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"whsec_test_secret";

    async fn test_app() -> (axum::Router, AppState, SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        swapwatch_core::run_migrations(&pool).await.unwrap();

        let index = WalletIndex::new(pool.clone());
        let deps = RoomDeps {
            store: RoomStore::new(pool.clone()),
            index: index.clone(),
            sync: FilterSyncHandle::disconnected(),
            notifier: Arc::new(LogNotifier),
        };
        let registry = RoomRegistry::new(deps, 48);
        let router = EventRouter::new(index, registry.clone());

        let mut secrets = HashMap::new();
        secrets.insert("test".to_owned(), String::from_utf8(SECRET.to_vec()).unwrap());
        let config = SharedConfig {
            webhook: Arc::new(RwLock::new(WebhookConfig::new(secrets))),
            rooms: Arc::new(RwLock::new(RoomsConfig {
                default_ttl_hours: 48,
            })),
        };

        let state = AppState::new(registry, router, config);
        (build_router(state.clone()), state, pool)
    }

    fn signed_request(provider: &str, body: &str, key: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/webhook/{provider}"))
            .header(SIGNATURE_HEADER, sign_body(body, key))
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn ack_from(response: axum::response::Response) -> WebhookAck {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const WALLET: &str = "0x00000000000000000000000000000000000000a1";

    fn event_body() -> String {
        format!(r#"{{"walletAddress":"{WALLET}","amountInUsd":1234.5}}"#)
    }

    #[tokio::test]
    async fn untracked_wallet_is_acked_as_ignored() {
        let (app, _state, _pool) = test_app().await;
        let response = app
            .oneshot(signed_request("test", &event_body(), SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack = ack_from(response).await;
        assert_eq!(ack.status, "ignored");
        assert_eq!(ack.total_rooms, 0);
    }

    #[tokio::test]
    async fn tracked_wallet_is_routed() {
        let (app, state, _pool) = test_app().await;
        let room = state.registry.create(None, None, None).await.unwrap();
        room.add_wallet(WALLET.to_owned(), None).await.unwrap();

        let response = app
            .oneshot(signed_request("test", &event_body(), SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack = ack_from(response).await;
        assert_eq!(ack.status, "processed");
        assert_eq!(ack.rooms_notified, 1);
        assert_eq!(ack.details[0].room_code, room.code());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_any_lookup() {
        let (app, _state, pool) = test_app().await;
        // With the pool closed, any index lookup would 500.  A 401 here
        // proves the signature gate runs first.
        pool.close().await;

        let response = app
            .oneshot(signed_request("test", &event_body(), b"wrong-secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let (app, _state, _pool) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/test")
                    .header("content-type", "application/json")
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let (app, _state, _pool) = test_app().await;
        let response = app
            .oneshot(signed_request("nobody", &event_body(), SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn signed_garbage_body_is_bad_request() {
        let (app, _state, _pool) = test_app().await;
        let response = app
            .oneshot(signed_request("test", "not json at all", SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn event_without_wallet_is_bad_request() {
        let (app, _state, _pool) = test_app().await;
        let response = app
            .oneshot(signed_request("test", r#"{"txHash":"0xabc"}"#, SECRET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
