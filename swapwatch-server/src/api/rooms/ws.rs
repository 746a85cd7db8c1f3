//! Per-room WebSocket session loop.
//!
//! A session never touches room state directly: the actor fans frames into
//! the session's outbox, and the loop here only forwards them to the socket
//! and watches for the client going away.

use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use swapwatch_core::error::RoomError;
use swapwatch_core::room::{RoomHandle, SessionHandle};
use swapwatch_sdk::objects::ws::{WsCloseCode, WsServerMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

/// Frames buffered per session before the actor starts dropping them.
const SESSION_BUFFER: usize = 32;

/// `GET /rooms/{code}/ws` — live room stream.
pub(super) async fn room_ws(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_room_ws(socket, state, code))
}

async fn handle_room_ws(mut socket: WebSocket, state: AppState, code: String) {
    let room = match state.registry.get(&code).await {
        Ok(room) => room,
        Err(RoomError::NotFound(_)) => {
            let _ = send_json(
                &mut socket,
                &WsServerMessage::Error {
                    code: WsCloseCode::ROOM_NOT_FOUND,
                    reason: "room not found".into(),
                },
            )
            .await;
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: WsCloseCode::ROOM_NOT_FOUND,
                    reason: "room not found".into(),
                })))
                .await;
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, room = %code, "WS: room lookup failed");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: WsCloseCode::INTERNAL_ERROR,
                    reason: "internal error".into(),
                })))
                .await;
            return;
        }
    };

    let (outbox_tx, mut outbox_rx) = mpsc::channel::<WsServerMessage>(SESSION_BUFFER);
    let session_id = Uuid::new_v4();
    if room
        .connect(SessionHandle {
            id: session_id,
            sender: outbox_tx,
        })
        .await
        .is_err()
    {
        // Room terminated between lookup and connect.
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::ROOM_NOT_FOUND,
                reason: "room not found".into(),
            })))
            .await;
        return;
    }
    tracing::debug!(room = %code, session = %session_id, "WS: session connected");

    loop {
        tokio::select! {
            frame = outbox_rx.recv() => {
                match frame {
                    Some(msg) => {
                        let closing = matches!(msg, WsServerMessage::RoomClosed { .. });
                        if send_json(&mut socket, &msg).await.is_err() {
                            break;
                        }
                        if closing {
                            let _ = socket
                                .send(Message::Close(Some(CloseFrame {
                                    code: WsCloseCode::NORMAL,
                                    reason: "room closed".into(),
                                })))
                                .await;
                            // The actor is already gone; no deregistration needed.
                            return;
                        }
                    }
                    // Actor dropped our sender (room terminated).
                    None => {
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Clients have nothing to say; ignore pings and stray frames.
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    disconnect(&room, session_id).await;
}

async fn disconnect(room: &RoomHandle, session_id: Uuid) {
    room.disconnect(session_id).await;
    tracing::debug!(session = %session_id, "WS: session disconnected");
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use crate::config::runtime::{RoomsConfig, SharedConfig, WebhookConfig};
    use crate::server::build_router;
    use crate::state::AppState;
    use futures_util::StreamExt;
    use serde_json::Value;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use swapwatch_core::index::WalletIndex;
    use swapwatch_core::notify::LogNotifier;
    use swapwatch_core::room::{RoomDeps, RoomRegistry, RoomStore};
    use swapwatch_core::router::EventRouter;
    use swapwatch_core::sync::FilterSyncHandle;
    use swapwatch_sdk::objects::SwapEvent;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::RwLock;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Serve the full app on an ephemeral port; WS upgrades need a real
    /// connection, not a `oneshot` request.
    async fn serve_app() -> (AppState, SocketAddr) {
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
        let state = AppState::new(registry, router, config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (state, addr)
    }

    async fn connect(addr: SocketAddr, code: &str) -> WsClient {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/rooms/{code}/ws"))
            .await
            .unwrap();
        ws
    }

    async fn next_json(ws: &mut WsClient) -> Value {
        match ws.next().await.unwrap().unwrap() {
            ClientMessage::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_sees_presence_swaps_and_room_close() {
        let (state, addr) = serve_app().await;
        let room = state.registry.create(None, None, None).await.unwrap();

        let mut ws = connect(addr, room.code()).await;
        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "presence");
        assert_eq!(frame["count"], 1);
        assert_eq!(room.presence().await.unwrap(), 1);

        let event: SwapEvent = serde_json::from_value(serde_json::json!({
            "walletAddress": "0x00000000000000000000000000000000000000c3",
            "amountInUsd": 777.0,
        }))
        .unwrap();
        room.notify_swap(event).await.unwrap();
        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "swap");
        assert_eq!(frame["data"]["amountInUsd"], 777.0);

        state.registry.delete(room.code()).await.unwrap();
        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "room_closed");
        match ws.next().await.unwrap().unwrap() {
            ClientMessage::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1000),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_room_gets_error_frame_and_close_4004() {
        let (_state, addr) = serve_app().await;
        let mut ws = connect(addr, "ZZZZZZZZ").await;

        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["code"], 4004);
        match ws.next().await.unwrap().unwrap() {
            ClientMessage::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 4004),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_disconnect_updates_presence() {
        let (state, addr) = serve_app().await;
        let room = state.registry.create(None, None, None).await.unwrap();

        let mut first = connect(addr, room.code()).await;
        let frame = next_json(&mut first).await;
        assert_eq!(frame["count"], 1);

        let mut second = connect(addr, room.code()).await;
        let frame = next_json(&mut second).await;
        assert_eq!(frame["count"], 2);
        let frame = next_json(&mut first).await;
        assert_eq!(frame["count"], 2);

        second.close(None).await.unwrap();
        let frame = next_json(&mut first).await;
        assert_eq!(frame["type"], "presence");
        assert_eq!(frame["count"], 1);
        assert_eq!(room.presence().await.unwrap(), 1);
    }
}
