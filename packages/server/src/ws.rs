//! Websocket endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arscene_runtime::Registry;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{future, SinkExt, StreamExt};

use crate::connection::{Connection, ConnectionConfig, Frame};

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    config: ConnectionConfig,
    next_client: Arc<AtomicU64>,
}

/// A router serving the single long-lived client endpoint at `/`.
pub fn router(registry: Arc<Registry>, config: ConnectionConfig) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(AppState {
        registry,
        config,
        next_client: Arc::new(AtomicU64::new(0)),
    })
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let peer = format!("client-{}", state.next_client.fetch_add(1, Ordering::Relaxed));
    ws.on_upgrade(move |socket| serve_socket(socket, state, peer))
}

async fn serve_socket(socket: WebSocket, state: AppState, peer: String) {
    let (sink, stream) = socket.split();
    let inbound = stream.map(|message| message.map(Frame::from));
    let outbound =
        sink.with(|bytes: Vec<u8>| future::ready(Ok::<_, axum::Error>(Message::Binary(bytes))));

    Connection::new(state.registry, state.config, peer)
        .run(inbound, outbound)
        .await;
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Binary(bytes) => Frame::Binary(bytes),
            Message::Close(_) => Frame::Close,
            Message::Text(_) | Message::Ping(_) | Message::Pong(_) => Frame::Other,
        }
    }
}
