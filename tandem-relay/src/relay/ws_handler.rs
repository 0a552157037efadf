use crate::relay::{RelayConfig, RelayService};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tandem_core::{RoomId, SignalMessage};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Router with the `/room/{room_id}` WebSocket route.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/room/{room_id}", get(ws_handler))
        .with_state(service)
}

/// Bind `config.bind_addr` and relay until the process stops.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    serve_on(listener, RelayService::new()).await
}

pub async fn serve_on(listener: TcpListener, service: RelayService) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Signaling relay listening on ws://{}/room/{{roomId}}", addr);

    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let room = RoomId::from(room_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room, service))
}

async fn handle_socket(socket: WebSocket, room: RoomId, service: RelayService) {
    let peer_id = Uuid::new_v4();
    info!("Peer {} joined room {}", peer_id, room);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(room.clone(), peer_id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let room = room.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        // Only for the log: the payload is relayed untouched either way.
                        match SignalMessage::from_json(text.as_str()) {
                            Ok(signal) => tracing::debug!(
                                "Peer {} sent '{}' in room {}",
                                peer_id,
                                signal.kind(),
                                room
                            ),
                            Err(e) => warn!("Peer {} sent unparsable message: {}", peer_id, e),
                        }
                        service.forward(&room, peer_id, text);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&room, peer_id);
    info!("Peer {} left room {}", peer_id, room);
}
