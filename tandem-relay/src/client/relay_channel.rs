use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tandem_core::{RoomId, SignalMessage, SignalingError};
use tandem_peer::{SignalingChannel, SignalingSubscription};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`SignalingChannel`] backed by a relay server, one WebSocket per subscription.
#[derive(Debug, Clone)]
pub struct RelayChannel {
    base_url: String,
}

impl RelayChannel {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn room_url(&self, room: &RoomId) -> String {
        format!("{}{}", self.base_url, room.route())
    }
}

#[async_trait]
impl SignalingChannel for RelayChannel {
    async fn subscribe(
        &self,
        room: &RoomId,
    ) -> Result<Box<dyn SignalingSubscription>, SignalingError> {
        let url = self.room_url(room);
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SignalingError::Transport(format!("connect {}: {}", url, e)))?;

        info!("Connected to relay at {}", url);

        let (sink, stream) = socket.split();
        Ok(Box::new(RelaySubscription {
            room: room.clone(),
            sink: Mutex::new(sink),
            stream,
            closed: false,
        }))
    }
}

pub struct RelaySubscription {
    room: RoomId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: SplitStream<WsStream>,
    closed: bool,
}

#[async_trait]
impl SignalingSubscription for RelaySubscription {
    async fn publish(&self, msg: &SignalMessage) -> Result<(), SignalingError> {
        if self.closed {
            return Err(SignalingError::Closed);
        }

        let json = msg.to_json()?;
        self.sink
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;

        debug!("Published '{}' to relay room {}", msg.kind(), self.room);
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }

        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Relay connection for room {} failed: {}", self.room, e);
                    break;
                }
            }
        }
        None
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
        info!("Left relay room {}", self.room);
    }
}
