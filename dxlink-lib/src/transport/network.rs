//! WebSocket transport to a network-simulated instrument.
//!
//! Frames travel as binary messages in both directions. Text messages are
//! logged and ignored.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::{Transport, TransportKind};
use crate::error::{LinkError, Result};
use crate::listeners::{Listener, ListenerId, Listeners};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

pub struct NetworkTransport {
    url: String,
    listeners: Arc<Listeners<Bytes>>,
    connected: Arc<AtomicBool>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Add a `ws://` scheme to a bare `host:port`.
fn normalize_url(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("ws://") || address.starts_with("wss://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

impl NetworkTransport {
    pub fn new(address: &str) -> Self {
        Self {
            url: normalize_url(address),
            listeners: Arc::new(Listeners::new()),
            connected: Arc::new(AtomicBool::new(false)),
            sink: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, listeners: Arc<Listeners<Bytes>>, connected: Arc<AtomicBool>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                debug!(bytes = hex::encode(&data), "network frame");
                listeners.emit(&Bytes::from(data));
            }
            Ok(Message::Text(text)) => debug!("Ignoring text message: {text}"),
            Ok(Message::Close(frame)) => {
                info!("Peer closed the connection: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket read failed: {e}");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

#[async_trait]
impl Transport for NetworkTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Network
    }

    async fn connect(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        if sink.is_some() && self.is_connected() {
            return Ok(());
        }

        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| LinkError::Transport(format!("failed to open {}: {e}", self.url)))?;
        let (write, read) = stream.split();

        self.connected.store(true, Ordering::SeqCst);
        let reader = tokio::spawn(read_loop(read, self.listeners.clone(), self.connected.clone()));
        if let Some(old) = self.reader.lock().replace(reader) {
            old.abort();
        }
        *sink = Some(write);

        info!("Network transport connected to {}", self.url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("Close handshake failed: {e}");
            }
            info!("Network transport disconnected from {}", self.url);
        }
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(LinkError::NotConnected)?;
        debug!(bytes = hex::encode(&data), "network send");
        sink.send(Message::Binary(data.to_vec()))
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))
    }

    fn on_data(&self, listener: Listener<Bytes>) -> ListenerId {
        self.listeners.insert(listener)
    }

    fn off_data(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for NetworkTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}
