//! Composite status fan-out over one active transport.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};
use crate::frame::StatusFrame;
use crate::listeners::{Listener, ListenerId, Listeners};
use crate::transport::{Transport, TransportKind};

#[derive(Default)]
struct ServiceShared {
    last_status: Mutex<Option<StatusFrame>>,
    status: Listeners<StatusFrame>,
    parse_errors: Listeners<LinkError>,
}

impl ServiceShared {
    fn handle_data(&self, data: &Bytes) {
        match StatusFrame::parse(data) {
            Ok(frame) => {
                // Same lock as `on_status` registration
                let recipients = {
                    let mut last = self.last_status.lock();
                    *last = Some(frame);
                    self.status.snapshot()
                };
                for listener in &recipients {
                    listener(&frame);
                }
                debug!(listeners = recipients.len(), "status: {frame}");
            }
            Err(e) => {
                warn!(bytes = hex::encode(data), "Dropping unparseable frame: {e}");
                self.parse_errors.emit(&e);
            }
        }
    }
}

struct ActiveTransport {
    transport: Arc<dyn Transport>,
    data_listener: ListenerId,
}

/// Owns at most one transport and fans decoded status frames out to listeners.
///
/// Switching transports is explicit: `disconnect` first, then `connect` the
/// new one. Listeners survive reconnects.
pub struct HardwareService {
    shared: Arc<ServiceShared>,
    active: tokio::sync::Mutex<Option<ActiveTransport>>,
}

impl HardwareService {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ServiceShared::default()),
            active: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(LinkError::AlreadyConnected);
        }

        let shared = self.shared.clone();
        let data_listener = transport.on_data(Arc::new(move |data: &Bytes| shared.handle_data(data)));
        if let Err(e) = transport.connect().await {
            transport.off_data(data_listener);
            return Err(e);
        }

        info!(kind = %transport.kind(), "Hardware service connected");
        *active = Some(ActiveTransport {
            transport,
            data_listener,
        });
        Ok(())
    }

    /// Disconnect the active transport. On failure the transport stays
    /// active, so the call can be retried.
    pub async fn disconnect(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let Some(current) = active.take() else {
            return Ok(());
        };
        if let Err(e) = current.transport.disconnect().await {
            warn!(kind = %current.transport.kind(), "Transport disconnect failed: {e}");
            *active = Some(current);
            return Err(e);
        }
        current.transport.off_data(current.data_listener);
        info!(kind = %current.transport.kind(), "Hardware service disconnected");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| active.transport.is_connected())
    }

    pub async fn transport_kind(&self) -> Option<TransportKind> {
        self.active.lock().await.as_ref().map(|active| active.transport.kind())
    }

    /// Serialize `status` and send it over the active transport.
    pub async fn send_status(&self, status: &StatusFrame) -> Result<()> {
        let bytes = status.serialize()?;
        let transport = self
            .active
            .lock()
            .await
            .as_ref()
            .map(|active| active.transport.clone())
            .ok_or(LinkError::NotConnected)?;
        transport.send(Bytes::copy_from_slice(&bytes)).await
    }

    /// Register a status listener. The most recent status, if any, is
    /// delivered to it immediately.
    ///
    /// No frame is lost to a listener registered while frames arrive, but a
    /// frame parsed on another thread may reach it before the replay does.
    pub fn on_status<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StatusFrame) + Send + Sync + 'static,
    {
        let listener: Listener<StatusFrame> = Arc::new(listener);
        let (id, cached) = {
            let last = self.shared.last_status.lock();
            (self.shared.status.insert(listener.clone()), *last)
        };
        if let Some(status) = cached {
            listener(&status);
        }
        id
    }

    pub fn off_status(&self, id: ListenerId) -> bool {
        self.shared.status.unsubscribe(id)
    }

    pub fn last_status(&self) -> Option<StatusFrame> {
        *self.shared.last_status.lock()
    }

    /// Observe frames that failed to parse. They never reach status listeners.
    pub fn on_parse_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LinkError) + Send + Sync + 'static,
    {
        self.shared.parse_errors.subscribe(listener)
    }

    pub fn off_parse_error(&self, id: ListenerId) -> bool {
        self.shared.parse_errors.unsubscribe(id)
    }

    /// Disconnect and forget every listener and the cached status.
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.disconnect().await;
        self.shared.status.clear();
        self.shared.parse_errors.clear();
        *self.shared.last_status.lock() = None;
        result
    }
}

impl Default for HardwareService {
    fn default() -> Self {
        Self::new()
    }
}
