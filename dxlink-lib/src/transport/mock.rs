//! Loopback transport: every sent buffer comes back to the data listeners.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{Transport, TransportKind};
use crate::constants::MOCK_ECHO_DELAY;
use crate::error::{LinkError, Result};
use crate::listeners::{Listener, ListenerId, Listeners};

struct EchoWorker {
    tx: mpsc::UnboundedSender<Bytes>,
    task: JoinHandle<()>,
}

pub struct MockTransport {
    delay: Duration,
    listeners: Arc<Listeners<Bytes>>,
    worker: Mutex<Option<EchoWorker>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_delay(MOCK_ECHO_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            listeners: Arc::new(Listeners::new()),
            worker: Mutex::new(None),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Mock
    }

    async fn connect(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        let listeners = self.listeners.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            // Echoes keep send order
            while let Some(data) = rx.recv().await {
                tokio::time::sleep(delay).await;
                debug!(bytes = hex::encode(&data), "mock echo");
                listeners.emit(&data);
            }
        });

        *worker = Some(EchoWorker { tx, task });
        info!(?delay, "Mock transport connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(worker) = self.worker.lock().take() {
            worker.task.abort();
            info!("Mock transport disconnected");
        }
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        let worker = self.worker.lock();
        let worker = worker.as_ref().ok_or(LinkError::NotConnected)?;
        worker.tx.send(data).map_err(|_| LinkError::NotConnected)
    }

    fn on_data(&self, listener: Listener<Bytes>) -> ListenerId {
        self.listeners.insert(listener)
    }

    fn off_data(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn is_connected(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_echo_after_delay() {
        let transport = MockTransport::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        transport.on_data(Arc::new(move |data: &Bytes| {
            assert_eq!(data.as_ref(), &[1, 2, 3]);
            c.fetch_add(1, Ordering::SeqCst);
        }));

        transport.connect().await.unwrap();
        transport.send(Bytes::from_static(&[1, 2, 3])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let transport = MockTransport::new();
        let err = transport.send(Bytes::from_static(&[0])).await.unwrap_err();
        assert!(matches!(err, LinkError::NotConnected));

        transport.connect().await.unwrap();
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
        assert!(transport.send(Bytes::from_static(&[0])).await.is_err());
    }
}
