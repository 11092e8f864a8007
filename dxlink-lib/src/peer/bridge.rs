//! Adapter for backends that exchange characteristic values as base64 text.
//!
//! Mobile BLE bridges address characteristics by UUID string and hand values
//! back base64-encoded. [`Base64Bridge`] turns such a backend into a [`Peer`].

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{ChannelProperties, NotifyFn, Peer};
use crate::bytes_util::{base64_to_bytes, bytes_to_base64};
use crate::channel::Channel;
use crate::error::PeerError;
use crate::subscription::Subscription;

pub type Base64Fn = Arc<dyn Fn(String) + Send + Sync>;

#[async_trait]
pub trait Base64Backend: Send + Sync {
    fn id(&self) -> &str;

    async fn is_connected(&self) -> Result<bool, PeerError>;

    /// `None` when the characteristic holds no value yet.
    async fn read_base64(&self, service: &str, characteristic: &str) -> Result<Option<String>, PeerError>;

    async fn write_base64(&self, service: &str, characteristic: &str, value: String) -> Result<(), PeerError>;

    async fn characteristic_properties(
        &self,
        service: &str,
        characteristic: &str,
    ) -> Result<Option<ChannelProperties>, PeerError>;

    async fn monitor_base64(
        &self,
        service: &str,
        characteristic: &str,
        on_value: Base64Fn,
    ) -> Result<Subscription, PeerError>;

    fn connection_state(&self) -> Result<watch::Receiver<bool>, PeerError>;

    /// Most mobile stacks drop overlapping GATT operations.
    fn concurrent_io(&self) -> bool {
        false
    }
}

pub struct Base64Bridge<B> {
    backend: B,
}

impl<B: Base64Backend> Base64Bridge<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn uuids(channel: &Channel) -> (String, String) {
    (
        channel.service.hyphenated().to_string(),
        channel.characteristic.hyphenated().to_string(),
    )
}

fn decode_value(channel: &Channel, encoded: &str) -> Result<Bytes, PeerError> {
    base64_to_bytes(encoded).map_err(|e| PeerError::new(format!("{}: malformed base64 value: {e}", channel.name)))
}

#[async_trait]
impl<B: Base64Backend> Peer for Base64Bridge<B> {
    fn id(&self) -> &str {
        self.backend.id()
    }

    async fn is_connected(&self) -> Result<bool, PeerError> {
        self.backend.is_connected().await
    }

    async fn read(&self, channel: &Channel) -> Result<Bytes, PeerError> {
        let (service, characteristic) = uuids(channel);
        match self.backend.read_base64(&service, &characteristic).await? {
            Some(encoded) => decode_value(channel, &encoded),
            None => Ok(Bytes::new()),
        }
    }

    async fn write(&self, channel: &Channel, value: Bytes) -> Result<(), PeerError> {
        let (service, characteristic) = uuids(channel);
        self.backend
            .write_base64(&service, &characteristic, bytes_to_base64(&value))
            .await
    }

    async fn describe(&self, channel: &Channel) -> Result<Option<ChannelProperties>, PeerError> {
        let (service, characteristic) = uuids(channel);
        self.backend.characteristic_properties(&service, &characteristic).await
    }

    async fn subscribe(&self, channel: &Channel, on_data: NotifyFn) -> Result<Subscription, PeerError> {
        let (service, characteristic) = uuids(channel);
        let channel = *channel;
        let on_value: Base64Fn = Arc::new(move |encoded: String| match decode_value(&channel, &encoded) {
            Ok(bytes) => {
                debug!(channel = channel.name, bytes = hex::encode(&bytes), "notification");
                on_data(bytes)
            }
            Err(e) => warn!("Dropping notification: {e}"),
        });
        self.backend.monitor_base64(&service, &characteristic, on_value).await
    }

    fn connection_state(&self) -> Result<watch::Receiver<bool>, PeerError> {
        self.backend.connection_state()
    }

    fn concurrent_io(&self) -> bool {
        self.backend.concurrent_io()
    }
}
