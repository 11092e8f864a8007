//! The connected instrument as seen by the protocol layer.
//!
//! [`Peer`] is deliberately narrow: per-channel read, write, describe and
//! push-subscribe, plus a connection-state watch. Concrete backends (a mobile
//! BLE bridge, a desktop BLE stack, the in-memory mock) adapt to it.

pub mod bridge;
pub mod mock;
pub mod serialized;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;

use crate::channel::Channel;
use crate::error::PeerError;
use crate::subscription::Subscription;

pub use bridge::{Base64Backend, Base64Bridge};
pub use mock::MockPeer;
pub use serialized::{SerializedPeer, shared_peer};

/// Callback for values pushed by the peer.
pub type NotifyFn = Arc<dyn Fn(Bytes) + Send + Sync>;

/// What a channel supports on this particular peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelProperties {
    pub readable: bool,
    pub writable: bool,
    pub notifiable: bool,
}

impl ChannelProperties {
    pub fn all() -> Self {
        Self {
            readable: true,
            writable: true,
            notifiable: true,
        }
    }
}

#[async_trait]
pub trait Peer: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    async fn is_connected(&self) -> Result<bool, PeerError>;

    async fn read(&self, channel: &Channel) -> Result<Bytes, PeerError>;

    async fn write(&self, channel: &Channel, value: Bytes) -> Result<(), PeerError>;

    /// `None` when the peer does not expose the channel.
    async fn describe(&self, channel: &Channel) -> Result<Option<ChannelProperties>, PeerError>;

    /// Start push notifications; the returned subscription ends them.
    async fn subscribe(&self, channel: &Channel, on_data: NotifyFn) -> Result<Subscription, PeerError>;

    /// Connection state; flips to `false` when the peer disconnects.
    fn connection_state(&self) -> Result<watch::Receiver<bool>, PeerError>;

    /// Whether reads and writes may be issued concurrently.
    fn concurrent_io(&self) -> bool {
        true
    }
}
