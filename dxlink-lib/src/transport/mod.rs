//! Byte transports that carry composite status frames.
//!
//! A transport has an explicit lifecycle (`connect`, `disconnect`), owns its
//! data listeners and any background task it needs, and aborts that task on
//! disconnect and on drop.

pub mod mock;
#[cfg(feature = "websocket")]
pub mod network;
pub mod simulator;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::Display;

use crate::capabilities::Capabilities;
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::listeners::{Listener, ListenerId};

pub use mock::MockTransport;
#[cfg(feature = "websocket")]
pub use network::NetworkTransport;
pub use simulator::{SimulatorState, SimulatorTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    Mock,
    Network,
    Simulator,
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Resolves once the transport can send and receive.
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Fails with [`LinkError::NotConnected`] while disconnected.
    async fn send(&self, data: Bytes) -> Result<()>;

    fn on_data(&self, listener: Listener<Bytes>) -> ListenerId;

    fn off_data(&self, id: ListenerId) -> bool;

    fn is_connected(&self) -> bool;
}

/// Build an unconnected transport of `kind` from `config`.
pub fn build_transport(kind: TransportKind, config: &LinkConfig) -> Result<Arc<dyn Transport>> {
    if !Capabilities::detect().supports(kind) {
        return Err(LinkError::Transport(format!("{kind} transport is not available in this build")));
    }
    match kind {
        TransportKind::Mock => Ok(Arc::new(MockTransport::with_delay(config.mock_echo_delay()))),
        TransportKind::Simulator => Ok(Arc::new(SimulatorTransport::with_tick(config.simulator_tick()))),
        #[cfg(feature = "websocket")]
        TransportKind::Network => {
            let url = config
                .network_url
                .as_deref()
                .ok_or_else(|| LinkError::Config("network transport needs network_url".to_string()))?;
            Ok(Arc::new(NetworkTransport::new(url)))
        }
        #[cfg(not(feature = "websocket"))]
        TransportKind::Network => Err(LinkError::Transport("network transport is not available in this build".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(TransportKind::Simulator.to_string(), "simulator");
        assert_eq!(serde_json::to_string(&TransportKind::Network).unwrap(), "\"network\"");
    }

    #[test]
    fn test_network_without_url_is_config_error() {
        let result = build_transport(TransportKind::Network, &LinkConfig::default());
        assert!(matches!(result, Err(LinkError::Config(_)) | Err(LinkError::Transport(_))));
    }
}
