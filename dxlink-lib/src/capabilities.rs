//! Which optional transports this build can offer, resolved once per process.

use serde::Serialize;
use std::sync::OnceLock;

use crate::transport::TransportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub network_transport: bool,
    pub simulator_transport: bool,
    pub mock_transport: bool,
}

static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();

impl Capabilities {
    pub fn detect() -> &'static Capabilities {
        CAPABILITIES.get_or_init(|| Capabilities {
            network_transport: cfg!(feature = "websocket"),
            simulator_transport: true,
            mock_transport: true,
        })
    }

    pub fn supports(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Mock => self.mock_transport,
            TransportKind::Network => self.network_transport,
            TransportKind::Simulator => self.simulator_transport,
        }
    }

    pub fn available_transports(&self) -> Vec<TransportKind> {
        [TransportKind::Simulator, TransportKind::Network, TransportKind::Mock]
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }
}
