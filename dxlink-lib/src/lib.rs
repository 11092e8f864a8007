pub mod access;
pub mod attach;
pub mod bytes_util;
pub mod capabilities;
pub mod channel;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod listeners;
pub mod monitor;
pub mod peer;
pub mod service;
pub mod subscription;
pub mod transport;

// Re-export the types most callers need
pub use error::{LinkError, PeerError, Result};
pub use frame::StatusFrame;
pub use monitor::{MonitorHandle, PeriodicMonitor};
pub use peer::Peer;
pub use service::HardwareService;
pub use subscription::{Subscription, Subscriptions};
pub use transport::{Transport, TransportKind};
