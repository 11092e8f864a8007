//! Common test utilities and shared imports

// Shared across test files; not every item is used by every file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use dxlink_lib::access::MessageFn;
#[allow(unused_imports)]
pub use dxlink_lib::channel;
#[allow(unused_imports)]
pub use dxlink_lib::codec::{
    BatteryStatus, ChannelValue, DetectionMode, EquipmentStatus, HeatingTime, PreTestFailures, PreTestPhase,
    PreTestStatus, TemperatureBlock, TestConfiguration, TimeSpan,
};
#[allow(unused_imports)]
pub use dxlink_lib::error::{LinkError, PeerError};
#[allow(unused_imports)]
pub use dxlink_lib::frame::{EquipmentMode, PreTestProgress, StatusFrame, TestType};
#[allow(unused_imports)]
pub use dxlink_lib::peer::{MockPeer, Peer};
#[allow(unused_imports)]
pub use std::sync::Arc;

use parking_lot::Mutex;

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("Failed to decode hex"))
}

/// Message callback that records every message it receives
#[allow(dead_code)]
pub fn recording_messages() -> (MessageFn, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    (Arc::new(move |m: String| sink.lock().push(m)), messages)
}

/// Collect values handed to an update callback
#[allow(dead_code)]
pub fn recorder<T: Send + 'static>() -> (impl Fn(T) + Send + Sync + 'static, Arc<Mutex<Vec<T>>>) {
    let values = Arc::new(Mutex::new(Vec::new()));
    let sink = values.clone();
    (move |v: T| sink.lock().push(v), values)
}

/// A mock peer exposing every channel with plausible values
#[allow(dead_code)]
pub fn instrument_peer() -> MockPeer {
    MockPeer::new("bench-analyzer")
        .with_channel(channel::BATTERY_LEVEL, vec![0x50])
        .with_channel(channel::BLOCK_TEMPERATURE, TemperatureBlock { celsius: 64.5 }.to_bytes().to_vec())
        .with_channel(channel::BLOCK_HEATING_TIME, vec![0x00, 0x0C])
        .with_channel(channel::EQUIPMENT_STATUS, vec![0x01])
        .with_channel(channel::PRE_TEST_STATUS, vec![0b001])
        .with_channel(channel::PRE_TEST_FAILURE, vec![0x00, 0x00])
        .with_channel(channel::TEST_CONFIGURATION, vec![0x00, 0x00])
}

/// Route library logs to the test harness output; safe to call repeatedly
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
