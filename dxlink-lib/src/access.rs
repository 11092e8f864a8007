//! Connection-aware read, write and notify primitives over a [`Peer`].
//!
//! Every primitive applies the same error policy:
//!
//! - not connected, or a failure carrying a link signature: absorbed. Reads
//!   yield `None`, writes yield `false`, monitors degrade to a no-op.
//! - anything else: reported through the message callback and returned.

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::codec::{ChannelCommand, ChannelValue};
use crate::error::{LinkError, Result};
use crate::peer::{NotifyFn, Peer};
use crate::subscription::Subscription;

/// Human-readable progress and error messages for the caller.
pub type MessageFn = Arc<dyn Fn(String) + Send + Sync>;

/// A message callback that discards everything.
pub fn silent() -> MessageFn {
    Arc::new(|_: String| {})
}

/// Whether the peer reports itself connected. Errors count as disconnected.
pub async fn check_connection(peer: &dyn Peer) -> bool {
    match peer.is_connected().await {
        Ok(connected) => connected,
        Err(e) => {
            debug!(peer = peer.id(), "connection check failed: {e}");
            false
        }
    }
}

#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Value(Bytes),
    NotConnected,
    LinkLost(LinkError),
    Failed(LinkError),
}

pub(crate) async fn read_outcome(peer: &dyn Peer, channel: &Channel) -> ReadOutcome {
    if !check_connection(peer).await {
        return ReadOutcome::NotConnected;
    }
    match peer.read(channel).await {
        Ok(bytes) => {
            debug!(channel = channel.name, bytes = hex::encode(&bytes), "read");
            ReadOutcome::Value(bytes)
        }
        Err(e) => {
            let err = LinkError::from(e);
            if err.is_link_error() {
                ReadOutcome::LinkLost(err)
            } else {
                ReadOutcome::Failed(err)
            }
        }
    }
}

/// Read the raw value of `channel`.
pub async fn read_channel(peer: &dyn Peer, channel: &Channel, on_message: &MessageFn) -> Result<Option<Bytes>> {
    match read_outcome(peer, channel).await {
        ReadOutcome::Value(bytes) => Ok(Some(bytes)),
        ReadOutcome::NotConnected => Ok(None),
        ReadOutcome::LinkLost(e) => {
            debug!(channel = channel.name, "read absorbed: {e}");
            Ok(None)
        }
        ReadOutcome::Failed(e) => {
            on_message(format!("Failed to read {}: {e}", channel.name));
            Err(e)
        }
    }
}

/// Read `T` from its channel. `None` also covers a payload too short to decode.
pub async fn read_decoded<T: ChannelValue>(peer: &dyn Peer, on_message: &MessageFn) -> Result<Option<T>> {
    let bytes = read_channel(peer, &T::CHANNEL, on_message).await?;
    Ok(bytes.and_then(|b| T::decode(&b)))
}

/// Write `value` to `channel`. `false` when the peer is unreachable.
pub async fn write_channel(peer: &dyn Peer, channel: &Channel, value: Bytes, on_message: &MessageFn) -> Result<bool> {
    if !check_connection(peer).await {
        return Ok(false);
    }
    debug!(channel = channel.name, bytes = hex::encode(&value), "write");
    match peer.write(channel, value).await {
        Ok(()) => Ok(true),
        Err(e) => {
            let err = LinkError::from(e);
            if err.is_link_error() {
                debug!(channel = channel.name, "write absorbed: {err}");
                Ok(false)
            } else {
                on_message(format!("Failed to write {}: {err}", channel.name));
                Err(err)
            }
        }
    }
}

pub async fn write_command<C: ChannelCommand>(peer: &dyn Peer, command: &C, on_message: &MessageFn) -> Result<bool> {
    write_channel(peer, &C::CHANNEL, command.to_payload(), on_message).await
}

/// Pre-flight gate: the peer exposes `channel` and, when `require_notify` is
/// set and the channel is push-capable, the peer will notify on it.
pub async fn channel_exists(peer: &dyn Peer, channel: &Channel, require_notify: bool) -> bool {
    if !check_connection(peer).await {
        return false;
    }
    match peer.describe(channel).await {
        Ok(Some(props)) => !(require_notify && channel.notify) || props.notifiable,
        Ok(None) => {
            debug!(channel = channel.name, "channel not exposed by peer");
            false
        }
        Err(e) => {
            warn!(channel = channel.name, "describe failed: {e}");
            false
        }
    }
}

/// Subscribe to push notifications on `channel`.
///
/// Returns a no-op subscription when the channel fails its pre-flight or the
/// peer refuses the subscription; callers cannot assume monitoring started.
pub async fn monitor_channel(
    peer: &Arc<dyn Peer>,
    channel: &Channel,
    on_data: NotifyFn,
    on_message: &MessageFn,
) -> Subscription {
    if !channel_exists(peer.as_ref(), channel, true).await {
        return Subscription::noop();
    }

    let active = Arc::new(AtomicBool::new(true));
    let gate = active.clone();
    let filtered: NotifyFn = Arc::new(move |bytes: Bytes| {
        if gate.load(Ordering::SeqCst) {
            on_data(bytes);
        }
    });

    match peer.subscribe(channel, filtered).await {
        Ok(inner) => {
            debug!(channel = channel.name, "push subscription started");
            Subscription::from_fn(move || {
                active.store(false, Ordering::SeqCst);
                inner.stop();
            })
        }
        Err(e) => {
            let err = LinkError::from(e);
            if !err.is_link_error() {
                on_message(format!("Failed to monitor {}: {err}", channel.name));
            }
            Subscription::noop()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{BATTERY_LEVEL, BLOCK_HEATING_TIME, TEST_CONFIGURATION};
    use crate::codec::{BatteryStatus, DetectionMode, TestConfiguration};
    use crate::error::PeerError;
    use crate::peer::MockPeer;
    use parking_lot::Mutex;

    fn collecting() -> (MessageFn, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        (Arc::new(move |m: String| sink.lock().push(m)), messages)
    }

    #[tokio::test]
    async fn test_read_absorbs_link_errors() {
        let peer = MockPeer::new("p").with_channel(BATTERY_LEVEL, vec![0x32]);
        let (on_message, messages) = collecting();

        peer.fail_reads(&BATTERY_LEVEL, PeerError::new("GATT error 133"));
        assert_eq!(read_channel(&peer, &BATTERY_LEVEL, &on_message).await.unwrap(), None);

        peer.clear_failures(&BATTERY_LEVEL);
        peer.disconnect();
        assert_eq!(read_channel(&peer, &BATTERY_LEVEL, &on_message).await.unwrap(), None);
        assert!(messages.lock().is_empty());
    }

    #[tokio::test]
    async fn test_read_reports_and_returns_unclassified_errors() {
        let peer = MockPeer::new("p").with_channel(BATTERY_LEVEL, vec![0x32]);
        let (on_message, messages) = collecting();
        peer.fail_reads(&BATTERY_LEVEL, PeerError::new("checksum mismatch"));

        let err = read_channel(&peer, &BATTERY_LEVEL, &on_message).await.unwrap_err();
        assert!(matches!(err, LinkError::Peer(_)));
        assert_eq!(messages.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_read_decoded_battery() {
        let peer = MockPeer::new("p").with_channel(BATTERY_LEVEL, vec![0x32]);
        let battery = read_decoded::<BatteryStatus>(&peer, &silent()).await.unwrap();
        assert_eq!(battery, Some(BatteryStatus::new(50)));
    }

    #[tokio::test]
    async fn test_write_command_and_disconnected_write() {
        let peer = MockPeer::new("p").with_channel(TEST_CONFIGURATION, vec![0, 0]);
        let config = TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric);

        assert!(write_command(&peer, &config, &silent()).await.unwrap());
        assert_eq!(peer.writes()[0].1.as_ref(), &[0xC1, 0x0F]);

        peer.disconnect();
        assert!(!write_command(&peer, &config, &silent()).await.unwrap());
    }

    #[tokio::test]
    async fn test_channel_exists_checks_notify_only_when_required() {
        let peer = MockPeer::new("p").with_channel(BLOCK_HEATING_TIME, vec![0, 0]);
        assert!(channel_exists(&peer, &BLOCK_HEATING_TIME, true).await);
        assert!(!channel_exists(&peer, &BATTERY_LEVEL, false).await);

        peer.fail_describe(&BLOCK_HEATING_TIME, PeerError::new("boom"));
        assert!(!channel_exists(&peer, &BLOCK_HEATING_TIME, false).await);
    }

    #[tokio::test]
    async fn test_monitor_channel_delivers_until_stopped() {
        let mock = MockPeer::new("p").with_channel(BATTERY_LEVEL, vec![0x40]);
        let peer: Arc<dyn Peer> = Arc::new(mock.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let sub = monitor_channel(&peer, &BATTERY_LEVEL, Arc::new(move |b: Bytes| sink.lock().push(b[0])), &silent()).await;
        assert!(!sub.is_noop());

        mock.notify(&BATTERY_LEVEL, vec![0x41]);
        sub.stop();
        sub.stop();
        mock.notify(&BATTERY_LEVEL, vec![0x42]);
        assert_eq!(*seen.lock(), vec![0x41]);
    }

    #[tokio::test]
    async fn test_monitor_missing_channel_is_noop() {
        let peer: Arc<dyn Peer> = Arc::new(MockPeer::new("p"));
        let sub = monitor_channel(&peer, &BATTERY_LEVEL, Arc::new(|_: Bytes| {}), &silent()).await;
        assert!(sub.is_noop());
        sub.stop();
    }
}
