//! Interval polling of one channel with automatic shutdown on disconnect.
//!
//! A monitor is *running* until it stops, and stopping is one-way. It stops
//! when asked to, when the peer disconnects, or when a read fails with a link
//! error. Other read failures are reported and polling continues.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strum_macros::Display;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::access::{MessageFn, ReadOutcome, read_outcome};
use crate::channel::Channel;
use crate::codec::ChannelValue;
use crate::error::{LinkError, Result};
use crate::peer::Peer;
use crate::subscription::{Stop, Subscription};

/// Why a monitor reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    Requested,
    Disconnected,
    LinkError,
}

struct MonitorState {
    channel: Channel,
    running: AtomicBool,
    reason: watch::Sender<Option<StopReason>>,
    on_message: MessageFn,
}

impl MonitorState {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Transition to stopped. Only the first caller reports.
    fn halt(&self, reason: StopReason) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.reason.send_replace(Some(reason));
        info!(channel = self.channel.name, %reason, "monitor stopped");
        (self.on_message)(format!("{} monitor stopped ({reason})", self.channel.name));
        true
    }
}

/// Handle to a running (or finished) periodic monitor. Clones share state.
#[derive(Clone)]
pub struct MonitorHandle {
    state: Arc<MonitorState>,
}

impl MonitorHandle {
    /// Stop polling. Safe to call any number of times, including after the
    /// monitor already stopped itself.
    pub fn stop(&self) {
        self.state.halt(StopReason::Requested);
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn channel(&self) -> &Channel {
        &self.state.channel
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        *self.state.reason.borrow()
    }

    /// Wait until the monitor has stopped.
    pub async fn stopped(&self) -> StopReason {
        let mut rx = self.state.reason.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return StopReason::Requested;
            }
        }
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("channel", &self.state.channel.name)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Stop for MonitorHandle {
    fn stop(&self) {
        MonitorHandle::stop(self)
    }
}

impl From<MonitorHandle> for Subscription {
    fn from(handle: MonitorHandle) -> Self {
        Subscription::new(handle)
    }
}

pub struct PeriodicMonitor;

impl PeriodicMonitor {
    /// Start polling `T`'s channel every `period`.
    ///
    /// The first read happens immediately. Fails only when the peer cannot
    /// provide a connection-state watch.
    pub fn start<T, F>(peer: Arc<dyn Peer>, period: Duration, on_update: F, on_message: MessageFn) -> Result<MonitorHandle>
    where
        T: ChannelValue,
        F: Fn(T) + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(LinkError::Config(format!("{} poll interval must be non-zero", T::CHANNEL.name)));
        }
        let mut connection = peer.connection_state()?;

        let state = Arc::new(MonitorState {
            channel: T::CHANNEL,
            running: AtomicBool::new(true),
            reason: watch::channel(None).0,
            on_message,
        });
        let handle = MonitorHandle { state: state.clone() };
        let mut stop_rx = state.reason.subscribe();

        info!(channel = state.channel.name, peer = peer.id(), ?period, "monitor started");

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut first = true;

            while state.is_running() {
                let step = async {
                    if !std::mem::take(&mut first) {
                        ticker.tick().await;
                    }
                    read_outcome(peer.as_ref(), &state.channel).await
                };

                let outcome = tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|r| r.is_some()) => break,
                    _ = connection.wait_for(|connected| !*connected) => {
                        state.halt(StopReason::Disconnected);
                        break;
                    }
                    outcome = step => outcome,
                };

                // A stop may have landed while the read was completing
                if !state.is_running() {
                    break;
                }

                match outcome {
                    ReadOutcome::Value(bytes) => match T::decode(&bytes) {
                        Some(value) => on_update(value),
                        None => debug!(channel = state.channel.name, len = bytes.len(), "undecodable payload"),
                    },
                    ReadOutcome::NotConnected => {
                        state.halt(StopReason::Disconnected);
                    }
                    ReadOutcome::LinkLost(e) => {
                        debug!(channel = state.channel.name, "link error: {e}");
                        state.halt(StopReason::LinkError);
                    }
                    ReadOutcome::Failed(e) => {
                        warn!(channel = state.channel.name, "read failed: {e}");
                        (state.on_message)(format!("Failed to read {}: {e}", state.channel.name));
                    }
                }
            }
        });

        Ok(handle)
    }
}
