//! Per-subsystem monitor composition.
//!
//! Each `attach_*` function gives the caller an immediate value through a
//! one-shot read, then starts one [`PeriodicMonitor`] per channel. Channels
//! are attached independently: one that fails its pre-flight or refuses to
//! start is reported and skipped, and the returned [`Subscriptions`] bundle
//! still stops whatever did start.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::access::{MessageFn, channel_exists, read_decoded, write_command};
use crate::codec::{
    BatteryStatus, ChannelValue, EquipmentStatus, HeatingTime, PreTestFailures, PreTestStatus, TemperatureBlock,
    TestConfiguration,
};
use crate::config::PollIntervals;
use crate::error::Result;
use crate::monitor::PeriodicMonitor;
use crate::peer::Peer;
use crate::subscription::{Subscription, Subscriptions};

type UpdateFn<T> = Arc<dyn Fn(T) + Send + Sync>;

async fn attach_channel<T: ChannelValue>(
    peer: &Arc<dyn Peer>,
    period: Duration,
    on_update: UpdateFn<T>,
    on_message: &MessageFn,
) -> Subscription {
    let channel = T::CHANNEL;

    // Unclassified failures were already reported by the read itself
    if let Ok(Some(value)) = read_decoded::<T>(peer.as_ref(), on_message).await {
        on_update(value);
    }

    if !channel_exists(peer.as_ref(), &channel, false).await {
        warn!(channel = channel.name, "channel unavailable, not monitoring");
        on_message(format!("{} is unavailable; monitoring skipped", channel.name));
        return Subscription::noop();
    }

    let update = on_update.clone();
    match PeriodicMonitor::start::<T, _>(peer.clone(), period, move |v| update(v), on_message.clone()) {
        Ok(handle) => handle.into(),
        Err(e) => {
            warn!(channel = channel.name, "monitor failed to start: {e}");
            on_message(format!("Failed to start {} monitor: {e}", channel.name));
            Subscription::noop()
        }
    }
}

pub async fn attach_battery_monitors<F>(
    peer: &Arc<dyn Peer>,
    intervals: &PollIntervals,
    on_message: MessageFn,
    on_battery: F,
) -> Subscriptions
where
    F: Fn(BatteryStatus) + Send + Sync + 'static,
{
    let mut subs = Subscriptions::new();
    subs.push(attach_channel::<BatteryStatus>(peer, intervals.battery(), Arc::new(on_battery), &on_message).await);
    subs
}

/// Block temperature and accumulated heating time.
pub async fn attach_temperature_monitors<F, G>(
    peer: &Arc<dyn Peer>,
    intervals: &PollIntervals,
    on_message: MessageFn,
    on_temperature: F,
    on_heating_time: G,
) -> Subscriptions
where
    F: Fn(TemperatureBlock) + Send + Sync + 'static,
    G: Fn(HeatingTime) + Send + Sync + 'static,
{
    let mut subs = Subscriptions::new();
    subs.push(
        attach_channel::<TemperatureBlock>(peer, intervals.temperature(), Arc::new(on_temperature), &on_message).await,
    );
    subs.push(
        attach_channel::<HeatingTime>(peer, intervals.heating_time(), Arc::new(on_heating_time), &on_message).await,
    );
    subs
}

pub async fn attach_equipment_status_monitors<F>(
    peer: &Arc<dyn Peer>,
    intervals: &PollIntervals,
    on_message: MessageFn,
    on_status: F,
) -> Subscriptions
where
    F: Fn(EquipmentStatus) + Send + Sync + 'static,
{
    let mut subs = Subscriptions::new();
    subs.push(attach_channel::<EquipmentStatus>(peer, intervals.equipment(), Arc::new(on_status), &on_message).await);
    subs
}

/// Pre-test progress and the failure report.
pub async fn attach_pretest_monitors<F, G>(
    peer: &Arc<dyn Peer>,
    intervals: &PollIntervals,
    on_message: MessageFn,
    on_status: F,
    on_failures: G,
) -> Subscriptions
where
    F: Fn(PreTestStatus) + Send + Sync + 'static,
    G: Fn(PreTestFailures) + Send + Sync + 'static,
{
    let mut subs = Subscriptions::new();
    subs.push(attach_channel::<PreTestStatus>(peer, intervals.pretest(), Arc::new(on_status), &on_message).await);
    subs.push(attach_channel::<PreTestFailures>(peer, intervals.pretest(), Arc::new(on_failures), &on_message).await);
    subs
}

/// Send a test configuration. `Ok(false)` when the peer is unreachable.
pub async fn write_test_configuration(
    peer: &dyn Peer,
    config: &TestConfiguration,
    on_message: &MessageFn,
) -> Result<bool> {
    info!(
        peer = peer.id(),
        temperature = config.temperature_celsius,
        minutes = config.reaction_time_minutes,
        detection = %config.detection,
        "writing test configuration"
    );
    write_command(peer, config, on_message).await
}

/// Receiver for every decoded telemetry value. All methods default to no-ops.
pub trait TelemetrySink: Send + Sync + 'static {
    fn battery(&self, _value: BatteryStatus) {}
    fn block_temperature(&self, _value: TemperatureBlock) {}
    fn heating_time(&self, _value: HeatingTime) {}
    fn equipment_status(&self, _value: EquipmentStatus) {}
    fn pre_test_status(&self, _value: PreTestStatus) {}
    fn pre_test_failures(&self, _value: PreTestFailures) {}
    fn message(&self, _text: String) {}
}

/// Attach every subsystem, routing values into `sink`.
pub async fn attach_all_monitors(
    peer: &Arc<dyn Peer>,
    intervals: &PollIntervals,
    sink: Arc<dyn TelemetrySink>,
) -> Subscriptions {
    let s = sink.clone();
    let on_message: MessageFn = Arc::new(move |text: String| s.message(text));
    let mut all = Subscriptions::new();

    let s = sink.clone();
    all.extend(attach_battery_monitors(peer, intervals, on_message.clone(), move |v| s.battery(v)).await);

    let (s1, s2) = (sink.clone(), sink.clone());
    all.extend(
        attach_temperature_monitors(
            peer,
            intervals,
            on_message.clone(),
            move |v| s1.block_temperature(v),
            move |v| s2.heating_time(v),
        )
        .await,
    );

    let s = sink.clone();
    all.extend(attach_equipment_status_monitors(peer, intervals, on_message.clone(), move |v| s.equipment_status(v)).await);

    let (s1, s2) = (sink.clone(), sink);
    all.extend(
        attach_pretest_monitors(
            peer,
            intervals,
            on_message,
            move |v| s1.pre_test_status(v),
            move |v| s2.pre_test_failures(v),
        )
        .await,
    );

    info!(peer = peer.id(), monitors = all.len(), "telemetry attached");
    all
}
