//! Subsystem attach functions and the configuration write

mod common;

use common::*;
use dxlink_lib::attach::{
    TelemetrySink, attach_all_monitors, attach_battery_monitors, attach_pretest_monitors,
    attach_temperature_monitors, write_test_configuration,
};
use dxlink_lib::config::PollIntervals;
use parking_lot::Mutex;
use std::time::Duration;

fn intervals() -> PollIntervals {
    PollIntervals::uniform(Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn test_temperature_failure_leaves_heating_monitor_running() {
    let mock = instrument_peer();
    mock.fail_describe(&channel::BLOCK_TEMPERATURE, PeerError::new("descriptor table corrupt"));
    let peer: Arc<dyn Peer> = Arc::new(mock.clone());
    let (on_message, messages) = recording_messages();
    let (on_temperature, temperatures) = recorder::<TemperatureBlock>();
    let (on_heating, heating) = recorder::<HeatingTime>();

    let subs = attach_temperature_monitors(&peer, &intervals(), on_message, on_temperature, on_heating).await;
    assert_eq!(subs.len(), 1);
    assert!(messages.lock().iter().any(|m| m.contains("block temperature")));

    // The one-shot read still went through
    assert_eq!(temperatures.lock().len(), 1);
    assert_eq!(temperatures.lock()[0].celsius, 64.5);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let polled = heating.lock().len();
    assert!(polled >= 3, "heating updates: {polled}");
    assert_eq!(heating.lock()[0], HeatingTime(TimeSpan::new(0, 12)));

    subs.stop();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let reads = mock.read_count();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(mock.read_count(), reads);
    assert_eq!(heating.lock().len(), polled);
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_still_returns_bundle() {
    let peer: Arc<dyn Peer> = Arc::new(MockPeer::new("empty"));
    let (on_message, messages) = recording_messages();
    let (on_status, statuses) = recorder::<PreTestStatus>();
    let (on_failures, _) = recorder::<PreTestFailures>();

    let subs = attach_pretest_monitors(&peer, &intervals(), on_message, on_status, on_failures).await;
    assert!(subs.is_empty());
    subs.stop();
    subs.stop();
    assert!(statuses.lock().is_empty());
    assert!(messages.lock().len() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_peer_attaches_nothing() {
    let mock = instrument_peer();
    mock.disconnect();
    let peer: Arc<dyn Peer> = Arc::new(mock.clone());
    let (on_battery, values) = recorder::<BatteryStatus>();

    let subs = attach_battery_monitors(&peer, &intervals(), Arc::new(|_: String| {}), on_battery).await;
    assert!(subs.is_empty());
    assert!(values.lock().is_empty());
    assert_eq!(mock.read_count(), 0);
}

#[derive(Default)]
struct Collected {
    battery: Mutex<Vec<BatteryStatus>>,
    equipment: Mutex<Vec<EquipmentStatus>>,
    pre_test: Mutex<Vec<PreTestStatus>>,
}

impl TelemetrySink for Collected {
    fn battery(&self, value: BatteryStatus) {
        self.battery.lock().push(value);
    }

    fn equipment_status(&self, value: EquipmentStatus) {
        self.equipment.lock().push(value);
    }

    fn pre_test_status(&self, value: PreTestStatus) {
        self.pre_test.lock().push(value);
    }
}

#[tokio::test(start_paused = true)]
async fn test_attach_all_routes_into_sink() {
    let peer: Arc<dyn Peer> = Arc::new(instrument_peer());
    let sink = Arc::new(Collected::default());

    let subs = attach_all_monitors(&peer, &intervals(), sink.clone()).await;
    assert_eq!(subs.len(), 6);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(sink.battery.lock()[0].percent, 80);
    assert_eq!(sink.equipment.lock()[0], EquipmentStatus::Analysis);
    assert_eq!(sink.pre_test.lock()[0].phase(), PreTestPhase::InProgress);
    subs.stop();
}

#[tokio::test]
async fn test_write_test_configuration() {
    let mock = instrument_peer();
    let (on_message, messages) = recording_messages();
    let config = TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric);

    assert!(write_test_configuration(&mock, &config, &on_message).await.unwrap());
    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, channel::TEST_CONFIGURATION);
    assert_eq!(writes[0].1.as_ref(), &[0xC1, 0x0F]);
    assert_eq!(TestConfiguration::decode(&writes[0].1), Some(config));

    mock.disconnect();
    assert!(!write_test_configuration(&mock, &config, &on_message).await.unwrap());
    assert!(messages.lock().is_empty());
}
