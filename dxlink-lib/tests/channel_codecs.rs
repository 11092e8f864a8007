//! Per-channel value layouts

mod common;

use common::*;

#[test]
fn test_battery_duality() {
    assert_eq!(BatteryStatus::decode(&[0x32]).unwrap().percent, 50);
    // 300 little-endian
    assert_eq!(BatteryStatus::decode(&[0x2C, 0x01]).unwrap().percent, 100);
    assert_eq!(BatteryStatus::decode(&[0xC8]).unwrap().percent, 100);
    assert_eq!(BatteryStatus::decode(&[]), None);
}

#[test]
fn test_battery_low_threshold() {
    assert!(BatteryStatus::decode(&[14]).unwrap().is_low());
    assert!(!BatteryStatus::decode(&[15]).unwrap().is_low());
}

#[test]
fn test_temperature_block() {
    let bytes = 37.25f32.to_be_bytes();
    assert_eq!(TemperatureBlock::decode(&bytes).unwrap().celsius, 37.25);
    assert_eq!(TemperatureBlock::decode(&bytes[..3]), None);
    assert_eq!(TemperatureBlock::decode(&f32::NAN.to_be_bytes()), None);
}

#[test]
fn test_heating_time() {
    let time = HeatingTime::decode(&[0x01, 0x1E]).unwrap();
    assert_eq!(time.0.total_minutes(), 90);
    assert_eq!(time.to_string(), "01:30");
    assert_eq!(HeatingTime::decode(&[0x01]), None);
}

#[test]
fn test_equipment_status_unknown_is_standby() {
    assert_eq!(EquipmentStatus::decode(&[2]), Some(EquipmentStatus::AnalysisError));
    assert_eq!(EquipmentStatus::decode(&[3]), Some(EquipmentStatus::AnalysisCompleted));
    assert_eq!(EquipmentStatus::decode(&[0x7F]), Some(EquipmentStatus::Standby));
}

#[test]
fn test_pre_test_status_phases() {
    let cases = [
        (0b000, PreTestPhase::Unknown),
        (0b001, PreTestPhase::InProgress),
        (0b010, PreTestPhase::Completed),
        (0b100, PreTestPhase::NotStarted),
        (0b011, PreTestPhase::Unknown),
        (0b1000_0100, PreTestPhase::NotStarted),
    ];
    for (byte, phase) in cases {
        assert_eq!(PreTestStatus::decode(&[byte]).unwrap().phase(), phase, "byte {byte:#010b}");
    }
}

#[test]
fn test_pre_test_failures() {
    let failures = PreTestFailures::decode(&[0b0101, 0b1000_0001]).unwrap();
    assert!(failures.battery_low);
    assert!(!failures.heating_failure);
    assert!(failures.lid_open);
    assert!(!failures.well_failure);
    assert_eq!(failures.failed_well_indices().collect::<Vec<_>>(), vec![0, 7]);
    assert_eq!(failures.to_bytes(), [0b0101, 0b1000_0001]);
    assert_eq!(PreTestFailures::decode(&[0x01]), None);
}

#[test]
fn test_config_encoding() {
    let config = TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric);
    assert_eq!(config.encode(), [0xC1, 0x0F]);

    let clamped = TestConfiguration::new(300.4, -2.0, DetectionMode::Colorimetric);
    assert_eq!(clamped.encode(), [0x7F, 0x00]);

    let rounded = TestConfiguration::new(36.6, 9.5, DetectionMode::Colorimetric);
    assert_eq!(rounded.encode(), [37, 10]);

    let nan = TestConfiguration::new(f64::NAN, f64::NAN, DetectionMode::Fluorimetric);
    assert_eq!(nan.encode(), [0x80, 0x00]);
}

#[test]
fn test_channels_are_distinct() {
    let mut characteristics: Vec<_> = channel::ALL_CHANNELS.iter().map(|c| c.characteristic).collect();
    characteristics.sort();
    characteristics.dedup();
    assert_eq!(characteristics.len(), channel::ALL_CHANNELS.len());
    assert_eq!(BatteryStatus::CHANNEL, channel::BATTERY_LEVEL);
}
