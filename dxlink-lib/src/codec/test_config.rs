//! Outbound test configuration.
//!
//! Byte 0: bit 7 = detection mode (0 colorimetric, 1 fluorimetric),
//! bits 0-6 = block temperature in °C. Byte 1: reaction time in minutes.
//! Out-of-range inputs are rounded and clamped, never rejected.

use bytes::Bytes;
use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::ChannelCommand;
use crate::channel::{self, Channel};
use crate::constants::MAX_CONFIG_TEMPERATURE_C;

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigHeader {
    temperature: B7,
    fluorimetric: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionMode {
    #[default]
    Colorimetric,
    Fluorimetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub temperature_celsius: f64,
    pub reaction_time_minutes: f64,
    pub detection: DetectionMode,
}

impl TestConfiguration {
    pub fn new(temperature_celsius: f64, reaction_time_minutes: f64, detection: DetectionMode) -> Self {
        Self {
            temperature_celsius,
            reaction_time_minutes,
            detection,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        let header = ConfigHeader::new()
            .with_temperature(round_clamped(self.temperature_celsius, MAX_CONFIG_TEMPERATURE_C))
            .with_fluorimetric(self.detection == DetectionMode::Fluorimetric);
        let [first] = header.into_bytes();
        [first, round_clamped(self.reaction_time_minutes, u8::MAX)]
    }

    /// Read back an encoded configuration, e.g. one captured by a mock peer.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let [first, minutes, ..] = bytes else {
            return None;
        };
        let header = ConfigHeader::from_bytes([*first]);
        let detection = if header.fluorimetric() {
            DetectionMode::Fluorimetric
        } else {
            DetectionMode::Colorimetric
        };
        Some(Self {
            temperature_celsius: f64::from(header.temperature()),
            reaction_time_minutes: f64::from(*minutes),
            detection,
        })
    }
}

impl ChannelCommand for TestConfiguration {
    const CHANNEL: Channel = channel::TEST_CONFIGURATION;

    fn to_payload(&self) -> Bytes {
        Bytes::copy_from_slice(&self.encode())
    }
}

/// Round to the nearest integer and clamp into `0..=max`; NaN maps to 0.
fn round_clamped(value: f64, max: u8) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(max)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fluorimetric() {
        let config = TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric);
        assert_eq!(config.encode(), [0xC1, 0x0F]);
    }

    #[test]
    fn test_encode_colorimetric() {
        let config = TestConfiguration::new(65.0, 15.0, DetectionMode::Colorimetric);
        assert_eq!(config.encode(), [0x41, 0x0F]);
    }

    #[test]
    fn test_encode_rounds_and_clamps() {
        assert_eq!(TestConfiguration::new(64.6, 14.4, DetectionMode::Colorimetric).encode(), [65, 14]);
        assert_eq!(TestConfiguration::new(200.0, 300.0, DetectionMode::Fluorimetric).encode(), [0xFF, 0xFF]);
        assert_eq!(TestConfiguration::new(-5.0, -1.0, DetectionMode::Fluorimetric).encode(), [0x80, 0x00]);
        assert_eq!(TestConfiguration::new(f64::NAN, f64::NAN, DetectionMode::Colorimetric).encode(), [0, 0]);
    }

    #[test]
    fn test_decode_written_payload() {
        let config = TestConfiguration::decode(&[0xC1, 0x0F]).unwrap();
        assert_eq!(config, TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric));
        assert_eq!(TestConfiguration::decode(&[0xC1]), None);
    }

    #[test]
    fn test_payload_matches_encode() {
        let config = TestConfiguration::new(37.0, 30.0, DetectionMode::Colorimetric);
        assert_eq!(config.to_payload().as_ref(), &config.encode());
    }
}
