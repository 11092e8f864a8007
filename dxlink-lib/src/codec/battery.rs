//! Battery level channel.
//!
//! Firmware builds disagree on the layout: most send a single percentage
//! byte, some send a little-endian 16-bit word. A payload of two or more
//! bytes with a non-zero second byte is read as the 16-bit form; anything
//! else is the first byte alone. Both paths clamp to 0..=100. This heuristic
//! is provisional and lives only here.

use bytes::Buf;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ChannelValue;
use crate::channel::{self, Channel};
use crate::constants::{LOW_BATTERY_PERCENT, MAX_BATTERY_PERCENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub percent: u8,
}

impl BatteryStatus {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(MAX_BATTERY_PERCENT),
        }
    }

    pub fn is_low(&self) -> bool {
        self.percent < LOW_BATTERY_PERCENT
    }
}

impl ChannelValue for BatteryStatus {
    const CHANNEL: Channel = channel::BATTERY_LEVEL;
    const MIN_LEN: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let first = *bytes.first()?;
        let raw = match bytes.get(1) {
            Some(&high) if high != 0 => {
                let mut buf = bytes;
                buf.get_u16_le()
            }
            _ => u16::from(first),
        };
        let percent = raw.min(u16::from(MAX_BATTERY_PERCENT)) as u8;
        Some(Self { percent })
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_percentage() {
        assert_eq!(BatteryStatus::decode(&[0x32]), Some(BatteryStatus { percent: 50 }));
        assert_eq!(BatteryStatus::decode(&[0x00]), Some(BatteryStatus { percent: 0 }));
        assert_eq!(BatteryStatus::decode(&[100]), Some(BatteryStatus { percent: 100 }));
    }

    #[test]
    fn test_zero_high_byte_reads_as_percentage() {
        assert_eq!(BatteryStatus::decode(&[0x32, 0x00]), Some(BatteryStatus { percent: 50 }));
        assert_eq!(BatteryStatus::decode(&[0x50, 0x00, 0xFF]), Some(BatteryStatus { percent: 80 }));
    }

    #[test]
    fn test_non_zero_high_byte_reads_as_word() {
        // 0x0132 = 306, even though the low byte alone looks like 50%
        assert_eq!(BatteryStatus::decode(&[0x32, 0x01]), Some(BatteryStatus { percent: 100 }));
    }

    #[test]
    fn test_little_endian_word_is_clamped() {
        // 300 = 0x012C
        assert_eq!(BatteryStatus::decode(&[0x2C, 0x01]), Some(BatteryStatus { percent: 100 }));
    }

    #[test]
    fn test_single_byte_above_hundred_is_clamped() {
        assert_eq!(BatteryStatus::decode(&[0xC8]), Some(BatteryStatus { percent: 100 }));
    }

    #[test]
    fn test_empty_payload_has_no_value() {
        assert_eq!(BatteryStatus::decode(&[]), None);
    }

    #[test]
    fn test_low_battery() {
        assert!(BatteryStatus::new(10).is_low());
        assert!(!BatteryStatus::new(15).is_low());
        assert_eq!(BatteryStatus::new(180).percent, 100);
    }
}
