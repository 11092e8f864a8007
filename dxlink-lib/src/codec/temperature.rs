use bytes::Buf;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ChannelValue, TimeSpan};
use crate::channel::{self, Channel};

/// Heating block temperature, a big-endian IEEE-754 `f32` in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBlock {
    pub celsius: f32,
}

impl TemperatureBlock {
    pub fn to_bytes(self) -> [u8; 4] {
        self.celsius.to_be_bytes()
    }
}

impl ChannelValue for TemperatureBlock {
    const CHANNEL: Channel = channel::BLOCK_TEMPERATURE;
    const MIN_LEN: usize = 4;

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_LEN {
            return None;
        }
        let mut buf = bytes;
        let celsius = buf.get_f32();
        // NaN or infinity means the sensor is not reporting
        celsius.is_finite().then_some(Self { celsius })
    }
}

impl fmt::Display for TemperatureBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} °C", self.celsius)
    }
}

/// Time the block has spent heating, (hours, minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeatingTime(pub TimeSpan);

impl ChannelValue for HeatingTime {
    const CHANNEL: Channel = channel::BLOCK_HEATING_TIME;
    const MIN_LEN: usize = 2;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [hours, minutes, ..] => Some(Self(TimeSpan::new(*hours, *minutes))),
            _ => None,
        }
    }
}

impl fmt::Display for HeatingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_big_endian_float() {
        // 65.5 = 0x42830000
        let block = TemperatureBlock::decode(&[0x42, 0x83, 0x00, 0x00]).unwrap();
        assert_eq!(block.celsius, 65.5);
        assert_eq!(block.to_bytes(), [0x42, 0x83, 0x00, 0x00]);
    }

    #[test]
    fn test_temperature_negative() {
        let block = TemperatureBlock::decode(&(-4.25f32).to_be_bytes()).unwrap();
        assert_eq!(block.celsius, -4.25);
    }

    #[test]
    fn test_temperature_short_payload() {
        assert_eq!(TemperatureBlock::decode(&[0x42, 0x83, 0x00]), None);
        assert_eq!(TemperatureBlock::decode(&[]), None);
    }

    #[test]
    fn test_temperature_nan_has_no_value() {
        assert_eq!(TemperatureBlock::decode(&[0x7F, 0xC0, 0x00, 0x00]), None);
    }

    #[test]
    fn test_heating_time() {
        assert_eq!(HeatingTime::decode(&[1, 30]), Some(HeatingTime(TimeSpan::new(1, 30))));
        assert_eq!(HeatingTime::decode(&[255, 255]), Some(HeatingTime(TimeSpan::new(255, 255))));
        assert_eq!(HeatingTime::decode(&[1]), None);
    }
}
