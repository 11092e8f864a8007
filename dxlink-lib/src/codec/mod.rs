//! Byte layouts of the individually addressed instrument channels.
//!
//! Each value type decodes from the raw characteristic payload. A payload
//! shorter than the layout's minimum decodes to `None`: the channel simply
//! returned nothing useful, which is not an error.

pub mod battery;
pub mod equipment;
pub mod pretest;
pub mod temperature;
pub mod test_config;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::channel::Channel;

pub use battery::BatteryStatus;
pub use equipment::EquipmentStatus;
pub use pretest::{PreTestFailures, PreTestPhase, PreTestStatus};
pub use temperature::{HeatingTime, TemperatureBlock};
pub use test_config::{DetectionMode, TestConfiguration};

/// A value read from one instrument channel.
pub trait ChannelValue: Sized + Send + Sync + fmt::Debug + 'static {
    /// Channel this value is read from.
    const CHANNEL: Channel;
    /// Shortest payload that carries a value.
    const MIN_LEN: usize;

    /// Decode from the exact payload the peer returned.
    fn decode(bytes: &[u8]) -> Option<Self>;
}

/// A value written to one instrument channel.
pub trait ChannelCommand {
    const CHANNEL: Channel;

    fn to_payload(&self) -> Bytes;
}

/// Hours and minutes as carried on the wire, one byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    pub hours: u8,
    pub minutes: u8,
}

impl TimeSpan {
    pub const fn new(hours: u8, minutes: u8) -> Self {
        Self { hours, minutes }
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            hours: bytes[0],
            minutes: bytes[1],
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.hours, self.minutes]
    }

    pub fn total_minutes(&self) -> u32 {
        u32::from(self.hours) * 60 + u32::from(self.minutes)
    }

    /// Advance by one minute, rolling minutes into hours and saturating at 255:59.
    pub fn tick_minute(&mut self) {
        if self.minutes >= 59 {
            if self.hours < u8::MAX {
                self.hours += 1;
                self.minutes = 0;
            }
        } else {
            self.minutes += 1;
        }
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}
