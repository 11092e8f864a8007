use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::ChannelValue;
use crate::channel::{self, Channel};
use crate::constants::WELL_COUNT;

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreTestStatusBits {
    in_progress: bool,
    completed: bool,
    not_started: bool,
    #[skip]
    unused: B5,
}

/// Pre-test flags byte. Shared with the composite status frame.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FailureFlags {
    pub battery_low: bool,
    pub heating_failure: bool,
    pub lid_open: bool,
    pub well_failure: bool,
    #[skip]
    unused: B4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PreTestPhase {
    NotStarted,
    InProgress,
    Completed,
    Unknown,
}

/// Raw pre-test status flags as read from the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreTestStatus {
    pub in_progress: bool,
    pub completed: bool,
    pub not_started: bool,
}

impl PreTestStatus {
    /// Phase is defined only when exactly one flag is raised.
    pub fn phase(&self) -> PreTestPhase {
        match (self.in_progress, self.completed, self.not_started) {
            (true, false, false) => PreTestPhase::InProgress,
            (false, true, false) => PreTestPhase::Completed,
            (false, false, true) => PreTestPhase::NotStarted,
            _ => PreTestPhase::Unknown,
        }
    }
}

impl ChannelValue for PreTestStatus {
    const CHANNEL: Channel = channel::PRE_TEST_STATUS;
    const MIN_LEN: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        let bits = PreTestStatusBits::from_bytes([*bytes.first()?]);
        Some(Self {
            in_progress: bits.in_progress(),
            completed: bits.completed(),
            not_started: bits.not_started(),
        })
    }
}

/// Pre-test failure flags plus the bitmask of wells that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreTestFailures {
    pub battery_low: bool,
    pub heating_failure: bool,
    pub lid_open: bool,
    pub well_failure: bool,
    pub failed_wells: u8,
}

impl PreTestFailures {
    pub(crate) fn from_raw(flags: u8, failed_wells: u8) -> Self {
        let bits = FailureFlags::from_bytes([flags]);
        Self {
            battery_low: bits.battery_low(),
            heating_failure: bits.heating_failure(),
            lid_open: bits.lid_open(),
            well_failure: bits.well_failure(),
            failed_wells,
        }
    }

    pub(crate) fn flags_byte(&self) -> u8 {
        let [byte] = FailureFlags::new()
            .with_battery_low(self.battery_low)
            .with_heating_failure(self.heating_failure)
            .with_lid_open(self.lid_open)
            .with_well_failure(self.well_failure)
            .into_bytes();
        byte
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [self.flags_byte(), self.failed_wells]
    }

    /// Any failure flag raised or any well marked failed.
    pub fn any(&self) -> bool {
        self.battery_low || self.heating_failure || self.lid_open || self.well_failure || self.failed_wells != 0
    }

    /// Zero-based indices of the wells marked failed.
    pub fn failed_well_indices(&self) -> impl Iterator<Item = u8> + '_ {
        (0..WELL_COUNT).filter(move |i| self.failed_wells & (1 << i) != 0)
    }
}

impl ChannelValue for PreTestFailures {
    const CHANNEL: Channel = channel::PRE_TEST_FAILURE;
    const MIN_LEN: usize = 2;

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [flags, wells, ..] => Some(Self::from_raw(*flags, *wells)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_exclusive_phases() {
        assert_eq!(PreTestStatus::decode(&[0b001]).unwrap().phase(), PreTestPhase::InProgress);
        assert_eq!(PreTestStatus::decode(&[0b010]).unwrap().phase(), PreTestPhase::Completed);
        assert_eq!(PreTestStatus::decode(&[0b100]).unwrap().phase(), PreTestPhase::NotStarted);
    }

    #[test]
    fn test_status_ambiguous_is_unknown() {
        assert_eq!(PreTestStatus::decode(&[0b000]).unwrap().phase(), PreTestPhase::Unknown);
        assert_eq!(PreTestStatus::decode(&[0b011]).unwrap().phase(), PreTestPhase::Unknown);
        assert_eq!(PreTestStatus::decode(&[0b111]).unwrap().phase(), PreTestPhase::Unknown);
        assert_eq!(PreTestStatus::decode(&[]), None);
    }

    #[test]
    fn test_status_ignores_high_bits() {
        let status = PreTestStatus::decode(&[0b1111_0010]).unwrap();
        assert_eq!(status.phase(), PreTestPhase::Completed);
    }

    #[test]
    fn test_failure_flags_and_wells() {
        let failures = PreTestFailures::decode(&[0b1010, 0b1000_0101]).unwrap();
        assert!(!failures.battery_low);
        assert!(failures.heating_failure);
        assert!(!failures.lid_open);
        assert!(failures.well_failure);
        assert_eq!(failures.failed_well_indices().collect::<Vec<_>>(), vec![0, 2, 7]);
        assert!(failures.any());
        assert_eq!(failures.to_bytes(), [0b1010, 0b1000_0101]);
    }

    #[test]
    fn test_failure_short_payload() {
        assert_eq!(PreTestFailures::decode(&[0x01]), None);
        assert!(!PreTestFailures::default().any());
    }
}
