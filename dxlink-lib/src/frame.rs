//! # Composite status frame
//!
//! The mock, network and simulator transports multiplex the whole instrument
//! status into one fixed 13-byte frame:
//!
//! | Offset | Field | Encoding |
//! |---|---|---|
//! | 0-1 | battery | big-endian `u16`, clamped to 0..=100 |
//! | 2 | block temperature | bit 7 set = non-negative, bits 0-6 = magnitude |
//! | 3 | reserved | |
//! | 4-5 | block heating time | hours, minutes |
//! | 6 | equipment mode | bit 0: standby / analysis |
//! | 7-8 | analysis elapsed | hours, minutes |
//! | 9 | pre-test status | bit 0 in progress, bit 1 completed |
//! | 10 | pre-test failure flags | see [`PreTestFailures`] |
//! | 11 | failed wells | bitmask |
//! | 12 | test type | see [`TestType`] |
//!
//! Every 13-byte buffer decodes; reserved and unused bits are ignored.

use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec::{PreTestFailures, TimeSpan};
use crate::constants::{MAX_BATTERY_PERCENT, MAX_FRAME_TEMPERATURE_C, STATUS_FRAME_SIZE};
use crate::error::{LinkError, Result};

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct StatusFrameRaw {
    pub battery: U16,
    pub temperature: u8,
    pub reserved: u8,
    pub heating_hours: u8,
    pub heating_minutes: u8,
    pub equipment: u8,
    pub elapsed_hours: u8,
    pub elapsed_minutes: u8,
    pub pre_test: u8,
    pub failure_flags: u8,
    pub failed_wells: u8,
    pub test_type: u8,
}

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignedMagnitude {
    magnitude: B7,
    non_negative: bool,
}

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EquipmentBits {
    analysis: bool,
    #[skip]
    unused: B7,
}

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreTestBits {
    in_progress: bool,
    completed: bool,
    #[skip]
    unused: B6,
}

/// Equipment state as carried by the composite frame (one bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EquipmentMode {
    #[default]
    Standby,
    Analysis,
}

/// Pre-test progress as carried by the composite frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PreTestProgress {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Assay selected on the instrument.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, FromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum TestType {
    #[default]
    None = 0,
    Cinomose = 1,
    IbvGeral = 2,
    IbvEspecifico = 3,
}

/// One complete status snapshot. Each poll yields a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFrame {
    pub battery_percent: u8,
    /// Valid range is -127..=127.
    pub block_temperature_c: i16,
    pub block_heating_time: TimeSpan,
    pub equipment: EquipmentMode,
    pub analysis_elapsed: TimeSpan,
    pub pre_test: PreTestProgress,
    pub pre_test_failures: PreTestFailures,
    pub test_type: TestType,
}

impl StatusFrame {
    /// Decode a frame. Only the length is validated.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw = StatusFrameRaw::read_from_bytes(bytes).map_err(|_| LinkError::InvalidLength {
            expected: STATUS_FRAME_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self::from(raw))
    }

    /// Encode a frame. Fails only for a temperature outside -127..=127;
    /// the battery is clamped to 100.
    pub fn serialize(&self) -> Result<[u8; STATUS_FRAME_SIZE]> {
        let raw = StatusFrameRaw::try_from(self)?;
        let mut out = [0u8; STATUS_FRAME_SIZE];
        out.copy_from_slice(raw.as_bytes());
        Ok(out)
    }
}

impl From<StatusFrameRaw> for StatusFrame {
    fn from(raw: StatusFrameRaw) -> Self {
        let battery_percent = raw.battery.get().min(u16::from(MAX_BATTERY_PERCENT)) as u8;

        let temperature = SignedMagnitude::from_bytes([raw.temperature]);
        let magnitude = i16::from(temperature.magnitude());
        let block_temperature_c = if temperature.non_negative() { magnitude } else { -magnitude };

        let equipment = if EquipmentBits::from_bytes([raw.equipment]).analysis() {
            EquipmentMode::Analysis
        } else {
            EquipmentMode::Standby
        };

        let pre_test_bits = PreTestBits::from_bytes([raw.pre_test]);
        let pre_test = if pre_test_bits.completed() {
            PreTestProgress::Completed
        } else if pre_test_bits.in_progress() {
            PreTestProgress::InProgress
        } else {
            PreTestProgress::NotStarted
        };

        StatusFrame {
            battery_percent,
            block_temperature_c,
            block_heating_time: TimeSpan::new(raw.heating_hours, raw.heating_minutes),
            equipment,
            analysis_elapsed: TimeSpan::new(raw.elapsed_hours, raw.elapsed_minutes),
            pre_test,
            pre_test_failures: PreTestFailures::from_raw(raw.failure_flags, raw.failed_wells),
            test_type: TestType::from_primitive(raw.test_type),
        }
    }
}

impl TryFrom<&StatusFrame> for StatusFrameRaw {
    type Error = LinkError;

    fn try_from(frame: &StatusFrame) -> Result<Self> {
        let temperature = frame.block_temperature_c;
        if !(-MAX_FRAME_TEMPERATURE_C..=MAX_FRAME_TEMPERATURE_C).contains(&temperature) {
            return Err(LinkError::OutOfRange {
                field: "block_temperature_c",
                value: i64::from(temperature),
            });
        }
        let [temperature] = SignedMagnitude::new()
            .with_magnitude(temperature.unsigned_abs() as u8)
            .with_non_negative(temperature >= 0)
            .into_bytes();

        let [equipment] = EquipmentBits::new()
            .with_analysis(frame.equipment == EquipmentMode::Analysis)
            .into_bytes();

        let [pre_test] = PreTestBits::new()
            .with_in_progress(frame.pre_test == PreTestProgress::InProgress)
            .with_completed(frame.pre_test == PreTestProgress::Completed)
            .into_bytes();

        Ok(StatusFrameRaw {
            battery: U16::new(u16::from(frame.battery_percent.min(MAX_BATTERY_PERCENT))),
            temperature,
            reserved: 0,
            heating_hours: frame.block_heating_time.hours,
            heating_minutes: frame.block_heating_time.minutes,
            equipment,
            elapsed_hours: frame.analysis_elapsed.hours,
            elapsed_minutes: frame.analysis_elapsed.minutes,
            pre_test,
            failure_flags: frame.pre_test_failures.flags_byte(),
            failed_wells: frame.pre_test_failures.failed_wells,
            test_type: frame.test_type.into(),
        })
    }
}

impl fmt::Display for StatusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "battery {:>3}% | block {:>4} °C | heating {} | {} {} | pre-test {} | test {}",
            self.battery_percent,
            self.block_temperature_c,
            self.block_heating_time,
            self.equipment,
            self.analysis_elapsed,
            self.pre_test,
            self.test_type
        )?;
        if self.pre_test_failures.any() {
            write!(f, " | failures {:?}", self.pre_test_failures)?;
        }
        Ok(())
    }
}
