use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::ChannelValue;
use crate::channel::{self, Channel};

/// Instrument operating state as reported by the equipment status channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, FromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum EquipmentStatus {
    #[default]
    Standby = 0,
    Analysis = 1,
    AnalysisError = 2,
    AnalysisCompleted = 3,
}

impl EquipmentStatus {
    /// An analysis run is underway.
    pub fn is_busy(&self) -> bool {
        matches!(self, EquipmentStatus::Analysis)
    }
}

impl ChannelValue for EquipmentStatus {
    const CHANNEL: Channel = channel::EQUIPMENT_STATUS;
    const MIN_LEN: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.first().map(|&b| EquipmentStatus::from_primitive(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_states() {
        assert_eq!(EquipmentStatus::decode(&[0]), Some(EquipmentStatus::Standby));
        assert_eq!(EquipmentStatus::decode(&[1]), Some(EquipmentStatus::Analysis));
        assert_eq!(EquipmentStatus::decode(&[2]), Some(EquipmentStatus::AnalysisError));
        assert_eq!(EquipmentStatus::decode(&[3]), Some(EquipmentStatus::AnalysisCompleted));
    }

    #[test]
    fn test_unknown_byte_is_standby() {
        assert_eq!(EquipmentStatus::decode(&[0x42]), Some(EquipmentStatus::Standby));
        assert_eq!(EquipmentStatus::decode(&[]), None);
    }

    #[test]
    fn test_display_and_primitive() {
        assert_eq!(EquipmentStatus::AnalysisCompleted.to_string(), "analysis_completed");
        assert_eq!(u8::from(EquipmentStatus::AnalysisError), 2);
        assert!(EquipmentStatus::Analysis.is_busy());
        assert!(!EquipmentStatus::AnalysisCompleted.is_busy());
    }
}
