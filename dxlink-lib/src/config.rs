//! Runtime configuration for transports and monitors, loadable from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    DEFAULT_BATTERY_POLL, DEFAULT_EQUIPMENT_POLL, DEFAULT_HEATING_TIME_POLL, DEFAULT_PRETEST_POLL,
    DEFAULT_TEMPERATURE_POLL, MOCK_ECHO_DELAY, SIMULATOR_TICK,
};
use crate::error::{LinkError, Result};

/// Poll period per channel group, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    pub battery_ms: u64,
    pub temperature_ms: u64,
    pub heating_time_ms: u64,
    pub equipment_ms: u64,
    pub pretest_ms: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            battery_ms: DEFAULT_BATTERY_POLL.as_millis() as u64,
            temperature_ms: DEFAULT_TEMPERATURE_POLL.as_millis() as u64,
            heating_time_ms: DEFAULT_HEATING_TIME_POLL.as_millis() as u64,
            equipment_ms: DEFAULT_EQUIPMENT_POLL.as_millis() as u64,
            pretest_ms: DEFAULT_PRETEST_POLL.as_millis() as u64,
        }
    }
}

impl PollIntervals {
    /// Same period for every channel; handy for tests and demos.
    pub fn uniform(period: Duration) -> Self {
        let ms = period.as_millis() as u64;
        Self {
            battery_ms: ms,
            temperature_ms: ms,
            heating_time_ms: ms,
            equipment_ms: ms,
            pretest_ms: ms,
        }
    }

    pub fn battery(&self) -> Duration {
        Duration::from_millis(self.battery_ms)
    }

    pub fn temperature(&self) -> Duration {
        Duration::from_millis(self.temperature_ms)
    }

    pub fn heating_time(&self) -> Duration {
        Duration::from_millis(self.heating_time_ms)
    }

    pub fn equipment(&self) -> Duration {
        Duration::from_millis(self.equipment_ms)
    }

    pub fn pretest(&self) -> Duration {
        Duration::from_millis(self.pretest_ms)
    }

    fn entries(&self) -> [(&'static str, u64); 5] {
        [
            ("battery_ms", self.battery_ms),
            ("temperature_ms", self.temperature_ms),
            ("heating_time_ms", self.heating_time_ms),
            ("equipment_ms", self.equipment_ms),
            ("pretest_ms", self.pretest_ms),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// WebSocket endpoint of a network-simulated instrument.
    pub network_url: Option<String>,
    pub simulator_tick_ms: u64,
    pub mock_echo_delay_ms: u64,
    pub poll: PollIntervals,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            network_url: None,
            simulator_tick_ms: SIMULATOR_TICK.as_millis() as u64,
            mock_echo_delay_ms: MOCK_ECHO_DELAY.as_millis() as u64,
            poll: PollIntervals::default(),
        }
    }
}

impl LinkConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulator_tick_ms == 0 {
            return Err(LinkError::Config("simulator_tick_ms must be non-zero".to_string()));
        }
        if let Some((name, _)) = self.poll.entries().into_iter().find(|(_, ms)| *ms == 0) {
            return Err(LinkError::Config(format!("poll.{name} must be non-zero")));
        }
        if let Some(url) = &self.network_url {
            if url.trim().is_empty() {
                return Err(LinkError::Config("network_url is empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn simulator_tick(&self) -> Duration {
        Duration::from_millis(self.simulator_tick_ms)
    }

    pub fn mock_echo_delay(&self) -> Duration {
        Duration::from_millis(self.mock_echo_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = LinkConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.poll.battery(), Duration::from_secs(10));
        assert_eq!(config.poll.temperature(), Duration::from_secs(1));
        assert_eq!(config.simulator_tick(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_override() {
        let config = LinkConfig::from_json_str(r#"{"network_url":"ws://10.0.0.2:8765","poll":{"battery_ms":2500}}"#).unwrap();
        assert_eq!(config.network_url.as_deref(), Some("ws://10.0.0.2:8765"));
        assert_eq!(config.poll.battery_ms, 2500);
        assert_eq!(config.poll.pretest_ms, 1000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = LinkConfig::from_json_str(r#"{"poll":{"equipment_ms":0}}"#).unwrap_err();
        assert!(err.to_string().contains("poll.equipment_ms"));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(LinkConfig::from_json_str("{"), Err(LinkError::Json(_))));
    }
}
