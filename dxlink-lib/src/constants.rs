// Protocol constants for the analyzer link

use std::time::Duration;

/// Size of the composite status frame (13 bytes)
pub const STATUS_FRAME_SIZE: usize = 13;

/// Largest block temperature magnitude the frame can carry (7 bits)
pub const MAX_FRAME_TEMPERATURE_C: i16 = 127;

/// Highest battery percentage reported anywhere
pub const MAX_BATTERY_PERCENT: u8 = 100;

/// Battery level below which the instrument is considered low
pub const LOW_BATTERY_PERCENT: u8 = 15;

/// Largest temperature the configuration byte can carry (7 bits)
pub const MAX_CONFIG_TEMPERATURE_C: u8 = 127;

/// Number of wells addressable by the failed-wells bitmask
pub const WELL_COUNT: u8 = 8;

/// Simulator frame period
pub const SIMULATOR_TICK: Duration = Duration::from_millis(500);

/// Simulator temperature step per tick (°C)
pub const SIMULATOR_TEMPERATURE_STEP: i16 = 5;

/// Simulator sweep ceiling (°C)
pub const SIMULATOR_MAX_TEMPERATURE: i16 = 100;

/// Block temperature above which the simulator accrues heating time (°C)
pub const SIMULATOR_AMBIENT_TEMPERATURE: i16 = 25;

/// Delay before the mock transport echoes a sent buffer
pub const MOCK_ECHO_DELAY: Duration = Duration::from_millis(10);

/// Default polling periods per channel
pub const DEFAULT_BATTERY_POLL: Duration = Duration::from_secs(10);
pub const DEFAULT_TEMPERATURE_POLL: Duration = Duration::from_secs(1);
pub const DEFAULT_HEATING_TIME_POLL: Duration = Duration::from_secs(1);
pub const DEFAULT_EQUIPMENT_POLL: Duration = Duration::from_secs(1);
pub const DEFAULT_PRETEST_POLL: Duration = Duration::from_secs(1);
