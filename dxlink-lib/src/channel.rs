//! Addressing for the individually exposed data channels of the instrument.
//!
//! A channel is a (service, characteristic) pair. The battery level uses the
//! standard Bluetooth battery service; everything else lives under the
//! analyzer's vendor service.

use std::fmt;
use uuid::{Uuid, uuid};

/// Standard Battery Service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

/// Analyzer vendor service.
pub const ANALYZER_SERVICE: Uuid = uuid!("a7d10000-5e1c-4c6b-9f1a-2c8e4b7d3a90");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    pub name: &'static str,
    pub service: Uuid,
    pub characteristic: Uuid,
    /// The peer pushes value changes for this channel.
    pub notify: bool,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.characteristic)
    }
}

pub const BATTERY_LEVEL: Channel = Channel {
    name: "battery",
    service: BATTERY_SERVICE,
    characteristic: uuid!("00002a19-0000-1000-8000-00805f9b34fb"),
    notify: true,
};

pub const BLOCK_TEMPERATURE: Channel = Channel {
    name: "block temperature",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10001-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: true,
};

pub const BLOCK_HEATING_TIME: Channel = Channel {
    name: "block heating time",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10002-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: false,
};

pub const EQUIPMENT_STATUS: Channel = Channel {
    name: "equipment status",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10003-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: true,
};

pub const PRE_TEST_STATUS: Channel = Channel {
    name: "pre-test status",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10004-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: true,
};

pub const PRE_TEST_FAILURE: Channel = Channel {
    name: "pre-test failure",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10005-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: false,
};

pub const TEST_CONFIGURATION: Channel = Channel {
    name: "test configuration",
    service: ANALYZER_SERVICE,
    characteristic: uuid!("a7d10006-5e1c-4c6b-9f1a-2c8e4b7d3a90"),
    notify: false,
};

/// Every channel the protocol layer knows about.
pub const ALL_CHANNELS: [Channel; 7] = [
    BATTERY_LEVEL,
    BLOCK_TEMPERATURE,
    BLOCK_HEATING_TIME,
    EQUIPMENT_STATUS,
    PRE_TEST_STATUS,
    PRE_TEST_FAILURE,
    TEST_CONFIGURATION,
];
