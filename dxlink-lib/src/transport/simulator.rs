//! Offline instrument: produces a plausible status frame on every tick.
//!
//! The block temperature sweeps 0 → 100 → 0 °C in 5 °C steps. The instrument
//! reports analysis while heating and standby while cooling, so a subscriber
//! sees both equipment modes every 40 ticks.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::{Transport, TransportKind};
use crate::codec::{PreTestFailures, TimeSpan};
use crate::constants::{
    SIMULATOR_AMBIENT_TEMPERATURE, SIMULATOR_MAX_TEMPERATURE, SIMULATOR_TEMPERATURE_STEP, SIMULATOR_TICK,
};
use crate::error::{LinkError, Result};
use crate::frame::{EquipmentMode, PreTestProgress, StatusFrame, TestType};
use crate::listeners::{Listener, ListenerId, Listeners};

const BATTERY_DRAIN_TICKS: u64 = 20;
const BATTERY_FLOOR: u8 = 5;

/// Deterministic simulator state; one [`advance`](Self::advance) per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorState {
    temperature: i16,
    rising: bool,
    heating: TimeSpan,
    elapsed: TimeSpan,
    battery: u8,
    ticks: u64,
    pre_test: PreTestProgress,
    test_type: TestType,
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self {
            temperature: 0,
            rising: true,
            heating: TimeSpan::default(),
            elapsed: TimeSpan::default(),
            battery: 100,
            ticks: 0,
            pre_test: PreTestProgress::NotStarted,
            test_type: TestType::None,
        }
    }
}

impl SimulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> StatusFrame {
        StatusFrame {
            battery_percent: self.battery,
            block_temperature_c: self.temperature,
            block_heating_time: self.heating,
            equipment: if self.rising {
                EquipmentMode::Analysis
            } else {
                EquipmentMode::Standby
            },
            analysis_elapsed: self.elapsed,
            pre_test: self.pre_test,
            pre_test_failures: PreTestFailures::default(),
            test_type: self.test_type,
        }
    }

    pub fn advance(&mut self) {
        self.ticks += 1;

        if self.rising {
            self.temperature = (self.temperature + SIMULATOR_TEMPERATURE_STEP).min(SIMULATOR_MAX_TEMPERATURE);
            self.elapsed.tick_minute();
            if self.pre_test == PreTestProgress::NotStarted {
                self.pre_test = PreTestProgress::InProgress;
            }
            if self.temperature == SIMULATOR_MAX_TEMPERATURE {
                self.rising = false;
                self.pre_test = PreTestProgress::Completed;
            }
        } else {
            self.temperature = (self.temperature - SIMULATOR_TEMPERATURE_STEP).max(0);
            if self.temperature == 0 {
                self.rising = true;
                self.elapsed = TimeSpan::default();
            }
        }

        if self.temperature > SIMULATOR_AMBIENT_TEMPERATURE {
            self.heating.tick_minute();
        }

        if self.ticks % BATTERY_DRAIN_TICKS == 0 && self.battery > BATTERY_FLOOR {
            self.battery -= 1;
        }
    }

    pub fn set_test_type(&mut self, test_type: TestType) {
        self.test_type = test_type;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

pub struct SimulatorTransport {
    tick: Duration,
    state: Arc<Mutex<SimulatorState>>,
    listeners: Arc<Listeners<Bytes>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatorTransport {
    pub fn new() -> Self {
        Self::with_tick(SIMULATOR_TICK)
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick,
            state: Arc::new(Mutex::new(SimulatorState::new())),
            listeners: Arc::new(Listeners::new()),
            task: Mutex::new(None),
        }
    }

    /// Snapshot of the current simulated status.
    pub fn current(&self) -> StatusFrame {
        self.state.lock().frame()
    }
}

impl Default for SimulatorTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimulatorTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Simulator
    }

    async fn connect(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }

        let state = self.state.clone();
        let listeners = self.listeners.clone();
        let mut ticker = interval(self.tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        *task = Some(tokio::spawn(async move {
            loop {
                // The first tick completes immediately
                ticker.tick().await;
                let frame = {
                    let mut state = state.lock();
                    let frame = state.frame();
                    state.advance();
                    frame
                };
                match frame.serialize() {
                    Ok(bytes) => {
                        listeners.emit(&Bytes::copy_from_slice(&bytes));
                    }
                    Err(e) => warn!("Simulator produced an unencodable frame: {e}"),
                }
            }
        }));
        info!(tick = ?self.tick, "Simulator transport connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("Simulator transport disconnected");
        }
        Ok(())
    }

    /// Accepts a status frame and adopts its test type.
    async fn send(&self, data: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        let frame = StatusFrame::parse(&data)?;
        debug!(test_type = %frame.test_type, "Simulator switching assay");
        self.state.lock().set_test_type(frame.test_type);
        Ok(())
    }

    fn on_data(&self, listener: Listener<Bytes>) -> ListenerId {
        self.listeners.insert(listener)
    }

    fn off_data(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn is_connected(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl Drop for SimulatorTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
