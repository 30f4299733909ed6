// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated SCD30 on an in-memory I2C bus
//!
//! The mock decodes every command written to it, keeps the sensor registers
//! (interval, ASC flag, measuring state) and queues the bytes the real
//! device would answer with. Polling outcomes can be scripted one by one
//! so that tests reproduce not-ready periods and corrupted transfers; when
//! the script is empty and the sensor is measuring, synthetic readings are
//! produced.
//!
//! The state lives behind an `Arc<Mutex<_>>` so a test can keep a handle on
//! it while the driver owns the transport.

use async_trait::async_trait;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{I2cTransport, TransportError};
use crate::scd30::command::Command;
use crate::scd30::crc::RawWord;
use crate::scd30::float::encode_words;

/// SCD30 default I2C address
pub const MOCK_SCD30_ADDRESS: u8 = 0x61;

/// Scripted result of one polling cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedPoll {
    /// Data-ready flag reads 0
    NotReady,
    /// Data-ready word arrives with a wrong checksum
    CorruptReadyFlag,
    /// Data ready, measurement decodes to these values
    Ready {
        co2_ppm: f32,
        temperature_c: f32,
        humidity_pct: f32,
    },
    /// Data ready, but the checksum of measurement word `word` is wrong
    CorruptMeasurement { word: usize },
}

impl ScriptedPoll {
    pub fn ready(co2_ppm: f32, temperature_c: f32, humidity_pct: f32) -> Self {
        ScriptedPoll::Ready {
            co2_ppm,
            temperature_c,
            humidity_pct,
        }
    }
}

/// Register and bus state of the simulated sensor
#[derive(Debug, Clone)]
pub struct MockScd30State {
    /// Address the simulated device answers on
    pub address: u8,
    pub firmware_version: (u8, u8),
    pub measuring: bool,
    pub pressure_mbar: Option<u16>,
    pub measurement_interval: u16,
    pub asc_enabled: bool,
    /// Silently drop interval writes, as a device refusing the value would
    pub ignore_interval_writes: bool,
    /// Make every write fail as if the bus had gone away
    pub fail_writes: bool,
    /// Pending polling outcomes, consumed front to back
    pub script: VecDeque<ScriptedPoll>,
    /// Every command received, in order
    pub commands: Vec<Command>,
    pub open: bool,
    pub open_count: u32,
    pub close_count: u32,
    pub reset_count: u32,
    pub pending: VecDeque<u8>,
    pub generated: u64,
}

impl Default for MockScd30State {
    fn default() -> Self {
        Self {
            address: MOCK_SCD30_ADDRESS,
            firmware_version: (3, 66),
            measuring: false,
            pressure_mbar: None,
            measurement_interval: 2,
            asc_enabled: false,
            ignore_interval_writes: false,
            fail_writes: false,
            script: VecDeque::new(),
            commands: Vec::new(),
            open: false,
            open_count: 0,
            close_count: 0,
            reset_count: 0,
            pending: VecDeque::new(),
            generated: 0,
        }
    }
}

impl MockScd30State {
    /// Commands received so far, filtered by opcode
    pub fn count_commands(&self, opcode: u16) -> usize {
        self.commands.iter().filter(|c| c.opcode() == opcode).count()
    }

    fn queue_word(&mut self, word: RawWord) {
        self.pending.extend(word.to_bytes());
    }

    fn queue_measurement(&mut self, values: [f32; 3], corrupt_word: Option<usize>) {
        let mut words: Vec<RawWord> = values.iter().flat_map(|v| encode_words(*v)).collect();
        if let Some(index) = corrupt_word {
            if let Some(word) = words.get_mut(index) {
                word.crc ^= 0xFF;
            }
        }
        for word in words {
            self.queue_word(word);
        }
    }

    /// Slowly varying values used when nothing is scripted
    fn synthetic_values(&mut self) -> [f32; 3] {
        self.generated += 1;
        let phase = (self.generated % 60) as f32 / 60.0 * std::f32::consts::TAU;
        [
            450.0 + 25.0 * phase.sin(),
            21.5 + 0.5 * phase.cos(),
            40.0 + 2.0 * phase.sin(),
        ]
    }

    fn execute(&mut self, command: Command) {
        self.pending.clear();
        match command {
            Command::StartMeasurement { pressure_mbar } => {
                self.measuring = true;
                self.pressure_mbar = Some(pressure_mbar);
            }
            Command::StopMeasurement => self.measuring = false,
            Command::GetDataReady => {
                let ready = match self.script.front().copied() {
                    Some(ScriptedPoll::NotReady) => {
                        self.script.pop_front();
                        Some(false)
                    }
                    Some(ScriptedPoll::CorruptReadyFlag) => {
                        self.script.pop_front();
                        None
                    }
                    Some(_) => Some(true),
                    None => Some(self.measuring),
                };
                match ready {
                    Some(flag) => self.queue_word(RawWord::from_u16(u16::from(flag))),
                    None => {
                        let mut word = RawWord::from_u16(1);
                        word.crc ^= 0xFF;
                        self.queue_word(word);
                    }
                }
            }
            Command::ReadMeasurement => match self.script.pop_front() {
                Some(ScriptedPoll::Ready {
                    co2_ppm,
                    temperature_c,
                    humidity_pct,
                }) => self.queue_measurement([co2_ppm, temperature_c, humidity_pct], None),
                Some(ScriptedPoll::CorruptMeasurement { word }) => {
                    let values = self.synthetic_values();
                    self.queue_measurement(values, Some(word));
                }
                Some(other) => {
                    // Not a measurement outcome, leave it for the next poll
                    self.script.push_front(other);
                    self.queue_measurement([0.0; 3], None);
                }
                None => {
                    let values = self.synthetic_values();
                    self.queue_measurement(values, None);
                }
            },
            Command::GetMeasurementInterval => {
                self.queue_word(RawWord::from_u16(self.measurement_interval))
            }
            Command::SetMeasurementInterval { seconds } => {
                if !self.ignore_interval_writes {
                    self.measurement_interval = seconds;
                }
            }
            Command::GetAutoSelfCalibration => {
                self.queue_word(RawWord::from_u16(u16::from(self.asc_enabled)))
            }
            Command::SetAutoSelfCalibration { enabled } => self.asc_enabled = enabled,
            Command::ReadFirmwareVersion => {
                let (major, minor) = self.firmware_version;
                self.queue_word(RawWord::new([major, minor]));
            }
            Command::SoftReset => {
                self.reset_count += 1;
                self.measuring = false;
            }
        }
    }
}

/// I2C transport backed by a [`MockScd30State`]
#[derive(Debug, Clone, Default)]
pub struct MockScd30Transport {
    state: Arc<Mutex<MockScd30State>>,
    target: Option<u8>,
}

impl MockScd30Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: MockScd30State) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            target: None,
        }
    }

    /// Shared handle on the simulated device
    pub fn state(&self) -> Arc<Mutex<MockScd30State>> {
        Arc::clone(&self.state)
    }

    /// Queue polling outcomes
    pub fn script(&self, polls: impl IntoIterator<Item = ScriptedPoll>) {
        self.lock().script.extend(polls);
    }

    fn lock(&self) -> MutexGuard<'_, MockScd30State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn target(&self) -> Result<u8, TransportError> {
        self.target.ok_or(TransportError::NotOpen)
    }
}

#[async_trait]
impl I2cTransport for MockScd30Transport {
    async fn open(&mut self, bus: u8, address: u8) -> Result<(), TransportError> {
        debug!("Mock I2C open on bus {} address {:#04x}", bus, address);
        let mut state = self.lock();
        state.open = true;
        state.open_count += 1;
        drop(state);
        self.target = Some(address);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let target = self.target()?;
        let mut state = self.lock();
        if state.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated bus failure",
            )));
        }
        if target != state.address {
            return Err(TransportError::Nack { address: target });
        }

        match Command::decode(data) {
            Some(command) => {
                debug!("Mock SCD30 executing '{}'", command);
                state.commands.push(command);
                state.execute(command);
                Ok(())
            }
            None => Err(TransportError::Nack { address: target }),
        }
    }

    async fn read(&mut self, length: usize) -> Result<Vec<u8>, TransportError> {
        let target = self.target()?;
        let mut state = self.lock();
        if target != state.address {
            return Err(TransportError::Nack { address: target });
        }
        if state.pending.len() < length {
            return Err(TransportError::ShortRead {
                expected: length,
                actual: state.pending.len(),
            });
        }
        Ok(state.pending.drain(..length).collect())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.target.take().is_some() {
            let mut state = self.lock();
            state.open = false;
            state.close_count += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.target.is_some()
    }

    fn transport_type(&self) -> &str {
        "mock"
    }
}
