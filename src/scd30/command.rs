// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! SCD30 command encoding
//!
//! A command is a big-endian 16-bit opcode, optionally followed by a 16-bit
//! argument and the CRC of that argument. Encoding never touches the bus.
//!
//! | Command | Opcode | Argument |
//! |---|---|---|
//! | Start continuous measurement | 0x0010 | ambient pressure (mbar) |
//! | Stop continuous measurement | 0x0104 | - |
//! | Get data ready status | 0x0202 | - |
//! | Read measurement | 0x0300 | - |
//! | Get/set measurement interval | 0x4600 | interval (s) when setting |
//! | Get/set automatic self-calibration | 0x5306 | 0/1 when setting |
//! | Read firmware version | 0xD100 | - |
//! | Soft reset | 0xD304 | - |

use std::fmt;

use super::crc::{RawWord, RAW_WORD_LEN};

pub const OPCODE_START_MEASUREMENT: u16 = 0x0010;
pub const OPCODE_STOP_MEASUREMENT: u16 = 0x0104;
pub const OPCODE_DATA_READY: u16 = 0x0202;
pub const OPCODE_READ_MEASUREMENT: u16 = 0x0300;
pub const OPCODE_MEASUREMENT_INTERVAL: u16 = 0x4600;
pub const OPCODE_AUTO_SELF_CALIBRATION: u16 = 0x5306;
pub const OPCODE_FIRMWARE_VERSION: u16 = 0xD100;
pub const OPCODE_SOFT_RESET: u16 = 0xD304;

/// Logical operations understood by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartMeasurement { pressure_mbar: u16 },
    StopMeasurement,
    GetDataReady,
    ReadMeasurement,
    GetMeasurementInterval,
    SetMeasurementInterval { seconds: u16 },
    GetAutoSelfCalibration,
    SetAutoSelfCalibration { enabled: bool },
    ReadFirmwareVersion,
    SoftReset,
}

impl Command {
    pub fn opcode(&self) -> u16 {
        match self {
            Command::StartMeasurement { .. } => OPCODE_START_MEASUREMENT,
            Command::StopMeasurement => OPCODE_STOP_MEASUREMENT,
            Command::GetDataReady => OPCODE_DATA_READY,
            Command::ReadMeasurement => OPCODE_READ_MEASUREMENT,
            Command::GetMeasurementInterval | Command::SetMeasurementInterval { .. } => {
                OPCODE_MEASUREMENT_INTERVAL
            }
            Command::GetAutoSelfCalibration | Command::SetAutoSelfCalibration { .. } => {
                OPCODE_AUTO_SELF_CALIBRATION
            }
            Command::ReadFirmwareVersion => OPCODE_FIRMWARE_VERSION,
            Command::SoftReset => OPCODE_SOFT_RESET,
        }
    }

    pub fn argument(&self) -> Option<u16> {
        match *self {
            Command::StartMeasurement { pressure_mbar } => Some(pressure_mbar),
            Command::SetMeasurementInterval { seconds } => Some(seconds),
            Command::SetAutoSelfCalibration { enabled } => Some(u16::from(enabled)),
            _ => None,
        }
    }

    /// Number of bytes the sensor answers with, zero for write-only commands
    pub fn response_len(&self) -> usize {
        match self {
            Command::GetDataReady
            | Command::GetMeasurementInterval
            | Command::GetAutoSelfCalibration
            | Command::ReadFirmwareVersion => RAW_WORD_LEN,
            Command::ReadMeasurement => 6 * RAW_WORD_LEN,
            _ => 0,
        }
    }

    /// Wire bytes for this command: opcode, then argument and CRC if any
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5);
        bytes.extend_from_slice(&self.opcode().to_be_bytes());
        if let Some(argument) = self.argument() {
            bytes.extend_from_slice(&RawWord::from_u16(argument).to_bytes());
        }
        bytes
    }

    /// Decode wire bytes back into a command.
    ///
    /// Used by the simulated sensor. Returns `None` for unknown opcodes,
    /// truncated frames and arguments with a bad checksum.
    pub fn decode(bytes: &[u8]) -> Option<Command> {
        if bytes.len() < 2 {
            return None;
        }
        let opcode = u16::from_be_bytes([bytes[0], bytes[1]]);
        let argument = match bytes.len() {
            2 => None,
            5 => {
                let word = RawWord::from_slice(&bytes[2..]).ok()?;
                if !word.is_valid() {
                    return None;
                }
                Some(word.value())
            }
            _ => return None,
        };

        match (opcode, argument) {
            (OPCODE_START_MEASUREMENT, Some(pressure_mbar)) => {
                Some(Command::StartMeasurement { pressure_mbar })
            }
            (OPCODE_STOP_MEASUREMENT, None) => Some(Command::StopMeasurement),
            (OPCODE_DATA_READY, None) => Some(Command::GetDataReady),
            (OPCODE_READ_MEASUREMENT, None) => Some(Command::ReadMeasurement),
            (OPCODE_MEASUREMENT_INTERVAL, None) => Some(Command::GetMeasurementInterval),
            (OPCODE_MEASUREMENT_INTERVAL, Some(seconds)) => {
                Some(Command::SetMeasurementInterval { seconds })
            }
            (OPCODE_AUTO_SELF_CALIBRATION, None) => Some(Command::GetAutoSelfCalibration),
            (OPCODE_AUTO_SELF_CALIBRATION, Some(value)) => {
                Some(Command::SetAutoSelfCalibration { enabled: value != 0 })
            }
            (OPCODE_FIRMWARE_VERSION, None) => Some(Command::ReadFirmwareVersion),
            (OPCODE_SOFT_RESET, None) => Some(Command::SoftReset),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::StartMeasurement { pressure_mbar } => {
                write!(f, "start measurement ({} mbar)", pressure_mbar)
            }
            Command::StopMeasurement => write!(f, "stop measurement"),
            Command::GetDataReady => write!(f, "get data ready"),
            Command::ReadMeasurement => write!(f, "read measurement"),
            Command::GetMeasurementInterval => write!(f, "get measurement interval"),
            Command::SetMeasurementInterval { seconds } => {
                write!(f, "set measurement interval ({} s)", seconds)
            }
            Command::GetAutoSelfCalibration => write!(f, "get ASC status"),
            Command::SetAutoSelfCalibration { enabled } => write!(f, "set ASC ({})", enabled),
            Command::ReadFirmwareVersion => write!(f, "read firmware version"),
            Command::SoftReset => write!(f, "soft reset"),
        }
    }
}
