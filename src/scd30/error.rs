// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for the SCD30 protocol layer

use crate::transport::TransportError;

use super::ConnectionState;

/// Failures of SCD30 operations
///
/// `Checksum`, `DataNotReady` and `IncompleteRead` are transient: the
/// polling cycle absorbs them and only counts them against the failure
/// budget. Everything else is surfaced to the caller.
#[derive(thiserror::Error, Debug)]
pub enum Scd30Error {
    #[error("I2C transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Checksum mismatch in word {index}: expected {expected:#04x}, received {received:#04x}")]
    Checksum {
        index: usize,
        expected: u8,
        received: u8,
    },

    #[error("No new measurement available")]
    DataNotReady,

    #[error("Incomplete answer from sensor: expected {expected} bytes, got {actual}")]
    IncompleteRead { expected: usize, actual: usize },

    #[error("Measurement interval not applied: requested {requested} s, device reports {actual} s")]
    IntervalNotApplied { requested: u16, actual: u16 },

    #[error("SCD30 not found at address {address:#04x} on I2C bus {bus}: {reason}")]
    DeviceNotFound { bus: u8, address: u8, reason: String },

    #[error("Sensor unresponsive after {failures} consecutive failed reads")]
    SensorUnresponsive { failures: u32 },

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Malformed float encoding: need 4 payload bytes, got {length}")]
    MalformedFloatEncoding { length: usize },

    #[error("Operation requires a {expected:?} sensor, current state is {actual:?}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected response to '{command}': {value:#06x}")]
    UnexpectedResponse { command: String, value: u16 },
}

impl Scd30Error {
    /// True for failures the polling cycle retries on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Scd30Error::Checksum { .. }
                | Scd30Error::DataNotReady
                | Scd30Error::IncompleteRead { .. }
        )
    }

    /// True for failures after which the session must be terminated
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Scd30Error::Transport(_)
                | Scd30Error::DeviceNotFound { .. }
                | Scd30Error::SensorUnresponsive { .. }
        )
    }
}
