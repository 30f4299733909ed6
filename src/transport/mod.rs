// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! I2C transports
//!
//! The sensor driver only needs to open a bus handle for one peripheral,
//! write raw bytes to it, read raw bytes from it and close it again. This
//! module defines that capability and provides two implementations:
//! - `pigpio`: remote bus access through the pigpio daemon socket interface
//! - `mock`: an in-memory SCD30 used for tests and the `--simulate` mode

pub mod mock;
pub mod pigpio;

pub use mock::{MockScd30State, MockScd30Transport, ScriptedPoll};
pub use pigpio::PigpioTransport;

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by the underlying bus
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("pigpio daemon rejected {command} with error code {code}")]
    Daemon { command: &'static str, code: i32 },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("No device acknowledged address {address:#04x}")]
    Nack { address: u8 },

    #[error("I2C handle is not open")]
    NotOpen,
}

/// Byte-level access to a single I2C peripheral
///
/// Calls are made one at a time by the owner of the transport; an
/// implementation never has to handle overlapping requests.
#[async_trait]
pub trait I2cTransport: Send {
    /// Open a handle on `address` of bus `bus`
    async fn open(&mut self, bus: u8, address: u8) -> Result<(), TransportError>;

    /// Write raw bytes to the opened peripheral
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `length` raw bytes from the opened peripheral
    async fn read(&mut self, length: usize) -> Result<Vec<u8>, TransportError>;

    /// Release the handle. Closing a closed transport is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    fn is_open(&self) -> bool;

    /// Transport identifier for logging (e.g. "pigpio", "mock")
    fn transport_type(&self) -> &str;
}

#[async_trait]
impl I2cTransport for Box<dyn I2cTransport> {
    async fn open(&mut self, bus: u8, address: u8) -> Result<(), TransportError> {
        (**self).open(bus, address).await
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data).await
    }

    async fn read(&mut self, length: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(length).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn transport_type(&self) -> &str {
        (**self).transport_type()
    }
}
