// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! pigpio daemon transport
//!
//! Talks to `pigpiod` over its TCP socket interface (default port 8888).
//! Each request is four little-endian `u32` words `cmd, p1, p2, p3`,
//! optionally followed by `p3` extension bytes. The daemon answers with four
//! words as well, the last one being a signed result: a negative value is an
//! error code, otherwise it is the command result (a handle, a byte count).
//! A successful device read is followed by the data bytes.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{I2cTransport, TransportError};

/// Default pigpiod socket port
pub const DEFAULT_PIGPIO_PORT: u16 = 8888;

const CMD_I2CO: u32 = 54;
const CMD_I2CC: u32 = 55;
const CMD_I2CRD: u32 = 56;
const CMD_I2CWD: u32 = 57;

const FRAME_LEN: usize = 16;

/// I2C access through a remote pigpio daemon
#[derive(Debug)]
pub struct PigpioTransport {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
    handle: Option<u32>,
}

impl PigpioTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(5),
            stream: None,
            handle: None,
        }
    }

    /// Set the timeout applied to connecting and to each request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let address = format!("{}:{}", self.host, self.port);
        debug!("Connecting to pigpio daemon at {}", address);
        let stream = timeout(self.timeout, TcpStream::connect(address.as_str()))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "pigpio connect",
                timeout: self.timeout,
            })??;
        stream.set_nodelay(true)?;
        info!("Connected to pigpio daemon at {}", address);
        self.stream = Some(stream);
        Ok(())
    }

    /// Send one command and return the daemon's signed result
    async fn command(
        &mut self,
        name: &'static str,
        cmd: u32,
        p1: u32,
        p2: u32,
        extension: &[u8],
    ) -> Result<i32, TransportError> {
        let request = encode_request(cmd, p1, p2, extension);
        let limit = self.timeout;
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;

        let exchange = async {
            stream.write_all(&request).await?;
            let mut response = [0u8; FRAME_LEN];
            stream.read_exact(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };
        let outcome = timeout(limit, exchange).await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(self.abandon(e.into())),
            Err(_) => {
                return Err(self.abandon(TransportError::Timeout {
                    operation: name,
                    timeout: limit,
                }))
            }
        };

        let result = decode_result(&response);
        if result < 0 {
            return Err(TransportError::Daemon {
                command: name,
                code: result,
            });
        }
        Ok(result)
    }

    /// Drop the socket after an I/O failure or timeout.
    ///
    /// A late answer may still be in flight, so the stream can no longer be
    /// trusted to be in step with our requests. The handle is forgotten with
    /// it; pigpiod releases the handles of a closed socket.
    fn abandon(&mut self, error: TransportError) -> TransportError {
        warn!("pigpio connection dropped after error: {}", error);
        self.stream = None;
        self.handle = None;
        error
    }

    fn handle(&self) -> Result<u32, TransportError> {
        self.handle.ok_or(TransportError::NotOpen)
    }
}

/// Build a request frame followed by its extension bytes
fn encode_request(cmd: u32, p1: u32, p2: u32, extension: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_LEN + extension.len());
    frame.extend_from_slice(&cmd.to_le_bytes());
    frame.extend_from_slice(&p1.to_le_bytes());
    frame.extend_from_slice(&p2.to_le_bytes());
    frame.extend_from_slice(&(extension.len() as u32).to_le_bytes());
    frame.extend_from_slice(extension);
    frame
}

fn decode_result(response: &[u8; FRAME_LEN]) -> i32 {
    i32::from_le_bytes([response[12], response[13], response[14], response[15]])
}

#[async_trait]
impl I2cTransport for PigpioTransport {
    async fn open(&mut self, bus: u8, address: u8) -> Result<(), TransportError> {
        if self.handle.is_some() {
            warn!("pigpio I2C handle already open, closing it first");
            self.close().await?;
        }
        self.connect().await?;

        let flags = 0u32.to_le_bytes();
        let handle = self
            .command("i2c_open", CMD_I2CO, u32::from(bus), u32::from(address), &flags)
            .await?;
        debug!(
            "Opened I2C handle {} for bus {} address {:#04x}",
            handle, bus, address
        );
        self.handle = Some(handle as u32);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let handle = self.handle()?;
        self.command("i2c_write_device", CMD_I2CWD, handle, 0, data)
            .await?;
        Ok(())
    }

    async fn read(&mut self, length: usize) -> Result<Vec<u8>, TransportError> {
        let handle = self.handle()?;
        let count = self
            .command("i2c_read_device", CMD_I2CRD, handle, length as u32, &[])
            .await? as usize;

        let limit = self.timeout;
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;
        let mut data = vec![0u8; count];
        if count > 0 {
            let outcome = timeout(limit, stream.read_exact(&mut data)).await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(self.abandon(e.into())),
                Err(_) => {
                    return Err(self.abandon(TransportError::Timeout {
                        operation: "i2c_read_device",
                        timeout: limit,
                    }))
                }
            }
        }

        if count != length {
            return Err(TransportError::ShortRead {
                expected: length,
                actual: count,
            });
        }
        Ok(data)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let result = match self.handle.take() {
            Some(handle) => self
                .command("i2c_close", CMD_I2CC, handle, 0, &[])
                .await
                .map(|_| debug!("Closed I2C handle {}", handle)),
            None => Ok(()),
        };

        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("pigpio socket shutdown failed: {}", e);
            }
        }
        result
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn transport_type(&self) -> &str {
        "pigpio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_layout() {
        let frame = encode_request(CMD_I2CWD, 3, 0, &[0x02, 0x02]);
        assert_eq!(frame.len(), 18);
        assert_eq!(&frame[0..4], &57u32.to_le_bytes());
        assert_eq!(&frame[4..8], &3u32.to_le_bytes());
        assert_eq!(&frame[8..12], &0u32.to_le_bytes());
        assert_eq!(&frame[12..16], &2u32.to_le_bytes());
        assert_eq!(&frame[16..], &[0x02, 0x02]);
    }

    #[test]
    fn test_negative_result_is_error_code() {
        let mut response = [0u8; FRAME_LEN];
        response[12..16].copy_from_slice(&(-25i32).to_le_bytes());
        assert_eq!(decode_result(&response), -25);
    }

    #[tokio::test]
    async fn test_operations_require_open_handle() {
        let mut transport = PigpioTransport::new("127.0.0.1", DEFAULT_PIGPIO_PORT);
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(&[0x01, 0x04]).await,
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.read(3).await,
            Err(TransportError::NotOpen)
        ));
        // Closing a transport that was never opened is harmless
        assert!(transport.close().await.is_ok());
    }
}
