// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CRC-8 protection of SCD30 data words
//!
//! Every 16-bit word exchanged with the SCD30 is followed by a checksum byte
//! computed with the Sensirion CRC-8: polynomial 0x31 (x⁸ + x⁵ + x⁴ + 1),
//! initial value 0xFF, no reflection, no final XOR.

use log::{debug, error};

use super::error::Scd30Error;

/// CRC-8 generator polynomial (0x131 with the leading bit implicit)
pub const CRC8_POLYNOMIAL: u8 = 0x31;
/// CRC-8 initial value
pub const CRC8_INIT: u8 = 0xFF;
/// Number of payload bytes covered by one checksum
pub const WORD_PAYLOAD_LEN: usize = 2;
/// Size of a word on the wire (payload + checksum)
pub const RAW_WORD_LEN: usize = 3;

fn crc8_update(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Compute the checksum of one two-byte word.
///
/// # Errors
///
/// Returns [`Scd30Error::InvalidLength`] when `data` is not exactly two bytes.
///
/// # Examples
///
/// ```
/// use rust_airdata::scd30::crc::crc8;
///
/// assert_eq!(crc8(&[0xBE, 0xEF]).unwrap(), 0x92);
/// ```
pub fn crc8(data: &[u8]) -> Result<u8, Scd30Error> {
    if data.len() != WORD_PAYLOAD_LEN {
        return Err(Scd30Error::InvalidLength {
            expected: WORD_PAYLOAD_LEN,
            actual: data.len(),
        });
    }
    Ok(crc8_update(data))
}

/// One word as transported on the bus: big-endian payload followed by its CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawWord {
    /// Most significant payload byte
    pub msb: u8,
    /// Least significant payload byte
    pub lsb: u8,
    /// Checksum byte as received
    pub crc: u8,
}

impl RawWord {
    /// Build a word around a payload, computing the matching checksum
    pub fn new(payload: [u8; 2]) -> Self {
        Self {
            msb: payload[0],
            lsb: payload[1],
            crc: crc8_update(&payload),
        }
    }

    /// Build a word from a 16-bit value
    pub fn from_u16(value: u16) -> Self {
        Self::new(value.to_be_bytes())
    }

    /// Take a word from the first three bytes of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Scd30Error> {
        if bytes.len() < RAW_WORD_LEN {
            return Err(Scd30Error::InvalidLength {
                expected: RAW_WORD_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            msb: bytes[0],
            lsb: bytes[1],
            crc: bytes[2],
        })
    }

    pub fn payload(&self) -> [u8; 2] {
        [self.msb, self.lsb]
    }

    pub fn value(&self) -> u16 {
        u16::from_be_bytes(self.payload())
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [self.msb, self.lsb, self.crc]
    }

    /// Checksum the payload should carry
    pub fn expected_crc(&self) -> u8 {
        crc8_update(&self.payload())
    }

    pub fn is_valid(&self) -> bool {
        self.expected_crc() == self.crc
    }
}

/// Returns true iff the third byte of `word` is the CRC of its first two.
pub fn validate(word: &RawWord) -> bool {
    word.is_valid()
}

/// Split a response into words and check every checksum.
///
/// The response length must be a multiple of three. The first word whose
/// checksum does not match aborts the whole response.
pub fn split_words(data: &[u8]) -> Result<Vec<RawWord>, Scd30Error> {
    if data.len() % RAW_WORD_LEN != 0 {
        return Err(Scd30Error::InvalidLength {
            expected: data.len().div_ceil(RAW_WORD_LEN) * RAW_WORD_LEN,
            actual: data.len(),
        });
    }

    let mut words = Vec::with_capacity(data.len() / RAW_WORD_LEN);
    for (index, chunk) in data.chunks_exact(RAW_WORD_LEN).enumerate() {
        let word = RawWord::from_slice(chunk)?;
        if word.is_valid() {
            debug!(
                "{}: crc {:#04x} of {:#04x}{:02x} OK",
                index, word.crc, word.msb, word.lsb
            );
        } else {
            error!(
                "{}: crc {:#04x} of {:#04x}{:02x} NOK, should be {:#04x}",
                index,
                word.crc,
                word.msb,
                word.lsb,
                word.expected_crc()
            );
            return Err(Scd30Error::Checksum {
                index,
                expected: word.expected_crc(),
                received: word.crc,
            });
        }
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]).unwrap(), 0x92);
    }

    #[test]
    fn test_datasheet_vectors() {
        // Interval of 2 s and pressure argument examples from the interface description
        assert_eq!(crc8(&[0x00, 0x02]).unwrap(), 0xE3);
        assert_eq!(crc8(&[0x00, 0x00]).unwrap(), 0x81);
    }

    #[test]
    fn test_invalid_length() {
        assert!(matches!(
            crc8(&[0x01]),
            Err(Scd30Error::InvalidLength {
                expected: 2,
                actual: 1
            })
        ));
        assert!(crc8(&[0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn test_validate_detects_every_single_bit_flip() {
        for value in [0x0000u16, 0x43C8, 0xBEEF, 0xFFFF, 0x1234] {
            let word = RawWord::from_u16(value);
            assert!(validate(&word));

            for bit in 0..16 {
                let corrupted = value ^ (1 << bit);
                let flipped = RawWord {
                    msb: (corrupted >> 8) as u8,
                    lsb: corrupted as u8,
                    crc: word.crc,
                };
                assert!(
                    !validate(&flipped),
                    "flip of bit {} in {:#06x} went undetected",
                    bit,
                    value
                );
            }
        }
    }

    #[test]
    fn test_split_words_rejects_bad_checksum() {
        let mut data = Vec::new();
        data.extend_from_slice(&RawWord::from_u16(0x43C8).to_bytes());
        data.extend_from_slice(&RawWord::from_u16(0x0000).to_bytes());
        assert_eq!(split_words(&data).unwrap().len(), 2);

        data[5] ^= 0x01;
        assert!(matches!(
            split_words(&data),
            Err(Scd30Error::Checksum { index: 1, .. })
        ));
    }

    #[test]
    fn test_split_words_rejects_partial_word() {
        assert!(matches!(
            split_words(&[0x00, 0x01, 0x02, 0x03]),
            Err(Scd30Error::InvalidLength { actual: 4, .. })
        ));
    }
}
