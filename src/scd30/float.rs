// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airdata project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Decoding of the IEEE-754 values packed in measurement responses
//!
//! The SCD30 transmits each float as two CRC-protected words, most
//! significant word first. Once the checksums are stripped the four payload
//! bytes form a big-endian `f32`.

use super::crc::RawWord;
use super::error::Scd30Error;

/// Payload bytes making up one float
pub const FLOAT_PAYLOAD_LEN: usize = 4;
/// Words making up one float
pub const WORDS_PER_FLOAT: usize = 2;

/// Reinterpret the first four payload bytes as a big-endian `f32`.
///
/// No rounding takes place: the bit pattern is preserved exactly.
///
/// # Examples
///
/// ```
/// use rust_airdata::scd30::float::decode_float;
///
/// assert_eq!(decode_float(&[0x43, 0xC8, 0x00, 0x00]).unwrap(), 400.0);
/// ```
pub fn decode_float(payload: &[u8]) -> Result<f32, Scd30Error> {
    match payload.get(..FLOAT_PAYLOAD_LEN) {
        Some(bytes) => Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(Scd30Error::MalformedFloatEncoding {
            length: payload.len(),
        }),
    }
}

/// Decode a float from its high word followed by its low word.
///
/// The words are expected to be checksum-validated already.
pub fn decode_words(words: &[RawWord]) -> Result<f32, Scd30Error> {
    let payload: Vec<u8> = words
        .iter()
        .take(WORDS_PER_FLOAT)
        .flat_map(|word| word.payload())
        .collect();
    decode_float(&payload)
}

/// Split a float into the two words the sensor would send for it
pub fn encode_words(value: f32) -> [RawWord; 2] {
    let bytes = value.to_be_bytes();
    [
        RawWord::new([bytes[0], bytes[1]]),
        RawWord::new([bytes[2], bytes[3]]),
    ]
}
