// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions between raw register words and their signed, unsigned
//! and textual representations.

use thiserror::Error;

use crate::{Address, ExceptionCode, Quantity, Word};

const INT16_MIN: i64 = i16::MIN as i64;
const INT16_MAX: i64 = i16::MAX as i64;
const UINT16_MAX: i64 = u16::MAX as i64;

/// A number or text that does not denote a valid register address or value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("not an integer: {0:?}")]
    NotAnInteger(String),

    #[error("{value} is out of range [{min}, {max}]")]
    OutOfBounds { value: i64, min: i64, max: i64 },

    #[error("{count} registers exceed the limit of {limit} per request")]
    TooManyRegisters { count: usize, limit: Quantity },
}

fn check_bounds(value: i64, min: i64, max: i64) -> Result<i64, RangeError> {
    if value < min || value > max {
        return Err(RangeError::OutOfBounds { value, min, max });
    }
    Ok(value)
}

/// Reinterprets an unsigned 16 bit value as signed 16 bit value.
///
/// # Errors
///
/// Fails if `value` is outside of `[0, 65535]`.
#[allow(clippy::cast_possible_truncation)]
pub fn uint16_to_int16(value: i64) -> Result<i16, RangeError> {
    let value = check_bounds(value, 0, UINT16_MAX)?;
    let value = if value > INT16_MAX {
        value - 65536
    } else {
        value
    };
    // Within [-32768, 32767] after the adjustment above.
    Ok(value as i16)
}

/// Reinterprets a signed 16 bit value as unsigned 16 bit value.
///
/// # Errors
///
/// Fails if `value` is outside of `[-32768, 32767]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn int16_to_uint16(value: i64) -> Result<u16, RangeError> {
    let value = check_bounds(value, INT16_MIN, INT16_MAX)?;
    let value = if value < 0 { value + 65536 } else { value };
    Ok(value as u16)
}

/// Two's-complement view of a register word.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn word_to_int16(word: Word) -> i16 {
    word as i16
}

fn byte_to_display_char(byte: u8) -> Option<char> {
    // Control characters are suppressed, everything else maps to ISO-8859-1.
    (byte >= 0x20).then(|| char::from(byte))
}

/// Renders the high and the low byte of a register word as characters
/// separated by a single space.
#[must_use]
pub fn word_to_display_chars(word: Word) -> String {
    let [hi, lo] = word.to_be_bytes();
    let mut chars = String::with_capacity(3);
    chars.extend(byte_to_display_char(hi));
    chars.push(' ');
    chars.extend(byte_to_display_char(lo));
    chars
}

/// See [`word_to_display_chars`].
///
/// # Errors
///
/// Fails if `value` is outside of `[0, 65535]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn uint16_to_display_chars(value: i64) -> Result<String, RangeError> {
    let value = check_bounds(value, 0, UINT16_MAX)?;
    Ok(word_to_display_chars(value as Word))
}

fn parse_integer(text: &str, radix: u32) -> Result<i64, RangeError> {
    i64::from_str_radix(text, radix).map_err(|_| RangeError::NotAnInteger(text.to_owned()))
}

/// Parses a decimal register address.
///
/// # Errors
///
/// Fails if `text` is not a decimal integer or outside of `[0, 65535]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_address(text: &str) -> Result<Address, RangeError> {
    let address = check_bounds(parse_integer(text.trim(), 10)?, 0, UINT16_MAX)?;
    Ok(address as Address)
}

/// Parses a register value given either as decimal or, prefixed with `0x`,
/// as hexadecimal number.
///
/// Negative numbers are stored in their two's-complement form.
///
/// # Errors
///
/// Fails if `text` is not an integer or the result is outside of
/// `[0, 65535]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_value(text: &str) -> Result<Word, RangeError> {
    let text = text.trim();
    let value = match text.strip_prefix("0x") {
        Some(hex) if hex.starts_with(['+', '-']) => {
            return Err(RangeError::NotAnInteger(text.to_owned()));
        }
        Some(hex) => parse_integer(hex, 16)?,
        None => parse_integer(text, 10)?,
    };
    if value < 0 {
        return int16_to_uint16(value);
    }
    let value = check_bounds(value, 0, UINT16_MAX)?;
    Ok(value as Word)
}

/// Resolves a Modbus exception code to its label.
///
/// Any code outside of the predefined ones, including negative or huge
/// numbers, is labeled as unknown.
#[must_use]
pub fn exception_code_to_label(code: i64) -> &'static str {
    u8::try_from(code)
        .map(ExceptionCode::new)
        .unwrap_or(ExceptionCode::Custom(0))
        .label()
}
