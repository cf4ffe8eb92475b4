// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Register group expressions.
//!
//! A read group is either a single address (`"40123"`) or an inclusive range
//! of addresses (`"1-10"`). A write group assigns one or more values to
//! consecutive registers, starting at an address (`"17=42"`, `"17=0x2A;-1"`).

use std::fmt;

use crate::{
    value::{parse_address, parse_value, RangeError},
    Address, Quantity, Word, MAX_READ_QUANTITY, MAX_WRITE_QUANTITY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadGroup {
    pub start: Address,
    pub quantity: Quantity,
}

impl fmt::Display for ReadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quantity == 1 {
            return write!(f, "{}", self.start);
        }
        let end = u32::from(self.start) + u32::from(self.quantity) - 1;
        write!(f, "{}-{}", self.start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteGroup {
    pub address: Address,
    pub values: Vec<Word>,
}

/// The registers read for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadoutResult {
    pub start: Address,
    pub quantity: Quantity,
    pub values: Vec<Word>,
}

pub type ReadoutResultSet = Vec<ReadoutResult>;

/// Splits a comma separated list of groups.
pub fn split_groups(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim)
}

/// Parses a read group.
///
/// Returns `Ok(None)` if `text` has neither the shape of a single address
/// nor of a range.
///
/// # Errors
///
/// Fails if an address is invalid or the range spans more than
/// [`MAX_READ_QUANTITY`] registers.
pub fn parse_read_group(text: &str) -> Result<Option<ReadGroup>, RangeError> {
    let tokens: Vec<_> = text.split('-').collect();
    let (start, end) = match tokens[..] {
        [""] => return Ok(None),
        [address] => {
            let address = parse_address(address)?;
            (address, address)
        }
        [first, second] => {
            let first = parse_address(first)?;
            let second = parse_address(second)?;
            (first.min(second), first.max(second))
        }
        _ => return Ok(None),
    };
    let count = usize::from(end - start) + 1;
    let quantity = Quantity::try_from(count)
        .ok()
        .filter(|quantity| *quantity <= MAX_READ_QUANTITY)
        .ok_or(RangeError::TooManyRegisters {
            count,
            limit: MAX_READ_QUANTITY,
        })?;
    Ok(Some(ReadGroup { start, quantity }))
}

/// Parses a write group.
///
/// Returns `Ok(None)` unless `text` contains exactly one `=`.
///
/// # Errors
///
/// Fails if the address or one of the values is invalid or if there are
/// more than [`MAX_WRITE_QUANTITY`] values.
pub fn parse_write_group(text: &str) -> Result<Option<WriteGroup>, RangeError> {
    let Some((address, values)) = text.split_once('=') else {
        return Ok(None);
    };
    if values.contains('=') {
        return Ok(None);
    }
    let address = parse_address(address)?;
    let values = values
        .split(';')
        .map(parse_value)
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() > usize::from(MAX_WRITE_QUANTITY) {
        return Err(RangeError::TooManyRegisters {
            count: values.len(),
            limit: MAX_WRITE_QUANTITY,
        });
    }
    Ok(Some(WriteGroup { address, values }))
}
