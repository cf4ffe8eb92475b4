// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// Raw unit identifier of the MBAP header.
pub type UnitId = u8;

/// A single byte for addressing a unit behind a Modbus TCP endpoint.
///
/// Every request waits for a response, so broadcasting to unit `0` is
/// not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Unit(pub UnitId);

impl Unit {
    /// The reserved address for sending a message to a directly
    /// connected Modbus TCP device, i.e. if not forwarded through
    /// a TCP/RTU gateway according to the unit identifier.
    pub const fn tcp_device() -> Self {
        Unit(255)
    }
}

impl From<UnitId> for Unit {
    fn from(from: UnitId) -> Self {
        Unit(from)
    }
}

impl From<Unit> for UnitId {
    fn from(from: Unit) -> Self {
        from.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:0>2X}", self.0)
    }
}

pub trait UnitContext {
    /// Select a unit for all subsequent outgoing requests.
    fn set_unit(&mut self, unit: Unit);
}
