// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A tiny [Modbus TCP](https://en.wikipedia.org/wiki/Modbus) client
//! based on [tokio](https://tokio.rs).
//!
//! Supported are the holding register functions only:
//!
//! - Read Holding Registers (0x03)
//! - Write Single Register (0x06)
//! - Write Multiple Registers (0x10)
//!
//! Every request carries a transaction identifier and the response is
//! checked against the request before it is handed out. Exceptions reported
//! by the server are returned as the inner error of [`Result`].
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "sync")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//!
//! use tinymbc::prelude::*;
//!
//! let socket_addr = "127.0.0.1:502".parse()?;
//! let mut ctx = sync::tcp::connect_unit_with_timeout(
//!     socket_addr,
//!     Unit(1),
//!     Some(Duration::from_secs(5)),
//! )?;
//! let words = ctx.read_holding_registers(0, 3)??;
//! println!("{words:?}");
//! ctx.disconnect()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sync"))]
//! # fn main() {}
//! ```

#![warn(rust_2018_idioms)]

pub mod prelude;

pub mod client;
pub mod format;
pub mod group;
#[cfg(feature = "sync")]
pub mod operation;
pub mod value;

mod codec;
mod error;
mod frame;
mod service;
mod transaction;
mod unit;

pub use self::{
    error::{Error, ProtocolError},
    frame::{
        tcp::TransactionId, Address, ExceptionCode, ExceptionResponse, FunctionCode, Quantity,
        Request, Response, Word, MAX_READ_QUANTITY, MAX_WRITE_QUANTITY,
    },
    transaction::TransactionIds,
    unit::{Unit, UnitContext, UnitId},
};

/// Specialized [`std::result::Result`] type for _Modbus_ client API results.
///
/// The outer error signals a communication failure, the inner error an
/// exception reported by the server.
pub type Result<T> = std::result::Result<std::result::Result<T, ExceptionCode>, Error>;
