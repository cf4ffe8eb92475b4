// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{io, net::SocketAddr, time::Duration};

use super::Context;

use crate::{client::tcp::connect_unit as async_connect_unit, unit::Unit};

/// Establish a direct connection to a Modbus TCP coupler.
pub fn connect(socket_addr: SocketAddr) -> io::Result<Context> {
    connect_unit(socket_addr, Unit::tcp_device())
}

/// Connect to any kind of Modbus unit, probably through a Modbus TCP
/// gateway that is forwarding messages to/from the corresponding unit.
pub fn connect_unit(socket_addr: SocketAddr, unit: Unit) -> io::Result<Context> {
    connect_unit_with_timeout(socket_addr, unit, None)
}

/// Connect to any kind of Modbus unit with a timeout.
///
/// The timeout bounds connecting and every subsequent operation of the
/// returned context. `None` blocks indefinitely.
pub fn connect_unit_with_timeout(
    socket_addr: SocketAddr,
    unit: Unit,
    timeout: Option<Duration>,
) -> io::Result<Context> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let async_ctx = runtime.block_on(async {
        let task = async_connect_unit(socket_addr, unit);
        match timeout {
            Some(duration) => tokio::time::timeout(duration, task)
                .await
                .unwrap_or_else(|_elapsed| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("Connecting to {socket_addr} timed out"),
                    ))
                }),
            None => task.await,
        }
    })?;
    Ok(Context {
        runtime,
        async_ctx,
        timeout,
    })
}
