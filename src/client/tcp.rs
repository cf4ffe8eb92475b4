// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP client connections

use std::{fmt, io, net::SocketAddr};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use super::*;

/// Establish a direct connection to a Modbus TCP coupler.
pub async fn connect(socket_addr: SocketAddr) -> io::Result<Context> {
    connect_unit(socket_addr, Unit::tcp_device()).await
}

/// Connect to a physical or custom Modbus device,
/// probably through a Modbus TCP gateway that is forwarding
/// messages to/from the corresponding unit.
pub async fn connect_unit(socket_addr: SocketAddr, unit: Unit) -> io::Result<Context> {
    log::debug!("Connecting to {socket_addr}");
    let transport = TcpStream::connect(socket_addr).await?;
    transport.set_nodelay(true)?;
    Ok(attach_unit(transport, unit))
}

/// Attach a new client context to a direct transport connection.
pub fn attach<T>(transport: T) -> Context
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    attach_unit(transport, Unit::tcp_device())
}

/// Attach a new client context to a transport connection.
pub fn attach_unit<T>(transport: T, unit: Unit) -> Context
where
    T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug + 'static,
{
    let client = crate::service::tcp::Client::new(transport, unit);
    Context {
        client: Box::new(client),
    }
}
