// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus context access

pub mod tcp;

use std::{future::Future, io, time::Duration};

use crate::{frame::*, unit::*, Error, Result};

use super::{
    Client as AsyncClient, Context as AsyncContext, Reader as AsyncReader, Writer as AsyncWriter,
};

fn block_on_with_timeout<T, E>(
    runtime: &tokio::runtime::Runtime,
    timeout: Option<Duration>,
    task: impl Future<Output = std::result::Result<T, E>>,
) -> std::result::Result<T, E>
where
    E: From<Error>,
{
    let Some(timeout) = timeout else {
        return runtime.block_on(task);
    };
    runtime.block_on(async move {
        tokio::time::timeout(timeout, task)
            .await
            .unwrap_or_else(|_elapsed| Err(Error::Timeout(timeout).into()))
    })
}

/// A transport independent synchronous client trait.
pub trait Client: UnitContext {
    /// Invokes a _Modbus_ function.
    fn call(&mut self, req: Request<'_>) -> Result<Response>;
}

/// A transport independent synchronous reader trait.
pub trait Reader: Client {
    /// Read multiple holding registers (0x03)
    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;
}

/// A transport independent synchronous writer trait.
pub trait Writer: Client {
    /// Write a single holding register (0x06)
    fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple holding registers (0x10)
    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;
}

/// A synchronous Modbus client context.
#[derive(Debug)]
pub struct Context {
    runtime: tokio::runtime::Runtime,
    async_ctx: AsyncContext,
    timeout: Option<Duration>,
}

impl Context {
    /// Returns the current timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a timeout duration for all subsequent operations.
    ///
    /// The timeout is disabled by passing `None`.
    pub fn set_timeout(&mut self, duration: impl Into<Option<Duration>>) {
        self.timeout = duration.into();
    }

    /// Disables the timeout for all subsequent operations.
    pub fn reset_timeout(&mut self) {
        self.timeout = None;
    }

    /// Closes the connection.
    ///
    /// Bounded by the configured timeout like every other operation.
    pub fn disconnect(&mut self) -> io::Result<()> {
        let Self {
            runtime,
            async_ctx,
            timeout,
        } = self;
        let Some(timeout) = *timeout else {
            return runtime.block_on(async_ctx.disconnect());
        };
        runtime.block_on(async move {
            tokio::time::timeout(timeout, async_ctx.disconnect())
                .await
                .unwrap_or_else(|_elapsed| Err(io::ErrorKind::TimedOut.into()))
        })
    }
}

impl Client for Context {
    fn call(&mut self, req: Request<'_>) -> Result<Response> {
        block_on_with_timeout(&self.runtime, self.timeout, self.async_ctx.call(req))
    }
}

impl UnitContext for Context {
    fn set_unit(&mut self, unit: Unit) {
        self.async_ctx.set_unit(unit);
    }
}

impl Reader for Context {
    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.read_holding_registers(addr, cnt),
        )
    }
}

impl Writer for Context {
    fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_single_register(addr, word),
        )
    }

    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        block_on_with_timeout(
            &self.runtime,
            self.timeout,
            self.async_ctx.write_multiple_registers(addr, words),
        )
    }
}
