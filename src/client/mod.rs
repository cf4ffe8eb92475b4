// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus TCP clients

use std::{borrow::Cow, fmt::Debug, io};

use async_trait::async_trait;

use crate::{frame::*, unit::*, Result};

pub mod tcp;

#[cfg(feature = "sync")]
pub mod sync;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: UnitContext + Send + Debug {
    /// Invokes a _Modbus_ function.
    async fn call(&mut self, request: Request<'_>) -> Result<Response>;

    /// Disconnects the client.
    ///
    /// Permanently disconnects the client by shutting down the
    /// underlying stream in a graceful manner.
    ///
    /// Dropping the client without explicitly disconnecting it
    /// beforehand also closes the connection.
    async fn disconnect(&mut self) -> io::Result<()>;
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple holding registers (0x03)
    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;
}

/// Asynchronous Modbus writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single holding register (0x06)
    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple holding registers (0x10)
    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;
}

/// Asynchronous Modbus client context
#[derive(Debug)]
pub struct Context {
    client: Box<dyn Client>,
}

impl From<Box<dyn Client>> for Context {
    fn from(client: Box<dyn Client>) -> Self {
        Self { client }
    }
}

impl From<Context> for Box<dyn Client> {
    fn from(val: Context) -> Self {
        val.client
    }
}

#[async_trait]
impl Client for Context {
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        self.client.call(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.client.disconnect().await
    }
}

impl UnitContext for Context {
    fn set_unit(&mut self, unit: Unit) {
        self.client.set_unit(unit);
    }
}

#[async_trait]
impl Reader for Context {
    async fn read_holding_registers<'a>(
        &'a mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<Word>> {
        self.client
            .call(Request::ReadHoldingRegisters(addr, cnt))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::ReadHoldingRegisters(words) => {
                        debug_assert_eq!(words.len(), cnt.into());
                        words
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }
}

#[async_trait]
impl Writer for Context {
    async fn write_single_register<'a>(&'a mut self, addr: Address, word: Word) -> Result<()> {
        self.client
            .call(Request::WriteSingleRegister(addr, word))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteSingleRegister(rsp_addr, rsp_word) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(word, rsp_word);
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn write_multiple_registers<'a>(
        &'a mut self,
        addr: Address,
        data: &[Word],
    ) -> Result<()> {
        let cnt = data.len();
        self.client
            .call(Request::WriteMultipleRegisters(addr, Cow::Borrowed(data)))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteMultipleRegisters(rsp_addr, rsp_cnt) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(cnt, rsp_cnt.into());
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, ExceptionCode, Result};

    use super::*;
    use std::{io, sync::Mutex};

    #[derive(Default, Debug)]
    pub(crate) struct ClientMock {
        unit: Option<Unit>,
        last_request: Mutex<Option<Request<'static>>>,
        next_response: Option<Result<Response>>,
    }

    impl ClientMock {
        pub(crate) fn unit(&self) -> Option<Unit> {
            self.unit
        }

        pub(crate) fn last_request(&self) -> &Mutex<Option<Request<'static>>> {
            &self.last_request
        }

        pub(crate) fn set_next_response(&mut self, next_response: Result<Response>) {
            self.next_response = Some(next_response);
        }
    }

    #[async_trait]
    impl Client for ClientMock {
        async fn call(&mut self, request: Request<'_>) -> Result<Response> {
            *self.last_request.lock().unwrap() = Some(request.into_owned());
            match self.next_response.take().unwrap() {
                Ok(response) => Ok(response),
                Err(Error::Transport(err)) => {
                    Err(io::Error::new(err.kind(), format!("{err}")).into())
                }
                Err(err) => Err(err),
            }
        }

        async fn disconnect(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl UnitContext for ClientMock {
        fn set_unit(&mut self, unit: Unit) {
            self.unit = Some(unit);
        }
    }

    #[test]
    fn read_holding_registers() {
        let mut client = Box::<ClientMock>::default();
        client.set_next_response(Ok(Ok(Response::ReadHoldingRegisters(vec![
            0, 1234, 65535,
        ]))));
        let mut context = Context { client };
        context.set_unit(Unit(1));
        let words = futures::executor::block_on(context.read_holding_registers(0, 3))
            .unwrap()
            .unwrap();
        assert_eq!(words, [0, 1234, 65535]);
    }

    #[test]
    fn set_unit_of_inner_client() {
        let mut client = ClientMock::default();
        client.set_unit(Unit(17));
        assert_eq!(client.unit(), Some(Unit(17)));
    }

    #[test]
    fn write_multiple_registers() {
        let mut client = Box::<ClientMock>::default();
        client.set_next_response(Ok(Ok(Response::WriteMultipleRegisters(17, 2))));
        let mut context = Context { client };
        futures::executor::block_on(context.write_multiple_registers(17, &[42, 43]))
            .unwrap()
            .unwrap();
        let _: Box<dyn Client> = context.into();
    }

    #[test]
    fn write_single_register_sends_request() {
        let mut mock = ClientMock::default();
        mock.set_next_response(Ok(Ok(Response::WriteSingleRegister(17, 42))));
        futures::executor::block_on(async {
            let mut context = Context {
                client: Box::new(mock),
            };
            context.write_single_register(17, 42).await.unwrap().unwrap();
        });
    }

    #[test]
    fn last_request_is_recorded() {
        let mut mock = ClientMock::default();
        mock.set_next_response(Ok(Ok(Response::WriteSingleRegister(1, 2))));
        futures::executor::block_on(mock.call(Request::WriteSingleRegister(1, 2)))
            .unwrap()
            .unwrap();
        assert_eq!(
            *mock.last_request().lock().unwrap(),
            Some(Request::WriteSingleRegister(1, 2))
        );
    }

    #[test]
    fn forward_exception() {
        let mut client = Box::<ClientMock>::default();
        client.set_next_response(Ok(Err(ExceptionCode::IllegalDataAddress)));
        let mut context = Context { client };
        let res = futures::executor::block_on(context.read_holding_registers(40000, 3)).unwrap();
        assert_eq!(res, Err(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn forward_transport_error() {
        let mut client = Box::<ClientMock>::default();
        client.set_next_response(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone").into()));
        let mut context = Context { client };
        let err = futures::executor::block_on(context.write_single_register(1, 2)).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::BrokenPipe));
    }
}
