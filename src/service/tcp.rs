// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, io};

use futures_util::{FutureExt as _, SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Framed;

use crate::{
    codec,
    error::ProtocolError,
    frame::{tcp::*, *},
    transaction::{Transaction, TransactionIds},
    unit::*,
    Result,
};

/// Modbus TCP client
#[derive(Debug)]
pub(crate) struct Client<T> {
    framed: Framed<T, codec::tcp::ClientCodec>,
    unit_id: UnitId,
    transaction_ids: TransactionIds,
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(transport: T, unit: Unit) -> Self {
        let framed = Framed::new(transport, codec::tcp::ClientCodec::default());
        Self {
            framed,
            unit_id: unit.into(),
            transaction_ids: TransactionIds::new(),
        }
    }

    fn next_request_hdr(&mut self) -> Header {
        Header {
            transaction_id: self.transaction_ids.next_id(),
            unit_id: self.unit_id,
        }
    }

    pub(crate) async fn call(&mut self, req: Request<'_>) -> Result<Response> {
        log::debug!("Call {:?}", req);
        let transaction = Transaction::new(self.next_request_hdr(), &req);
        let req_adu = RequestAdu {
            hdr: transaction.header(),
            pdu: req.into(),
        };

        // Leftovers of a previous exchange must not be taken for the response.
        self.framed.read_buffer_mut().clear();

        self.framed.send(req_adu).await?;
        let res_adu = match self.framed.next().await {
            Some(Ok(res_adu)) => res_adu,
            Some(Err(err)) if err.kind() == io::ErrorKind::InvalidData => {
                // Framed ends the stream once after a decoding error. Consume
                // that end so the next request reads from the transport again.
                let _ = self.framed.next().now_or_never();
                return Err(ProtocolError::MalformedResponse(err.to_string()).into());
            }
            Some(Err(err)) => return Err(err.into()),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Connection closed before a response arrived",
                )
                .into());
            }
        };
        log::debug!("Response {:?}", res_adu);

        transaction.resolve(res_adu)
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        let res = self.framed.get_mut().shutdown().await;
        match res {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => {
                log::debug!("Transport already disconnected: {err}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl<T> UnitContext for Client<T> {
    fn set_unit(&mut self, unit: Unit) {
        self.unit_id = unit.into();
    }
}

#[async_trait::async_trait]
impl<T> crate::client::Client for Client<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, req: Request<'_>) -> Result<Response> {
        Client::call(self, req).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        Client::disconnect(self).await
    }
}
