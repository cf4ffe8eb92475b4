// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation of requests and responses.

use crate::{
    error::ProtocolError,
    frame::{tcp::*, *},
    Result,
};

/// Source of transaction identifiers for one client.
///
/// Identifiers cycle through `1..=255`, the first one issued is `1` and
/// `0` is never issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionIds {
    current: u8,
}

impl TransactionIds {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    /// Continue the sequence after `current`.
    #[must_use]
    pub const fn starting_at(current: u8) -> Self {
        Self { current }
    }

    /// The most recently issued identifier, `0` before the first one.
    #[must_use]
    pub const fn current(&self) -> TransactionId {
        self.current as TransactionId
    }

    pub fn next_id(&mut self) -> TransactionId {
        self.current = if self.current < u8::MAX {
            self.current + 1
        } else {
            1
        };
        self.current()
    }
}

/// What a valid response to a request looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expectation {
    Registers(Quantity),
    Echo(Response),
}

impl Expectation {
    fn of(request: &Request<'_>) -> Self {
        match request {
            Request::ReadHoldingRegisters(_, quantity) => Self::Registers(*quantity),
            Request::WriteSingleRegister(address, word) => {
                Self::Echo(Response::WriteSingleRegister(*address, *word))
            }
            Request::WriteMultipleRegisters(address, words) => {
                let quantity = Quantity::try_from(words.len()).unwrap_or(Quantity::MAX);
                Self::Echo(Response::WriteMultipleRegisters(*address, quantity))
            }
        }
    }
}

/// A single outstanding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transaction {
    hdr: Header,
    function: FunctionCode,
    expectation: Expectation,
}

impl Transaction {
    pub(crate) fn new(hdr: Header, request: &Request<'_>) -> Self {
        Self {
            hdr,
            function: request.function_code(),
            expectation: Expectation::of(request),
        }
    }

    pub(crate) const fn header(&self) -> Header {
        self.hdr
    }

    /// Validates `adu` against the request and extracts its outcome.
    pub(crate) fn resolve(&self, adu: ResponseAdu) -> Result<Response> {
        let ResponseAdu { hdr, pdu } = adu;
        if hdr.transaction_id != self.hdr.transaction_id {
            return Err(ProtocolError::TransactionIdMismatch {
                expected: self.hdr.transaction_id,
                actual: hdr.transaction_id,
            }
            .into());
        }
        if hdr.unit_id != self.hdr.unit_id {
            log::debug!(
                "Response from unit {} to request for unit {}",
                hdr.unit_id,
                self.hdr.unit_id
            );
        }
        let response = match pdu.map_err(ProtocolError::MalformedResponse)?.0 {
            Ok(response) => response,
            Err(ExceptionResponse {
                function,
                exception,
            }) => {
                if function != self.function {
                    return Err(ProtocolError::FunctionCodeMismatch {
                        expected: self.function,
                        actual: function,
                    }
                    .into());
                }
                log::debug!("Exception response: {exception}");
                return Ok(Err(exception));
            }
        };
        let function = response.function_code();
        if function != self.function {
            return Err(ProtocolError::FunctionCodeMismatch {
                expected: self.function,
                actual: function,
            }
            .into());
        }
        match (&self.expectation, &response) {
            (Expectation::Registers(quantity), Response::ReadHoldingRegisters(words)) => {
                let expected = usize::from(*quantity);
                if words.len() != expected {
                    return Err(ProtocolError::ByteCountMismatch {
                        expected: expected * 2,
                        actual: words.len() * 2,
                    }
                    .into());
                }
            }
            (Expectation::Echo(echo), response) => {
                if echo != response {
                    return Err(ProtocolError::UnexpectedEcho {
                        response: response.clone(),
                    }
                    .into());
                }
            }
            (Expectation::Registers(_), response) => {
                return Err(ProtocolError::UnexpectedEcho {
                    response: response.clone(),
                }
                .into());
            }
        }
        Ok(Ok(response))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use crate::{Error, ExceptionCode};

    use super::*;

    fn header(transaction_id: TransactionId) -> Header {
        Header {
            transaction_id,
            unit_id: 1,
        }
    }

    fn response_adu(transaction_id: TransactionId, pdu: impl Into<ResponsePdu>) -> ResponseAdu {
        ResponseAdu {
            hdr: header(transaction_id),
            pdu: Ok(pdu.into()),
        }
    }

    #[test]
    fn first_transaction_id_is_one() {
        let mut ids = TransactionIds::new();
        assert_eq!(ids.current(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn transaction_ids_wrap_around_without_zero() {
        let mut ids = TransactionIds::new();
        for expected in 1..=255 {
            assert_eq!(ids.next_id(), expected);
        }
        assert_eq!(ids.current(), 255);
        assert_eq!(ids.next_id(), 1);
        let mut ids = TransactionIds::starting_at(254);
        assert_eq!(ids.next_id(), 255);
        assert_eq!(ids.next_id(), 1);
        for _ in 0..1000 {
            assert_ne!(ids.next_id(), 0);
        }
    }

    #[test]
    fn resolve_read_response() {
        let transaction = Transaction::new(header(1), &Request::ReadHoldingRegisters(0, 3));
        let rsp = transaction
            .resolve(response_adu(
                1,
                Response::ReadHoldingRegisters(vec![0, 1234, 65535]),
            ))
            .unwrap()
            .unwrap();
        assert_eq!(rsp, Response::ReadHoldingRegisters(vec![0, 1234, 65535]));
    }

    #[test]
    fn reject_stale_transaction_id() {
        let transaction = Transaction::new(header(2), &Request::ReadHoldingRegisters(0, 1));
        let err = transaction
            .resolve(response_adu(1, Response::ReadHoldingRegisters(vec![42])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::TransactionIdMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn ignore_unit_id_of_response() {
        let transaction = Transaction::new(header(7), &Request::WriteSingleRegister(17, 42));
        let adu = ResponseAdu {
            hdr: Header {
                transaction_id: 7,
                unit_id: 99,
            },
            pdu: Ok(Response::WriteSingleRegister(17, 42).into()),
        };
        assert!(transaction.resolve(adu).unwrap().is_ok());
    }

    #[test]
    fn reject_malformed_response() {
        let transaction = Transaction::new(header(8), &Request::WriteSingleRegister(17, 42));
        let adu = ResponseAdu {
            hdr: header(8),
            pdu: Err("Truncated response PDU".to_owned()),
        };
        let err = transaction.resolve(adu.clone()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MalformedResponse(ref reason))
                if reason == "Truncated response PDU"
        ));

        // A stale response is rejected as such, decodable or not
        let err = Transaction::new(header(9), &Request::WriteSingleRegister(17, 42))
            .resolve(adu)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::TransactionIdMismatch {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn resolve_exception_response() {
        let transaction = Transaction::new(header(3), &Request::ReadHoldingRegisters(0, 3));
        let rsp = transaction
            .resolve(response_adu(
                3,
                ExceptionResponse {
                    function: FunctionCode::ReadHoldingRegisters,
                    exception: ExceptionCode::IllegalDataAddress,
                },
            ))
            .unwrap();
        assert_eq!(rsp, Err(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn reject_exception_for_other_function() {
        let transaction = Transaction::new(header(3), &Request::ReadHoldingRegisters(0, 3));
        let err = transaction
            .resolve(response_adu(
                3,
                ExceptionResponse {
                    function: FunctionCode::WriteSingleRegister,
                    exception: ExceptionCode::IllegalDataAddress,
                },
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::FunctionCodeMismatch {
                expected: FunctionCode::ReadHoldingRegisters,
                actual: FunctionCode::WriteSingleRegister,
            })
        ));
    }

    #[test]
    fn reject_mismatching_function_code() {
        let transaction = Transaction::new(header(4), &Request::ReadHoldingRegisters(0, 1));
        let err = transaction
            .resolve(response_adu(4, Response::WriteSingleRegister(0, 1)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::FunctionCodeMismatch {
                expected: FunctionCode::ReadHoldingRegisters,
                actual: FunctionCode::WriteSingleRegister,
            })
        ));

        let err = transaction
            .resolve(response_adu(
                4,
                Response::Custom(0x04, vec![0x02, 0x00, 0x01].into()),
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::FunctionCodeMismatch {
                actual: FunctionCode::Custom(0x04),
                ..
            })
        ));
    }

    #[test]
    fn reject_wrong_register_count() {
        let transaction = Transaction::new(header(5), &Request::ReadHoldingRegisters(0, 3));
        let err = transaction
            .resolve(response_adu(5, Response::ReadHoldingRegisters(vec![1, 2])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ByteCountMismatch {
                expected: 6,
                actual: 4
            })
        ));
    }

    #[test]
    fn validate_write_echo() {
        let words = [1, 2, 3];
        let transaction = Transaction::new(
            header(6),
            &Request::WriteMultipleRegisters(100, Cow::Borrowed(&words)),
        );
        assert_eq!(
            transaction
                .resolve(response_adu(6, Response::WriteMultipleRegisters(100, 3)))
                .unwrap(),
            Ok(Response::WriteMultipleRegisters(100, 3))
        );
        let err = transaction
            .resolve(response_adu(6, Response::WriteMultipleRegisters(100, 2)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedEcho { .. })
        ));

        let transaction = Transaction::new(header(7), &Request::WriteSingleRegister(17, 42));
        let err = transaction
            .resolve(response_adu(7, Response::WriteSingleRegister(17, 43)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedEcho {
                response: Response::WriteSingleRegister(17, 43)
            })
        ));
    }
}
