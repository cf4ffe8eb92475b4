// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    convert::TryFrom,
    io::{self, Cursor, Error, ErrorKind},
};

use byteorder::{BigEndian, ReadBytesExt as _};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};

use crate::{
    frame::{ResponsePdu, EXCEPTION_FLAG, MAX_READ_QUANTITY, MAX_WRITE_QUANTITY},
    ExceptionCode, ExceptionResponse, FunctionCode, Request, Response,
};

pub(crate) mod tcp;

/// Maximum request/response PDU size.
const MAX_PDU_SIZE: usize = 253;

#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

/// Rejects requests that cannot be represented by a valid frame.
fn verify_request(request: &Request<'_>) -> io::Result<()> {
    use crate::frame::Request::*;
    match request {
        ReadHoldingRegisters(_, quantity) => {
            if *quantity == 0 || *quantity > MAX_READ_QUANTITY {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid read quantity: {quantity}"),
                ));
            }
        }
        WriteSingleRegister(_, _) => {}
        WriteMultipleRegisters(_, words) => {
            if words.is_empty() || words.len() > MAX_WRITE_QUANTITY.into() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("invalid write quantity: {}", words.len()),
                ));
            }
        }
    }
    Ok(())
}

fn request_pdu_size(request: &Request<'_>) -> usize {
    use crate::frame::Request::*;
    1 + match request {
        ReadHoldingRegisters(_, _) | WriteSingleRegister(_, _) => 4,
        WriteMultipleRegisters(_, words) => 5 + words.len() * 2,
    }
}

fn encode_request_pdu(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::frame::Request::*;
    buf.put_u8(request.function_code().value());
    match request {
        ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
    }
}

#[cfg(test)]
fn encode_response_pdu(buf: &mut BytesMut, response: &Response) {
    use crate::frame::Response::*;
    buf.put_u8(response.function_code().value());
    match response {
        ReadHoldingRegisters(registers) => {
            buf.put_u8(u8_len(registers.len() * 2));
            for r in registers {
                buf.put_u16(*r);
            }
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        Custom(_, custom_data) => {
            buf.put_slice(custom_data);
        }
    }
}

#[cfg(test)]
fn encode_exception_response_pdu(buf: &mut BytesMut, rsp: ExceptionResponse) {
    debug_assert!(rsp.function.value() < EXCEPTION_FLAG);
    buf.put_u8(rsp.function.exception_value());
    buf.put_u8(rsp.exception.into());
}

fn read_u16_be(reader: &mut impl io::Read) -> io::Result<u16> {
    reader.read_u16::<BigEndian>()
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Response::*;
        if bytes.len() > MAX_PDU_SIZE {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "response PDU size exceeded",
            ));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let rsp = match FunctionCode::new(fn_code) {
            FunctionCode::ReadHoldingRegisters => {
                let byte_count = rdr.read_u8()?;
                if byte_count % 2 != 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid quantity",
                    ));
                }
                let quantity = byte_count / 2;
                let mut data = Vec::with_capacity(quantity.into());
                for _ in 0..quantity {
                    data.push(read_u16_be(rdr)?);
                }
                ReadHoldingRegisters(data)
            }
            FunctionCode::WriteSingleRegister => {
                WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?)
            }
            FunctionCode::WriteMultipleRegisters => {
                WriteMultipleRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?)
            }
            FunctionCode::Custom(_) => {
                // Consume all remaining bytes as custom data.
                let mut bytes = bytes;
                return Ok(Custom(fn_code, bytes.split_off(1)));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "undecoded response data",
            ));
        }
        Ok(rsp)
    }
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let mut rdr = Cursor::new(&bytes);
        let fn_err_code = rdr.read_u8()?;
        if fn_err_code < EXCEPTION_FLAG {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Invalid exception function code",
            ));
        }
        let function = FunctionCode::new(fn_err_code - EXCEPTION_FLAG);
        let exception = ExceptionCode::new(rdr.read_u8()?);
        if rdr.has_remaining() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "undecoded exception response data",
            ));
        }
        Ok(ExceptionResponse {
            function,
            exception,
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let fn_code = Cursor::new(&bytes).read_u8()?;
        let pdu = if fn_code & EXCEPTION_FLAG == 0 {
            Response::try_from(bytes)?.into()
        } else {
            ExceptionResponse::try_from(bytes)?.into()
        };
        Ok(pdu)
    }
}
