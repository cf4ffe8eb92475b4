// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, ByteOrder as _};
use bytes::{BufMut as _, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{tcp::*, *};

use super::*;

const HEADER_LEN: usize = 7;

const PROTOCOL_ID: u16 = 0x0000; // TCP

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AduDecoder;

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ClientCodec {
    pub(crate) decoder: AduDecoder,
}

impl Decoder for AduDecoder {
    type Item = (Header, Bytes);
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<(Header, Bytes)>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        // len = bytes of PDU + one byte (unit ID)
        let len = usize::from(BigEndian::read_u16(&buf[4..6]));
        if len < 2 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid data length: {len}"),
            ));
        }
        let pdu_len = len - 1;
        if pdu_len > MAX_PDU_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid PDU length: {pdu_len}"),
            ));
        }

        if buf.len() < HEADER_LEN + pdu_len {
            buf.reserve(HEADER_LEN + pdu_len - buf.len());
            return Ok(None);
        }

        let header_data = buf.split_to(HEADER_LEN);

        let protocol_id = BigEndian::read_u16(&header_data[2..4]);
        if protocol_id != PROTOCOL_ID {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid protocol identifier: expected = {PROTOCOL_ID}, actual = {protocol_id}"),
            ));
        }

        let transaction_id = BigEndian::read_u16(&header_data[0..2]);
        let unit_id = header_data[6];
        let hdr = Header {
            transaction_id,
            unit_id,
        };

        let data = buf.split_to(pdu_len).freeze();

        Ok(Some((hdr, data)))
    }
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        let Some((hdr, pdu_data)) = self.decoder.decode(buf)? else {
            return Ok(None);
        };
        // The frame has been consumed entirely, so a broken PDU does not
        // affect any subsequent frames.
        let pdu = ResponsePdu::try_from(pdu_data).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                "Truncated response PDU".to_owned()
            } else {
                err.to_string()
            }
        });
        Ok(Some(ResponseAdu { hdr, pdu }))
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let request: Request<'_> = pdu.into();
        verify_request(&request)?;
        let pdu_len = request_pdu_size(&request);
        buf.reserve(HEADER_LEN + pdu_len);
        buf.put_u16(hdr.transaction_id);
        buf.put_u16(PROTOCOL_ID);
        buf.put_u16(u16_len(pdu_len + 1));
        buf.put_u8(hdr.unit_id);
        encode_request_pdu(buf, &request);
        Ok(())
    }
}
