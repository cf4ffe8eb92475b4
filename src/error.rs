// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::{io, time::Duration};

use thiserror::Error;

use crate::{frame::tcp::TransactionId, FunctionCode, Response};

/// Communication failure while talking to a _Modbus_ server.
///
/// Exceptions reported by the server are not errors of this kind, they are
/// returned as the inner result of [`crate::Result`].
#[derive(Debug, Error)]
pub enum Error {
    /// The response does not fit the request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connecting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] io::Error),

    /// No response arrived in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl Error {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// The received response does not match the outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("transaction id mismatch: expected = {expected}, actual = {actual}")]
    TransactionIdMismatch {
        expected: TransactionId,
        actual: TransactionId,
    },

    #[error("function code mismatch: expected = {expected}, actual = {actual}")]
    FunctionCodeMismatch {
        expected: FunctionCode,
        actual: FunctionCode,
    },

    /// Number of register bytes in a read response.
    #[error("byte count mismatch: expected = {expected}, actual = {actual}")]
    ByteCountMismatch { expected: usize, actual: usize },

    /// The echo of a write request differs from what has been written.
    #[error("unexpected response: {response:?}")]
    UnexpectedEcho { response: Response },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
