// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Readout and write runs across several register groups.

use thiserror::Error;

use crate::{
    client::sync::{Reader, Writer},
    group::{parse_read_group, parse_write_group, ReadGroup, WriteGroup},
    value::RangeError,
    Error, ExceptionCode,
};

pub use crate::group::{ReadoutResult, ReadoutResultSet};

/// How a run proceeds after a group failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing group.
    Abort,
    /// Report the failure and go on with the next group.
    Continue,
}

/// Failure of a single group.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid register group {group:?}: {source}")]
    InvalidGroup { group: String, source: RangeError },

    #[error("register group {group:?}: Modbus exception: {exception}")]
    Exception {
        group: String,
        exception: ExceptionCode,
    },

    #[error("register group {group:?}: {source}")]
    Client { group: String, source: Error },
}

impl OperationError {
    /// The group as given by the caller.
    #[must_use]
    pub fn group(&self) -> &str {
        match self {
            Self::InvalidGroup { group, .. }
            | Self::Exception { group, .. }
            | Self::Client { group, .. } => group,
        }
    }

    /// Failures that leave the connection unusable and end every run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Client {
                source: Error::Transport(_) | Error::Timeout(_),
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Client {
                source: Error::Timeout(_),
                ..
            }
        )
    }
}

/// Outcome of [`perform_readout`].
#[derive(Debug, Default)]
pub struct Readout {
    /// Successfully read groups in input order.
    pub results: ReadoutResultSet,
    pub failures: Vec<OperationError>,
}

/// Outcome of [`perform_write`].
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Number of successfully written groups.
    pub written: usize,
    pub failures: Vec<OperationError>,
}

fn outcome<T>(group: &str, result: crate::Result<T>) -> Result<T, OperationError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(OperationError::Exception {
            group: group.to_owned(),
            exception,
        }),
        Err(source) => Err(OperationError::Client {
            group: group.to_owned(),
            source,
        }),
    }
}

fn read_group<C>(client: &mut C, text: &str) -> Result<Option<ReadoutResult>, OperationError>
where
    C: Reader + ?Sized,
{
    let Some(ReadGroup { start, quantity }) =
        parse_read_group(text).map_err(|source| OperationError::InvalidGroup {
            group: text.to_owned(),
            source,
        })?
    else {
        log::warn!("Unable to parse register group {text:?}, skipping it");
        return Ok(None);
    };
    log::debug!("Reading {quantity} register(s) starting at {start}");
    let values = outcome(text, client.read_holding_registers(start, quantity))?;
    log::debug!("Raw data: {values:?}");
    Ok(Some(ReadoutResult {
        start,
        quantity,
        values,
    }))
}

fn write_group<C>(client: &mut C, text: &str) -> Result<bool, OperationError>
where
    C: Writer + ?Sized,
{
    let Some(WriteGroup { address, values }) =
        parse_write_group(text).map_err(|source| OperationError::InvalidGroup {
            group: text.to_owned(),
            source,
        })?
    else {
        log::warn!("Unable to parse register group {text:?}, skipping it");
        return Ok(false);
    };
    log::debug!("Writing {values:?} starting at {address}");
    let result = match values[..] {
        [value] => client.write_single_register(address, value),
        _ => client.write_multiple_registers(address, &values),
    };
    outcome(text, result)?;
    Ok(true)
}

/// Reads all `groups` in order.
///
/// Malformed groups are skipped. With [`FailurePolicy::Abort`] the first
/// failing group ends the run. Transport failures and timeouts always end
/// the run.
pub fn perform_readout<'a, C>(
    client: &mut C,
    groups: impl IntoIterator<Item = &'a str>,
    policy: FailurePolicy,
) -> Readout
where
    C: Reader + ?Sized,
{
    let mut readout = Readout::default();
    for group in groups {
        match read_group(client, group) {
            Ok(Some(result)) => readout.results.push(result),
            Ok(None) => (),
            Err(err) => {
                let abort = policy == FailurePolicy::Abort || err.is_fatal();
                readout.failures.push(err);
                if abort {
                    break;
                }
            }
        }
    }
    readout
}

/// Writes all `groups` in order.
///
/// A single value is written with function 6, several values with
/// function 16.
pub fn perform_write<'a, C>(
    client: &mut C,
    groups: impl IntoIterator<Item = &'a str>,
    policy: FailurePolicy,
) -> WriteReport
where
    C: Writer + ?Sized,
{
    let mut report = WriteReport::default();
    for group in groups {
        match write_group(client, group) {
            Ok(written) => report.written += usize::from(written),
            Err(err) => {
                log::debug!("Writing failed: {err}");
                let abort = policy == FailurePolicy::Abort || err.is_fatal();
                report.failures.push(err);
                if abort {
                    break;
                }
            }
        }
    }
    report
}
