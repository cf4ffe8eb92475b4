// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Perform a read or write operation on some Modbus TCP server.

use std::{
    io,
    net::{SocketAddr, ToSocketAddrs as _},
    process::ExitCode,
    time::Duration,
};

use clap::{Parser, ValueEnum};
use tinymbc::{
    format::{format_plain, format_table, DataType, OutputFormat},
    group::split_groups,
    operation::{perform_readout, perform_write, FailurePolicy, OperationError},
    prelude::*,
};

const EXIT_INVALID_INPUT: u8 = 3;
const EXIT_CONNECTION_FAILED: u8 = 4;
const EXIT_TIMEOUT: u8 = 5;
const EXIT_READOUT_FAILED: u8 = 6;
const EXIT_WRITE_FAILED: u8 = 7;

const VERBOSE_HINT: &str = "You might want to run with option '--verbose'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Read,
    Write,
}

#[derive(Debug, Parser)]
#[command(
    name = "tinymbc",
    version,
    about = "Perform a read or write operation on some Modbus TCP server",
    after_help = "Examples:
  tinymbc read 1-10,42-99,101,40123     # read all these registers
  tinymbc write 17=42                   # write 42 to reg. 17
  tinymbc write 17=0x42,42=17           # write 0x42 to reg. 17 and 17 to reg. 42
  tinymbc write 100=1;2;3               # write 1, 2 and 3 to reg. 100 to 102"
)]
struct Args {
    /// Increase output verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Modbus server to connect to
    #[arg(short, long, default_value = "localhost")]
    server: String,

    /// TCP port of the Modbus server
    #[arg(short, long, default_value_t = 502)]
    port: u16,

    /// Modbus unit ID to connect to
    #[arg(short, long, default_value_t = 1)]
    unitid: UnitId,

    /// Output format: just the plain results or a nice table
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Datatype to interpret results as (ignored for output formats other than plain)
    #[arg(short, long, value_enum, default_value_t = DataType::Uint16)]
    datatype: DataType,

    /// Timeout in seconds for each single Modbus query to complete (0: no timeout)
    #[arg(
        short,
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(0..=60)
    )]
    timeout: u64,

    /// Operation to perform
    #[arg(value_enum)]
    operation: Operation,

    /// Group of registers[=values] to read/write from/to, comma separated
    registers: String,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// All addresses of `server`, IPv4 addresses first.
fn resolve(server: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let mut addrs: Vec<_> = (server, port).to_socket_addrs()?.collect();
    addrs.sort_by_key(|addr| !addr.is_ipv4());
    Ok(addrs)
}

/// Tries the addresses in turn until a connection has been established.
fn connect(
    addrs: &[SocketAddr],
    unit: Unit,
    timeout: Option<Duration>,
) -> io::Result<sync::Context> {
    let mut last_err = None;
    for &socket_addr in addrs {
        match sync::tcp::connect_unit_with_timeout(socket_addr, unit, timeout) {
            Ok(ctx) => return Ok(ctx),
            Err(err) => {
                log::debug!("Connecting to {socket_addr} failed: {err}");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "No address to connect to")
    }))
}

fn fail(message: &str, code: u8) -> ExitCode {
    eprintln!("{message} {VERBOSE_HINT}");
    ExitCode::from(code)
}

fn readout_exit_code(err: &OperationError) -> ExitCode {
    match err {
        OperationError::InvalidGroup { .. } => fail(
            "Invalid input! Probably invalid register definition.",
            EXIT_INVALID_INPUT,
        ),
        err if err.is_timeout() => fail(
            "Did not receive reply in due time! Maybe wrong unit ID?",
            EXIT_TIMEOUT,
        ),
        _ => fail(
            "Did not receive any results! Did you try to read non-supported registers?",
            EXIT_READOUT_FAILED,
        ),
    }
}

fn run(args: &Args) -> ExitCode {
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let unit = Unit(args.unitid);

    log::debug!(
        "Will try to connect to unit {unit} on {}:{} ...",
        args.server,
        args.port
    );
    let mut ctx = match resolve(&args.server, args.port)
        .and_then(|addrs| connect(&addrs, unit, timeout))
    {
        Ok(ctx) => ctx,
        Err(err) => {
            log::error!("Connecting failed: {err}");
            return fail(
                "Could not connect to server! Please check connection details.",
                EXIT_CONNECTION_FAILED,
            );
        }
    };
    log::debug!("... connected!");

    let groups = split_groups(&args.registers);
    let exit_code = match args.operation {
        Operation::Read => {
            let readout = perform_readout(&mut ctx, groups, FailurePolicy::Abort);
            if let Some(err) = readout.failures.first() {
                log::error!("{err}");
                readout_exit_code(err)
            } else {
                log::debug!("Received {} sets of results", readout.results.len());
                match args.output {
                    OutputFormat::Table => print!("{}", format_table(&readout.results)),
                    OutputFormat::Plain => {
                        println!("{}", format_plain(&readout.results, args.datatype));
                    }
                }
                ExitCode::SUCCESS
            }
        }
        Operation::Write => {
            let report = perform_write(&mut ctx, groups, FailurePolicy::Continue);
            log::debug!("Written {} group(s)", report.written);
            for err in &report.failures {
                log::error!("{err}");
            }
            if report.failures.iter().any(OperationError::is_timeout) {
                fail(
                    "Did not receive reply in due time! Maybe wrong unit ID?",
                    EXIT_TIMEOUT,
                )
            } else if report.failures.is_empty() {
                ExitCode::SUCCESS
            } else {
                fail("Something went wrong while writing.", EXIT_WRITE_FAILED)
            }
        }
    };

    if let Err(err) = ctx.disconnect() {
        log::debug!("Disconnecting failed: {err}");
    }
    exit_code
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}
