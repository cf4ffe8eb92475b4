// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human readable renderings of readout results.

use std::fmt::Write as _;

use crate::{
    group::ReadoutResult,
    value::{word_to_display_chars, word_to_int16},
    Word,
};

const TABLE_RULE: &str = "---------------------------------------";
const TABLE_HEADER: &str = "Reg.  |   Hex  | int16  | uint16 | char";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// One row per register with all representations
    #[default]
    Table,
    /// Comma separated values only
    Plain,
}

/// Representation of a register value in plain output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DataType {
    #[cfg_attr(feature = "cli", value(alias = "int"))]
    Int16,
    #[default]
    #[cfg_attr(feature = "cli", value(alias = "uint"))]
    Uint16,
    #[cfg_attr(feature = "cli", value(alias = "chr"))]
    Character,
    Hex,
}

impl DataType {
    fn render(self, word: Word) -> String {
        match self {
            Self::Int16 => word_to_int16(word).to_string(),
            Self::Uint16 => word.to_string(),
            Self::Character => char::from_u32(u32::from(word))
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string(),
            Self::Hex => format!("0x{word:04x}"),
        }
    }
}

/// Renders one row per register below a header.
///
/// Every line, including the last one, ends with a newline.
#[must_use]
pub fn format_table(results: &[ReadoutResult]) -> String {
    let mut table = format!("{TABLE_RULE}\n{TABLE_HEADER}\n{TABLE_RULE}\n");
    let rows = results.iter().flat_map(|result| {
        (u32::from(result.start)..).zip(result.values.iter().copied())
    });
    for (address, word) in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(
            table,
            "{:>5} | 0x{:04x} | {:>6} | {:>6} | {}",
            address,
            word,
            word_to_int16(word),
            word,
            word_to_display_chars(word),
        );
    }
    table
}

/// Renders all values of all results as a single comma separated line
/// without trailing newline.
#[must_use]
pub fn format_plain(results: &[ReadoutResult], data_type: DataType) -> String {
    results
        .iter()
        .flat_map(|result| result.values.iter())
        .map(|word| data_type.render(*word))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<ReadoutResult> {
        vec![
            ReadoutResult {
                start: 0,
                quantity: 3,
                values: vec![0, 1234, 65535],
            },
            ReadoutResult {
                start: 40123,
                quantity: 1,
                values: vec![0x4142],
            },
        ]
    }

    #[test]
    fn render_table() {
        let table = format_table(&results());
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], TABLE_RULE);
        assert_eq!(lines[1], TABLE_HEADER);
        assert_eq!(lines[2], TABLE_RULE);
        assert_eq!(lines[3], "    0 | 0x0000 |      0 |      0 |  ");
        assert_eq!(lines[4], "    1 | 0x04d2 |   1234 |   1234 |  Ò");
        assert_eq!(lines[5], "    2 | 0xffff |     -1 |  65535 | ÿ ÿ");
        assert_eq!(lines[6], "40123 | 0x4142 |  16706 |  16706 | A B");
    }

    #[test]
    fn render_empty_table() {
        assert_eq!(format_table(&[]).lines().count(), 3);
    }

    #[test]
    fn render_plain() {
        let results = results();
        assert_eq!(format_plain(&results, DataType::Uint16), "0,1234,65535,16706");
        assert_eq!(format_plain(&results, DataType::Int16), "0,1234,-1,16706");
        assert_eq!(
            format_plain(&results, DataType::Hex),
            "0x0000,0x04d2,0xffff,0x4142"
        );
        assert_eq!(format_plain(&results[1..], DataType::Character), "\u{4142}");
        assert_eq!(format_plain(&[], DataType::default()), "");
    }
}
