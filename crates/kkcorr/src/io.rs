//! Reading and writing tables of named columns.
//!
//! We support 2 file types:
//! - [`FileType::Ascii`]: a whitespace-delimited text table. The header line
//!   starts with `#` and holds the centered column names. Each value is
//!   written in C-style scientific notation (e.g. `1.2346e+03`) with a
//!   configurable precision.
//! - [`FileType::Binary`]: a `bincode` encoding of the table. This is
//!   lossless.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Ascii,
    Binary,
}

impl FileType {
    /// infer the file type from the extension of `path` (`.bin` files are
    /// binary, everything else is ascii)
    pub fn from_path(path: &Path) -> FileType {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => FileType::Binary,
            _ => FileType::Ascii,
        }
    }
}

/// A table of equal-length named columns
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ColumnTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ColumnTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, column: Vec<f64>) {
        self.names.push(name.to_owned());
        self.columns.push(column);
    }

    pub(crate) fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub(crate) fn write(
        &self,
        path: &Path,
        file_type: FileType,
        precision: usize,
    ) -> Result<(), Error> {
        let file = File::create(path)
            .map_err(|e| Error::io(format!("creating {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        match file_type {
            FileType::Ascii => self
                .write_ascii(&mut writer, precision)
                .map_err(|e| Error::io(format!("writing {}", path.display()), e))?,
            FileType::Binary => bincode::serialize_into(&mut writer, self).map_err(|e| {
                Error::serialization(format!("encoding {}", path.display()), e.to_string())
            })?,
        }
        writer
            .flush()
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;
        debug!(
            n_columns = self.names.len(),
            n_rows = self.n_rows(),
            ?file_type,
            "wrote table"
        );
        Ok(())
    }

    fn write_ascii(&self, writer: &mut impl Write, precision: usize) -> std::io::Result<()> {
        let width = precision + 8;
        let mut header = String::from("#");
        for (i, name) in self.names.iter().enumerate() {
            // the leading "#" occupies part of the first column
            let name_width = if i == 0 { width - 1 } else { width };
            header.push_str(&format!(" {name:^name_width$}"));
        }
        writeln!(writer, "{}", header.trim_end())?;

        for row in 0..self.n_rows() {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|column| format_scientific(column[row], precision, width))
                .collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }

    pub(crate) fn read(path: &Path, file_type: FileType) -> Result<Self, Error> {
        let file =
            File::open(path).map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
        let reader = BufReader::new(file);
        let table = match file_type {
            FileType::Ascii => ColumnTable::read_ascii(reader, path)?,
            FileType::Binary => bincode::deserialize_from(reader).map_err(|e| {
                Error::serialization(format!("decoding {}", path.display()), e.to_string())
            })?,
        };
        if table.columns.iter().any(|c| c.len() != table.n_rows()) {
            return Err(Error::table_shape(format!(
                "the columns of {} have unequal lengths",
                path.display()
            )));
        }
        Ok(table)
    }

    fn read_ascii(reader: impl BufRead, path: &Path) -> Result<Self, Error> {
        let mut table = ColumnTable::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                // the last header line before the data names the columns
                if table.n_rows() == 0 {
                    table.names = header.split_whitespace().map(String::from).collect();
                    table.columns = vec![Vec::new(); table.names.len()];
                }
                continue;
            }

            let values = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| {
                    Error::serialization(
                        format!("parsing line {} of {}", line_num + 1, path.display()),
                        e.to_string(),
                    )
                })?;
            if values.len() != table.names.len() {
                return Err(Error::table_shape(format!(
                    "line {} of {} has {} values, but there are {} column names",
                    line_num + 1,
                    path.display(),
                    values.len(),
                    table.names.len()
                )));
            }
            for (column, value) in table.columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
        Ok(table)
    }
}

/// Format `value` like C's `%{width}.{precision}e`
fn format_scientific(value: f64, precision: usize, width: usize) -> String {
    let body = if value.is_nan() {
        String::from("nan")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        // rust writes the exponent without a sign or padding (e.g. 1.5e3)
        let formatted = format!("{value:.precision$e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => formatted,
        }
    };
    format!("{body:>width$}")
}
