//! Rendering of rate records for the monitoring pipeline.

use std::io::{self, Write};

use crate::rate::RateRecord;

/// Field delimiter of the text format.
pub const FIELD_DELIMITER: char = '|';

/// Output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `<externalId>|<value>|`, one record per line.
    #[default]
    Text,
    /// One JSON array of `{externalId, timestamp, value}`.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// A single record as one text line, without the newline.
pub fn format_line(record: &RateRecord) -> String {
    format!(
        "{}{d}{}{d}",
        record.external_id,
        record.value,
        d = FIELD_DELIMITER
    )
}

/// Write every record in the requested format.
pub fn write_records<W: Write>(
    out: &mut W,
    records: &[RateRecord],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for record in records {
                writeln!(out, "{}", format_line(record))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records).map_err(io::Error::other)?;
            writeln!(out)?;
        }
    }
    out.flush()
}
