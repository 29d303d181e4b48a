//! CSV row parser.
//!
//! Reads `;`-delimited text with a header naming `Date`, `ExecutionTime` and
//! `Value` (any order, extra columns ignored) and yields one [`RawRow`] per
//! data line. Rows are produced lazily; the iterator stops being useful after
//! the first error, which the caller is expected to propagate.

use std::io;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::MalformedInput;
use crate::models::RawRow;

// ---

pub const DELIMITER: u8 = b';';
pub const DATE_COLUMN: &str = "Date";
pub const EXECUTION_TIME_COLUMN: &str = "ExecutionTime";
pub const VALUE_COLUMN: &str = "Value";

/// `yyyy-MM-ddTHH:mm:ss.fffZ`, exactly three fractional digits.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";

/// Positions of the required columns within a record.
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    execution_time: usize,
    value: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, MalformedInput> {
        // ---
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(MalformedInput::MissingHeader(name))
        };

        Ok(Columns {
            date: find(DATE_COLUMN)?,
            execution_time: find(EXECUTION_TIME_COLUMN)?,
            value: find(VALUE_COLUMN)?,
        })
    }
}

/// Lazy sequence of candidate rows read from one CSV stream.
pub struct RowParser<R> {
    records: StringRecordsIntoIter<R>,
    columns: Columns,
}

/// Read the header of `reader` and return a parser over its data rows.
///
/// Fails immediately if the header lacks any of the required columns.
pub fn parse<R: io::Read>(reader: R) -> Result<RowParser<R>, MalformedInput> {
    // ---
    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr.headers().map_err(malformed)?;
    let columns = Columns::resolve(headers)?;

    Ok(RowParser {
        records: rdr.into_records(),
        columns,
    })
}

impl<R: io::Read> Iterator for RowParser<R> {
    type Item = Result<RawRow, MalformedInput>;

    fn next(&mut self) -> Option<Self::Item> {
        // ---
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(malformed(e))),
        };
        Some(self.to_raw_row(&record))
    }
}

impl<R> RowParser<R> {
    fn to_raw_row(&self, record: &StringRecord) -> Result<RawRow, MalformedInput> {
        // ---
        let line = record.position().map_or(0, |p| p.line());
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let date_text = field(self.columns.date);
        let date = parse_date(date_text).ok_or_else(|| MalformedInput::InvalidDate {
            line,
            text: date_text.to_string(),
        })?;

        Ok(RawRow {
            date,
            execution_time_text: field(self.columns.execution_time).to_string(),
            value_text: field(self.columns.value).to_string(),
        })
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn malformed(err: csv::Error) -> MalformedInput {
    // ---
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => MalformedInput::ColumnCount {
            line: pos.as_ref().map_or(0, |p| p.line()),
            expected: *expected_len as usize,
            found: *len as usize,
        },
        _ => MalformedInput::Unreadable(err.to_string()),
    }
}
