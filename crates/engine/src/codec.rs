//! Content codec
//!
//! Detects whether a payload is structured notation (JSON) or tabular
//! notation (CSV), decodes it into a [`RecordSet`], and encodes a record set
//! back into a given notation.
//!
//! Detection runs two explicit stages, structured first:
//!
//! ```text
//! try_parse_structured(text) -> Some(set)  => (set, Json)
//!                            -> None
//! try_parse_tabular(text)    -> Some(set)  => (set, Csv)
//!                            -> None       => no data
//! ```
//!
//! Text that parses as JSON never falls through to the tabular stage: a
//! scalar such as `42` is no data, not a one-column table. A leading byte
//! order mark is ignored.
//!
//! "No data" is not an error. Callers treat it as an empty or unreadable file.

use crate::query;
use repotable_core::{scalar_text, Error, Format, Options, Record, RecordSet, Result};
use serde_json::Value;

/// Structured/tabular content codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentCodec {
    delimiter: u8,
}

impl Default for ContentCodec {
    fn default() -> Self {
        ContentCodec { delimiter: b',' }
    }
}

impl ContentCodec {
    /// Codec with a tabular field delimiter
    pub fn new(delimiter: u8) -> Self {
        ContentCodec { delimiter }
    }

    /// Codec configured from the session's tabular options
    pub fn from_options(options: &Options) -> Result<Self> {
        Ok(ContentCodec::new(options.csv.delimiter_byte()?))
    }

    /// Tabular field delimiter
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Parse structured notation. Only an object or an array of objects is
    /// a record set; anything else is `None`.
    pub fn try_parse_structured(&self, text: &str) -> Option<RecordSet> {
        let value: Value = serde_json::from_str(strip_bom(text)).ok()?;
        RecordSet::try_from(value).ok()
    }

    /// Parse tabular notation with the first row as headers.
    ///
    /// Empty lines are skipped and every cell decodes as a string. Rows
    /// whose width differs from the header fail the whole parse, as does
    /// text that looks like broken structured notation.
    pub fn try_parse_tabular(&self, text: &str) -> Option<RecordSet> {
        let text = strip_bom(text);
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return None;
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers().ok()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return None;
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.ok()?;
            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(h, cell)| (h.to_string(), Value::String(cell.to_string())))
                .collect();
            records.push(record);
        }
        Some(RecordSet::Many(records))
    }

    /// Detect the notation and decode. `None` means no data.
    pub fn decode(&self, text: &str) -> Option<(RecordSet, Format)> {
        let text = strip_bom(text);
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => RecordSet::try_from(value).ok().map(|set| (set, Format::Json)),
            Err(_) => self.try_parse_tabular(text).map(|set| (set, Format::Csv)),
        }
    }

    /// Decode in a known notation, without detection.
    pub fn decode_as(&self, text: &str, format: Format) -> Option<RecordSet> {
        match format {
            Format::Json => self.try_parse_structured(text),
            Format::Csv => self.try_parse_tabular(text),
        }
    }

    /// Encode a record set.
    ///
    /// Tabular output uses the union of all record fields as the header, in
    /// first-seen order. Null cells are empty and nested values are written
    /// as structured text.
    pub fn encode(&self, set: &RecordSet, format: Format) -> Result<String> {
        match format {
            Format::Json => Ok(serde_json::to_string_pretty(set)?),
            Format::Csv => self.encode_tabular(set.as_slice()),
        }
    }

    fn encode_tabular(&self, records: &[Record]) -> Result<String> {
        let header = query::columns(records);
        if header.is_empty() {
            return Ok(String::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer.write_record(&header).map_err(csv_error)?;
        for record in records {
            let row = header
                .iter()
                .map(|column| record.get(column).map(scalar_text).unwrap_or_default());
            writer.write_record(row).map_err(csv_error)?;
        }

        let bytes = writer.into_inner().map_err(|e| Error::Serialization {
            reason: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| Error::Serialization {
            reason: e.to_string(),
        })
    }
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn csv_error(e: csv::Error) -> Error {
    Error::Serialization {
        reason: e.to_string(),
    }
}
