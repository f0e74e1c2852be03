//! Purpose: Parse JSON Lines result-set descriptions and drive the formatter.
//! Exports: `SchemaSpec`, `ColumnSpec`, `RenderOutcome`, `run_stream`.
//! Role: Input engine used by the CLI; stands in for a live driver layer.
//! Invariants: Malformed JSON stops the stream with a usage error.
//! Invariants: An unmappable row drops only that row; the stream keeps going.

use std::io::BufRead;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use rowsink::api::{ColumnMeta, Error, ErrorKind, Formatter, RawValue, RowSource};

/// A schema line opens a result set: `{"columns":[{"name":…,"type":…}…]}`.
#[derive(Debug, Deserialize)]
pub struct SchemaSpec {
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub scale: Option<u8>,
    #[serde(default)]
    pub precision: Option<u8>,
    #[serde(default)]
    pub length: Option<usize>,
}

impl ColumnSpec {
    fn to_meta(&self) -> ColumnMeta {
        let mut meta = ColumnMeta::new(self.name.clone(), self.type_name.clone());
        meta.scale = self.scale;
        meta.precision = self.precision;
        meta.display_size = self.length;
        meta
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RenderOutcome {
    pub result_sets: u64,
    pub rows_total: u64,
    pub rows_rendered: u64,
    pub rows_dropped: u64,
}

pub fn run_stream<R: BufRead>(
    reader: R,
    formatter: &mut dyn Formatter,
) -> Result<RenderOutcome, Error> {
    let mut outcome = RenderOutcome::default();
    let mut in_result_set = false;

    formatter.begin_batch();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index as u64 + 1;
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input stream")
                .with_row(line_no)
                .with_source(err)
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(trimmed).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("line {line_no}: invalid JSON"))
                .with_hint("Each line must be a schema object or a row array.")
                .with_source(err)
        })?;

        match value {
            Value::Object(_) => {
                let spec: SchemaSpec = serde_json::from_value(value).map_err(|err| {
                    Error::new(ErrorKind::Usage)
                        .with_message(format!("line {line_no}: invalid schema object"))
                        .with_hint(
                            "Schema lines look like {\"columns\":[{\"name\":\"id\",\"type\":\"INT\"}]}.",
                        )
                        .with_source(err)
                })?;
                let columns: Vec<ColumnMeta> =
                    spec.columns.iter().map(ColumnSpec::to_meta).collect();
                formatter.begin_result_set(&columns)?;
                in_result_set = true;
                outcome.result_sets += 1;
            }
            Value::Array(cells) => {
                if !in_result_set {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message(format!("line {line_no}: row before any schema line"))
                        .with_hint("Open a result set with a schema object first."));
                }
                outcome.rows_total += 1;
                let mut source = JsonRow {
                    cells: &cells,
                    line: line_no,
                };
                match formatter.add_row(&mut source)? {
                    Some(_) => outcome.rows_rendered += 1,
                    None => outcome.rows_dropped += 1,
                }
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("line {line_no}: expected an object or an array")));
            }
        }
    }
    if in_result_set {
        formatter.end_result_set();
    }
    formatter.end_batch();
    Ok(outcome)
}

struct JsonRow<'a> {
    cells: &'a [Value],
    line: u64,
}

impl RowSource for JsonRow<'_> {
    fn scan(&mut self, slots: &mut [RawValue]) -> Result<(), Error> {
        if self.cells.len() != slots.len() {
            return Err(Error::new(ErrorKind::Scan)
                .with_message(format!(
                    "row carries {} values for {} columns",
                    self.cells.len(),
                    slots.len()
                ))
                .with_row(self.line));
        }
        for (slot, cell) in slots.iter_mut().zip(self.cells) {
            *slot = raw_value(cell).map_err(|err| err.with_row(self.line))?;
        }
        Ok(())
    }
}

fn raw_value(cell: &Value) -> Result<RawValue, Error> {
    match cell {
        Value::Null => Ok(RawValue::Null),
        Value::Bool(flag) => Ok(RawValue::Bool(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(RawValue::Int)
            .or_else(|| number.as_f64().map(RawValue::Float))
            .ok_or_else(|| {
                Error::new(ErrorKind::Scan).with_message("numeric cell out of range")
            }),
        Value::String(text) => Ok(RawValue::Text(text.clone())),
        Value::Object(map) => {
            if let Some(Value::String(hex)) = map.get("hex") {
                return decode_hex(hex).map(RawValue::Bytes);
            }
            if let Some(Value::String(stamp)) = map.get("ts") {
                return OffsetDateTime::parse(stamp, &Rfc3339)
                    .map(RawValue::Temporal)
                    .map_err(|err| {
                        Error::new(ErrorKind::Scan)
                            .with_message("temporal cell is not RFC 3339")
                            .with_source(err)
                    });
            }
            if let Some(Value::String(text)) = map.get("str") {
                return Ok(RawValue::Other(text.clone()));
            }
            Err(Error::new(ErrorKind::Scan)
                .with_message("unrecognized cell object")
                .with_hint("Cell objects carry one of: hex, ts, str."))
        }
        Value::Array(_) => {
            Err(Error::new(ErrorKind::Scan).with_message("nested arrays are not cell values"))
        }
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>, Error> {
    if text.len() % 2 != 0 {
        return Err(Error::new(ErrorKind::Scan)
            .with_message("hex cell has an odd number of digits"));
    }
    let mut bytes = Vec::with_capacity(text.len() / 2);
    for pair in text.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair)
            .map_err(|err| Error::new(ErrorKind::Scan).with_source(err))?;
        let byte = u8::from_str_radix(pair, 16).map_err(|err| {
            Error::new(ErrorKind::Scan)
                .with_message(format!("invalid hex digits {pair:?}"))
                .with_source(err)
        })?;
        bytes.push(byte);
    }
    Ok(bytes)
}
