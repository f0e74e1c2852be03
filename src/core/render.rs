//! Purpose: Drive the per-result-set lifecycle over a buffered sink.
//! Exports: `Formatter`, `DelimitedFormatter`, `LINE_TERMINATOR`.
//! Role: Orchestrates descriptors, normalization, and encoding per row.
//! Invariants: A row is written whole or not at all; scan failures drop the row.
//! Invariants: One instance serves one batch/result-set/row sequence at a time.

use std::io::Write;

use crate::core::column::{build_descriptors, ColumnDescriptor, ColumnMeta};
use crate::core::diag::Diagnostics;
use crate::core::encode::{encode, quote_if_needed};
use crate::core::error::{Error, ErrorKind};
use crate::core::normalize::{normalize, ValueNote};
use crate::core::settings::RenderSettings;
use crate::core::value::{RawValue, RowSource};

#[cfg(windows)]
pub const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &str = "\n";

/// The lifecycle the batch orchestrator drives, in nesting order:
/// batch, then result sets, then rows. Messages and errors may interleave
/// at any point.
pub trait Formatter {
    fn begin_batch(&mut self);
    fn end_batch(&mut self);
    fn begin_result_set(&mut self, columns: &[ColumnMeta]) -> Result<(), Error>;
    fn end_result_set(&mut self);
    /// Scans, normalizes, encodes, and writes one row. Returns the first
    /// column's normalized text as an out-of-band echo, or `None` when the
    /// row was dropped on a scan failure (already reported). `Err` is
    /// reserved for sink write failures.
    fn add_row(&mut self, source: &mut dyn RowSource) -> Result<Option<String>, Error>;
    fn add_message(&mut self, text: &str);
    fn add_error(&mut self, err: &Error);
}

pub struct DelimitedFormatter {
    settings: RenderSettings,
    out: Box<dyn Write>,
    diag: Diagnostics,
    columns: Vec<ColumnDescriptor>,
    max_name_len: usize,
    slots: Vec<RawValue>,
    line: String,
    row_count: u64,
    in_result_set: bool,
}

impl DelimitedFormatter {
    pub fn new(
        settings: RenderSettings,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
        console: Box<dyn Write>,
    ) -> Self {
        let diag = Diagnostics::new(err, console, settings.redirect_messages);
        Self {
            settings,
            out,
            diag,
            columns: Vec::new(),
            max_name_len: 0,
            slots: Vec::new(),
            line: String::new(),
            row_count: 0,
            in_result_set: false,
        }
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Longest column name of the open result set. Unused by the delimited
    /// format itself; kept for parity with fixed-width companion renderers.
    pub fn max_column_name_len(&self) -> usize {
        self.max_name_len
    }

    fn write_line(&mut self) -> Result<(), Error> {
        self.line.push_str(LINE_TERMINATOR);
        self.out.write_all(self.line.as_bytes()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output line")
                .with_source(err)
        })
    }
}

impl Formatter for DelimitedFormatter {
    fn begin_batch(&mut self) {
        self.diag.info("Begin Batch");
    }

    fn end_batch(&mut self) {
        self.diag.info("End Batch");
    }

    fn begin_result_set(&mut self, columns: &[ColumnMeta]) -> Result<(), Error> {
        self.diag.info("Begin ResultSet");
        let (descriptors, max_name_len) = build_descriptors(
            columns,
            self.settings.max_fixed_col_width,
            self.settings.max_var_col_width,
        );
        self.columns = descriptors;
        self.max_name_len = max_name_len;
        self.slots = vec![RawValue::Null; self.columns.len()];
        self.row_count = 0;
        self.in_result_set = true;

        self.line.clear();
        for (index, column) in self.columns.iter().enumerate() {
            if index > 0 {
                self.line.push_str(&self.settings.column_separator);
            }
            let name = quote_if_needed(column.name.clone(), &self.settings.column_separator);
            self.line.push_str(&name);
        }
        self.write_line()
    }

    fn end_result_set(&mut self) {
        self.diag.info("End ResultSet");
        self.in_result_set = false;
    }

    fn add_row(&mut self, source: &mut dyn RowSource) -> Result<Option<String>, Error> {
        if !self.in_result_set {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("add_row called outside an open result set")
                .with_hint("Call begin_result_set before streaming rows."));
        }

        self.slots.fill(RawValue::Null);
        if let Err(err) = source.scan(&mut self.slots) {
            self.diag.report(&err);
            return Ok(None);
        }

        self.line.clear();
        let mut first = None;
        for (index, (value, column)) in self.slots.iter().zip(&self.columns).enumerate() {
            let normalized = normalize(value, column);
            if let Some(ValueNote::ReplacedIdentifier) = normalized.note {
                self.diag.info(&format!(
                    "replaced malformed identifier bytes in column {}",
                    column.name
                ));
            }
            if index == 0 {
                first = Some(normalized.text.clone());
            } else {
                self.line.push_str(&self.settings.column_separator);
            }
            // The NULL literal is not column data: it skips control and hex
            // treatment but still obeys the quoting rule.
            let encoded = if value.is_null() {
                quote_if_needed(normalized.text, &self.settings.column_separator)
            } else {
                encode(
                    normalized.text,
                    column,
                    &self.settings.column_separator,
                    self.settings.control_chars,
                )
            };
            self.line.push_str(&encoded);
        }
        self.write_line()?;
        self.row_count += 1;
        Ok(Some(first.unwrap_or_default()))
    }

    fn add_message(&mut self, text: &str) {
        self.diag.info(text);
    }

    fn add_error(&mut self, err: &Error) {
        self.diag.error(err);
    }
}

#[cfg(test)]
mod tests {
    use super::{DelimitedFormatter, Formatter, LINE_TERMINATOR};
    use crate::core::column::ColumnMeta;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::settings::RenderSettings;
    use crate::core::value::{RawValue, RowSource};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct OneRow(Vec<RawValue>);

    impl RowSource for OneRow {
        fn scan(&mut self, slots: &mut [RawValue]) -> Result<(), Error> {
            for (slot, value) in slots.iter_mut().zip(self.0.drain(..)) {
                *slot = value;
            }
            Ok(())
        }
    }

    struct FailingRow;

    impl RowSource for FailingRow {
        fn scan(&mut self, _slots: &mut [RawValue]) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Scan).with_message("driver refused the row"))
        }
    }

    fn formatter(settings: RenderSettings) -> (DelimitedFormatter, SharedSink, SharedSink) {
        let out = SharedSink::default();
        let err = SharedSink::default();
        let console = SharedSink::default();
        let formatter = DelimitedFormatter::new(
            settings,
            Box::new(out.clone()),
            Box::new(err.clone()),
            Box::new(console),
        );
        (formatter, out, err)
    }

    fn guid_columns() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("name", "NVARCHAR").with_display_size(40),
            ColumnMeta::new("id", "UNIQUEIDENTIFIER"),
        ]
    }

    #[test]
    fn renders_header_and_quoted_row_end_to_end() {
        let (mut formatter, out, _) = formatter(RenderSettings::new());
        formatter.begin_batch();
        formatter.begin_result_set(&guid_columns()).expect("header");

        let wire = vec![
            0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ];
        let echo = formatter
            .add_row(&mut OneRow(vec![
                RawValue::Text("A,B".to_string()),
                RawValue::Bytes(wire),
            ]))
            .expect("row");

        formatter.end_result_set();
        formatter.end_batch();

        assert_eq!(echo.as_deref(), Some("A,B"));
        assert_eq!(formatter.row_count(), 1);
        let expected = format!(
            "name,id{LINE_TERMINATOR}\"A,B\",01020304-0506-0708-090a-0b0c0d0e0f10{LINE_TERMINATOR}"
        );
        assert_eq!(out.contents(), expected);
    }

    #[test]
    fn scan_failure_drops_the_row_and_reports_once() {
        let (mut formatter, out, err) = formatter(RenderSettings::new());
        formatter.begin_batch();
        formatter
            .begin_result_set(&[ColumnMeta::new("n", "INT")])
            .expect("header");

        assert!(formatter
            .add_row(&mut OneRow(vec![RawValue::Int(1)]))
            .expect("row 1")
            .is_some());
        assert!(formatter
            .add_row(&mut FailingRow)
            .expect("row 2 is dropped, not an error")
            .is_none());
        assert!(formatter
            .add_row(&mut OneRow(vec![RawValue::Int(3)]))
            .expect("row 3")
            .is_some());

        assert_eq!(formatter.row_count(), 2);
        let expected = format!("n{LINE_TERMINATOR}1{LINE_TERMINATOR}3{LINE_TERMINATOR}");
        assert_eq!(out.contents(), expected);
        let reported = err.contents();
        assert_eq!(reported.matches("[E]").count(), 1);
        assert!(reported.contains("driver refused the row"));
    }

    #[test]
    fn header_names_share_the_quoting_rule() {
        let (mut formatter, out, _) = formatter(RenderSettings::new());
        formatter
            .begin_result_set(&[
                ColumnMeta::new("plain", "INT"),
                ColumnMeta::new("first,last", "NVARCHAR"),
            ])
            .expect("header");
        assert_eq!(
            out.contents(),
            format!("plain,\"first,last\"{LINE_TERMINATOR}")
        );
    }

    #[test]
    fn separator_setting_changes_joins_and_quoting() {
        let mut settings = RenderSettings::new();
        settings.column_separator = ";".to_string();
        let (mut formatter, out, _) = formatter(settings);
        formatter
            .begin_result_set(&[
                ColumnMeta::new("a", "NVARCHAR"),
                ColumnMeta::new("b", "NVARCHAR"),
            ])
            .expect("header");
        formatter
            .add_row(&mut OneRow(vec![
                RawValue::Text("x,y".to_string()),
                RawValue::Text("u;v".to_string()),
            ]))
            .expect("row");
        let expected = format!("a;b{LINE_TERMINATOR}x,y;\"u;v\"{LINE_TERMINATOR}");
        assert_eq!(out.contents(), expected);
    }

    #[test]
    fn add_row_outside_result_set_is_a_usage_error() {
        let (mut formatter, _, _) = formatter(RenderSettings::new());
        let err = formatter
            .add_row(&mut OneRow(vec![RawValue::Int(1)]))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn replaced_identifier_is_observable_and_row_still_renders() {
        let mut settings = RenderSettings::new();
        settings.redirect_messages = true;
        let (mut formatter, out, err) = formatter(settings);
        formatter.begin_result_set(&guid_columns()).expect("header");
        let echo = formatter
            .add_row(&mut OneRow(vec![
                RawValue::Text("x".to_string()),
                RawValue::Bytes(vec![0xAA; 3]),
            ]))
            .expect("row");
        assert_eq!(echo.as_deref(), Some("x"));
        assert_eq!(formatter.row_count(), 1);
        assert_eq!(out.contents().lines().count(), 2);
        assert!(err.contents().contains("replaced malformed identifier"));
    }

    #[test]
    fn row_count_resets_per_result_set() {
        let (mut formatter, _, _) = formatter(RenderSettings::new());
        let columns = [ColumnMeta::new("n", "INT")];
        formatter.begin_result_set(&columns).expect("header");
        formatter
            .add_row(&mut OneRow(vec![RawValue::Int(1)]))
            .expect("row");
        formatter.end_result_set();
        assert_eq!(formatter.row_count(), 1);

        formatter.begin_result_set(&columns).expect("header");
        assert_eq!(formatter.row_count(), 0);
    }

    #[test]
    fn zero_columns_emit_a_bare_header_line() {
        let (mut formatter, out, _) = formatter(RenderSettings::new());
        formatter.begin_result_set(&[]).expect("header");
        assert_eq!(out.contents(), LINE_TERMINATOR);
        assert_eq!(formatter.max_column_name_len(), 0);
    }

    #[test]
    fn null_values_render_for_every_column() {
        let (mut formatter, out, _) = formatter(RenderSettings::new());
        formatter
            .begin_result_set(&[
                ColumnMeta::new("b", "VARBINARY"),
                ColumnMeta::new("g", "UNIQUEIDENTIFIER"),
                ColumnMeta::new("s", "NVARCHAR"),
            ])
            .expect("header");
        formatter
            .add_row(&mut OneRow(vec![RawValue::Null, RawValue::Null, RawValue::Null]))
            .expect("row");
        let expected = format!("b,g,s{LINE_TERMINATOR}NULL,NULL,NULL{LINE_TERMINATOR}");
        assert_eq!(out.contents(), expected);
    }
}
