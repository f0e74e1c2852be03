//! Purpose: One-shot rendering helpers for callers holding a whole result set.
//! Exports: `ResultSet`, `MemoryRow`.
//! Role: Convenience layer over the streaming formatter; used heavily by tests.
//! Invariants: Rendering is a plain replay of the streaming lifecycle.

use std::io::Write;

use crate::core::column::ColumnMeta;
use crate::core::error::{Error, ErrorKind};
use crate::core::render::{DelimitedFormatter, Formatter};
use crate::core::settings::RenderSettings;
use crate::core::value::{RawValue, RowSource};

/// A `RowSource` over one in-memory row. Scan fails when the value count
/// does not match the column count, so a malformed row is dropped whole.
pub struct MemoryRow<'a> {
    values: &'a [RawValue],
}

impl<'a> MemoryRow<'a> {
    pub fn new(values: &'a [RawValue]) -> Self {
        Self { values }
    }
}

impl RowSource for MemoryRow<'_> {
    fn scan(&mut self, slots: &mut [RawValue]) -> Result<(), Error> {
        if self.values.len() != slots.len() {
            return Err(Error::new(ErrorKind::Scan).with_message(format!(
                "row carries {} values for {} columns",
                self.values.len(),
                slots.len()
            )));
        }
        for (slot, value) in slots.iter_mut().zip(self.values) {
            *slot = value.clone();
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<RawValue>>,
}

impl ResultSet {
    /// Renders the whole set through the streaming formatter and returns the
    /// emitted row count. Rows that fail to scan are reported and skipped,
    /// matching the streaming path.
    pub fn render(
        &self,
        settings: RenderSettings,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
        console: Box<dyn Write>,
    ) -> Result<u64, Error> {
        let mut formatter = DelimitedFormatter::new(settings, out, err, console);
        formatter.begin_batch();
        formatter.begin_result_set(&self.columns)?;
        for row in &self.rows {
            formatter.add_row(&mut MemoryRow::new(row))?;
        }
        formatter.end_result_set();
        formatter.end_batch();
        Ok(formatter.row_count())
    }
}
