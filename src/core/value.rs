//! Purpose: Define the closed set of driver-native value shapes and the scan seam.
//! Exports: `RawValue`, `RowSource`.
//! Role: The typed intermediate form between the driver layer and normalization.
//! Invariants: The sum is closed; every variant has exactly one conversion rule.
//! Invariants: Scan fills every slot or fails the whole row, never part of it.

use time::OffsetDateTime;

use crate::core::error::Error;

/// One cell as scanned from the driver, before normalization. Values the
/// driver can only surface as display text arrive as `Other`.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Bytes(Vec<u8>),
    Text(String),
    Temporal(OffsetDateTime),
    Bool(bool),
    Int(i64),
    Float(f64),
    Other(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

/// Scans the current row into one slot per column. The slot count always
/// equals the descriptor count of the open result set.
pub trait RowSource {
    fn scan(&mut self, slots: &mut [RawValue]) -> Result<(), Error>;
}
