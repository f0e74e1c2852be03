//! Purpose: Convert one scanned value into its canonical text form.
//! Exports: `NormalizedValue`, `ValueNote`, `normalize`.
//! Role: The per-cell conversion rules; selected by the column's static classification.
//! Invariants: Output is identical for identical (value, descriptor) pairs.
//! Invariants: Malformed identifier bytes are substituted, never an error.

use std::fmt::Write as _;

use bstr::ByteSlice;
use getrandom::fill as fill_random;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::core::column::{ColumnDescriptor, DeclaredType, MAX_TEMPORAL_SCALE};
use crate::core::value::RawValue;

pub const NULL_LITERAL: &str = "NULL";

/// Canonical text plus an observability side channel for recoveries that
/// would otherwise be silent.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedValue {
    pub text: String,
    pub note: Option<ValueNote>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueNote {
    /// The column carried identifier bytes of the wrong shape; a freshly
    /// generated identifier was emitted in their place.
    ReplacedIdentifier,
}

impl NormalizedValue {
    fn plain(text: String) -> Self {
        Self { text, note: None }
    }
}

pub fn normalize(value: &RawValue, column: &ColumnDescriptor) -> NormalizedValue {
    match value {
        RawValue::Null => NormalizedValue::plain(NULL_LITERAL.to_string()),
        RawValue::Bytes(bytes) => normalize_bytes(bytes, column),
        RawValue::Text(text) => NormalizedValue::plain(text.clone()),
        RawValue::Temporal(instant) => {
            NormalizedValue::plain(format_temporal(instant, column.declared, column.scale))
        }
        RawValue::Bool(flag) => {
            // Single-bit columns print as bit literals, not word form.
            NormalizedValue::plain(if *flag { "1" } else { "0" }.to_string())
        }
        RawValue::Int(number) => NormalizedValue::plain(number.to_string()),
        RawValue::Float(number) => NormalizedValue::plain(number.to_string()),
        RawValue::Other(text) => NormalizedValue::plain(text.clone()),
    }
}

fn normalize_bytes(bytes: &[u8], column: &ColumnDescriptor) -> NormalizedValue {
    if column.is_binary {
        // Bare hex digits; the 0x prefix is the encoder's concern.
        return NormalizedValue::plain(hex_upper(bytes));
    }
    if column.is_identifier {
        return match <[u8; 16]>::try_from(bytes) {
            Ok(mut raw) => {
                unscramble_identifier(&mut raw);
                NormalizedValue::plain(format_identifier(&raw))
            }
            Err(_) => NormalizedValue {
                text: format_identifier(&random_identifier()),
                note: Some(ValueNote::ReplacedIdentifier),
            },
        };
    }
    NormalizedValue::plain(bytes.to_str_lossy().into_owned())
}

/// Reorders the driver's mixed-endian identifier layout into logical byte
/// order: bytes 0-3 reversed, 4-5 swapped, 6-7 swapped, the rest unchanged.
/// The reorder is its own inverse.
pub fn unscramble_identifier(bytes: &mut [u8; 16]) {
    bytes[0..4].reverse();
    bytes.swap(4, 5);
    bytes.swap(6, 7);
}

pub fn format_identifier(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(36);
    for (index, byte) in bytes.iter().enumerate() {
        if matches!(index, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn random_identifier() -> [u8; 16] {
    let mut bytes = [0u8; 16];
    // Best effort; an all-zero buffer still yields a well-formed identifier.
    let _ = fill_random(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    bytes
}

fn hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

fn format_temporal(instant: &OffsetDateTime, declared: DeclaredType, scale: u8) -> String {
    match declared {
        DeclaredType::Date => format!(
            "{:04}-{:02}-{:02}",
            instant.year(),
            u8::from(instant.month()),
            instant.day()
        ),
        DeclaredType::DateTime => format_datetime(instant, 3, false),
        DeclaredType::DateTime2 => format_datetime(instant, scale, false),
        DeclaredType::SmallDateTime => format_datetime(instant, 0, false),
        DeclaredType::DateTimeOffset => format_datetime(instant, scale, true),
        DeclaredType::Time => {
            let mut out = format!(
                "{:02}:{:02}:{:02}",
                instant.hour(),
                instant.minute(),
                instant.second()
            );
            push_fraction(&mut out, instant.nanosecond(), scale);
            out
        }
        _ => format_general(instant),
    }
}

fn format_datetime(instant: &OffsetDateTime, scale: u8, with_offset: bool) -> String {
    let mut out = format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        instant.year(),
        u8::from(instant.month()),
        instant.day(),
        instant.hour(),
        instant.minute(),
        instant.second()
    );
    push_fraction(&mut out, instant.nanosecond(), scale);
    if with_offset {
        push_offset(&mut out, instant.offset());
    }
    out
}

/// General fallback for temporal values in columns with no temporal subtype:
/// RFC 3339 (date, time, and UTC offset).
fn format_general(instant: &OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| format_datetime(instant, 0, true))
}

fn push_fraction(out: &mut String, nanosecond: u32, scale: u8) {
    let scale = scale.min(MAX_TEMPORAL_SCALE);
    if scale == 0 {
        return;
    }
    let digits = nanosecond / 10u32.pow(u32::from(9 - scale));
    let _ = write!(out, ".{digits:0width$}", width = usize::from(scale));
}

fn push_offset(out: &mut String, offset: UtcOffset) {
    let (hours, minutes, _) = offset.as_hms();
    let sign = if hours < 0 || minutes < 0 { '-' } else { '+' };
    let _ = write!(
        out,
        " {sign}{:02}:{:02}",
        hours.unsigned_abs(),
        minutes.unsigned_abs()
    );
}
