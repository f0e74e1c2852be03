//! Purpose: Escape a normalized value for the delimited output format.
//! Exports: `encode`, `quote_if_needed`.
//! Role: Last transformation before a cell reaches the line buffer.
//! Invariants: Quoting triggers on the configured separator, never a fixed comma.
//! Invariants: Control treatment applies uniformly to every control character.

use crate::core::column::ColumnDescriptor;
use crate::core::settings::ControlCharMode;

pub fn encode(
    text: String,
    column: &ColumnDescriptor,
    separator: &str,
    control: ControlCharMode,
) -> String {
    let mut text = text;
    if column.declared.is_character() {
        text = apply_control_chars(text, control);
    }
    if column.is_binary {
        text.insert_str(0, "0x");
    }
    quote_if_needed(text, separator)
}

/// Wraps the value in double quotes, doubling interior quotes, when it
/// contains the active separator. Column names go through this step too.
pub fn quote_if_needed(text: String, separator: &str) -> String {
    if separator.is_empty() || !text.contains(separator) {
        return text;
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn apply_control_chars(text: String, control: ControlCharMode) -> String {
    match control {
        ControlCharMode::Pass => text,
        ControlCharMode::Strip => {
            if text.chars().any(char::is_control) {
                text.chars().filter(|ch| !ch.is_control()).collect()
            } else {
                text
            }
        }
        ControlCharMode::Substitute => {
            if text.chars().any(char::is_control) {
                text.chars()
                    .map(|ch| if ch.is_control() { ' ' } else { ch })
                    .collect()
            } else {
                text
            }
        }
    }
}
