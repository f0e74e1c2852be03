//! Purpose: Define the stable public Rust API boundary for rowsink.
//! Exports: Core types and operations needed by driving clients and the CLI.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path intended for external use.
//! Invariants: Additions only; renames and removals are breaking.

mod result_set;

pub use crate::core::column::{
    build_descriptors, ColumnDescriptor, ColumnMeta, DeclaredType, MAX_TEMPORAL_SCALE,
};
pub use crate::core::diag::Diagnostics;
pub use crate::core::encode::{encode, quote_if_needed};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::normalize::{normalize, NormalizedValue, ValueNote, NULL_LITERAL};
pub use crate::core::render::{DelimitedFormatter, Formatter, LINE_TERMINATOR};
pub use crate::core::settings::{ControlCharMode, RenderSettings};
pub use crate::core::value::{RawValue, RowSource};
pub use result_set::{MemoryRow, ResultSet};
