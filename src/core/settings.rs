//! Purpose: Hold caller-supplied rendering configuration for one batch.
//! Exports: `RenderSettings`, `ControlCharMode`.
//! Role: The configuration contract between the driving client and the renderer.
//! Invariants: Settings are read at `begin_batch` and stable for the batch.
//! Invariants: The separator is an arbitrary string, never assumed to be a comma.

/// Treatment of control characters embedded in character-typed columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlCharMode {
    /// Emit control characters unchanged.
    Pass,
    /// Remove control characters from the output.
    Strip,
    /// Replace each control character with a single space.
    Substitute,
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub column_separator: String,
    pub max_fixed_col_width: usize,
    pub max_var_col_width: usize,
    pub control_chars: ControlCharMode,
    pub redirect_messages: bool,
}

impl RenderSettings {
    pub fn new() -> Self {
        Self {
            column_separator: ",".to_string(),
            max_fixed_col_width: 0,
            max_var_col_width: 256,
            control_chars: ControlCharMode::Pass,
            redirect_messages: false,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new()
    }
}
