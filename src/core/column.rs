//! Purpose: Derive per-column formatting metadata from driver column metadata.
//! Exports: `ColumnMeta`, `DeclaredType`, `ColumnDescriptor`, `build_descriptors`.
//! Role: Runs once per result set; everything downstream keys off the descriptors.
//! Invariants: Descriptors are immutable for the lifetime of the result set.
//! Invariants: Zero input columns produce an empty descriptor set, not an error.

pub const MAX_TEMPORAL_SCALE: u8 = 7;

/// Column metadata as the driver layer hands it over at result-set open.
#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub display_size: Option<usize>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            precision: None,
            scale: None,
            display_size: None,
        }
    }

    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_display_size(mut self, display_size: usize) -> Self {
        self.display_size = Some(display_size);
        self
    }
}

/// The engine type names the renderer distinguishes. Anything the parser does
/// not recognize lands in `Other` and takes the general formatting paths.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeclaredType {
    Char,
    VarChar,
    NChar,
    NVarChar,
    Text,
    NText,
    Xml,
    Binary,
    VarBinary,
    Image,
    RowVersion,
    UniqueIdentifier,
    Date,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Time,
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Numeric,
    Money,
    SmallMoney,
    Real,
    Float,
    Other,
}

impl DeclaredType {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "CHAR" => DeclaredType::Char,
            "VARCHAR" => DeclaredType::VarChar,
            "NCHAR" => DeclaredType::NChar,
            "NVARCHAR" => DeclaredType::NVarChar,
            "TEXT" => DeclaredType::Text,
            "NTEXT" => DeclaredType::NText,
            "XML" => DeclaredType::Xml,
            "BINARY" => DeclaredType::Binary,
            "VARBINARY" => DeclaredType::VarBinary,
            "IMAGE" => DeclaredType::Image,
            // The engine reports rowversion columns under their legacy name.
            "TIMESTAMP" | "ROWVERSION" => DeclaredType::RowVersion,
            "UNIQUEIDENTIFIER" => DeclaredType::UniqueIdentifier,
            "DATE" => DeclaredType::Date,
            "DATETIME" => DeclaredType::DateTime,
            "DATETIME2" => DeclaredType::DateTime2,
            "SMALLDATETIME" => DeclaredType::SmallDateTime,
            "DATETIMEOFFSET" => DeclaredType::DateTimeOffset,
            "TIME" => DeclaredType::Time,
            "BIT" => DeclaredType::Bit,
            "TINYINT" => DeclaredType::TinyInt,
            "SMALLINT" => DeclaredType::SmallInt,
            "INT" => DeclaredType::Int,
            "BIGINT" => DeclaredType::BigInt,
            "DECIMAL" => DeclaredType::Decimal,
            "NUMERIC" => DeclaredType::Numeric,
            "MONEY" => DeclaredType::Money,
            "SMALLMONEY" => DeclaredType::SmallMoney,
            "REAL" => DeclaredType::Real,
            "FLOAT" => DeclaredType::Float,
            _ => DeclaredType::Other,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            DeclaredType::Binary
                | DeclaredType::VarBinary
                | DeclaredType::Image
                | DeclaredType::RowVersion
        )
    }

    pub fn is_identifier(self) -> bool {
        self == DeclaredType::UniqueIdentifier
    }

    /// Character columns may carry embedded control bytes and get the
    /// configured control-character treatment.
    pub fn is_character(self) -> bool {
        matches!(
            self,
            DeclaredType::Char
                | DeclaredType::VarChar
                | DeclaredType::NChar
                | DeclaredType::NVarChar
                | DeclaredType::Text
                | DeclaredType::NText
                | DeclaredType::Xml
        )
    }

    /// Variable-size columns are capped by the variable width limit; all other
    /// columns fall under the fixed limit.
    fn is_variable_size(self) -> bool {
        matches!(
            self,
            DeclaredType::VarChar
                | DeclaredType::NVarChar
                | DeclaredType::Text
                | DeclaredType::NText
                | DeclaredType::Xml
                | DeclaredType::VarBinary
                | DeclaredType::Image
        )
    }
}

#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared: DeclaredType,
    pub is_binary: bool,
    pub is_identifier: bool,
    pub scale: u8,
    pub width: usize,
}

/// Builds one descriptor per column and returns the longest column-name
/// length alongside. The name length is unused by the delimited encoder but
/// kept for interface parity with fixed-width companion renderers.
pub fn build_descriptors(
    columns: &[ColumnMeta],
    max_fixed_width: usize,
    max_var_width: usize,
) -> (Vec<ColumnDescriptor>, usize) {
    let mut descriptors = Vec::with_capacity(columns.len());
    let mut max_name_len = 0usize;

    for meta in columns {
        let declared = DeclaredType::parse(&meta.type_name);
        let name_len = meta.name.chars().count();
        max_name_len = max_name_len.max(name_len);

        let declared_size = meta
            .display_size
            .or_else(|| meta.precision.map(usize::from))
            .unwrap_or(0);
        let cap = if declared.is_variable_size() {
            max_var_width
        } else {
            max_fixed_width
        };
        // A zero cap means unlimited, matching the client's width options.
        let clipped = if cap > 0 {
            declared_size.min(cap)
        } else {
            declared_size
        };
        let width = clipped.max(name_len);

        descriptors.push(ColumnDescriptor {
            name: meta.name.clone(),
            declared,
            is_binary: declared.is_binary(),
            is_identifier: declared.is_identifier(),
            scale: meta.scale.unwrap_or(0).min(MAX_TEMPORAL_SCALE),
            width,
        });
    }

    (descriptors, max_name_len)
}
