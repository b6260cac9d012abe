use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical type of a column, grouping storage types by interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LType {
    Bool,
    Int,
    Real,
    String,
}

/// Storage type of a column.
///
/// Each storage type has a fixed three-character on-disk code: the element
/// width, the element kind, and the logical category. `Str32` columns store
/// i32 offsets into a shared character buffer, so their element width is the
/// width of one offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SType {
    Bool8,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Str32,
}

impl SType {
    pub const ALL: [SType; 8] = [
        SType::Bool8,
        SType::Int8,
        SType::Int16,
        SType::Int32,
        SType::Int64,
        SType::Float32,
        SType::Float64,
        SType::Str32,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SType::Bool8 => "i1b",
            SType::Int8 => "i1i",
            SType::Int16 => "i2i",
            SType::Int32 => "i4i",
            SType::Int64 => "i8i",
            SType::Float32 => "f4r",
            SType::Float64 => "f8r",
            SType::Str32 => "i4s",
        }
    }

    pub fn from_code(code: &str) -> Option<SType> {
        SType::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn ltype(&self) -> LType {
        match self {
            SType::Bool8 => LType::Bool,
            SType::Int8 | SType::Int16 | SType::Int32 | SType::Int64 => LType::Int,
            SType::Float32 | SType::Float64 => LType::Real,
            SType::Str32 => LType::String,
        }
    }

    /// Width in bytes of one stored element (one offset, for `Str32`).
    pub fn elem_size(&self) -> usize {
        match self {
            SType::Bool8 | SType::Int8 => 1,
            SType::Int16 => 2,
            SType::Int32 | SType::Float32 | SType::Str32 => 4,
            SType::Int64 | SType::Float64 => 8,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, SType::Str32)
    }
}

impl fmt::Display for SType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
