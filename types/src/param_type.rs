//! Bind types for statement parameters.

/// The type a parameter is bound with.
///
/// Criteria parsing infers one of these for every bound value from the
/// field's metadata; the execution layer uses it to choose how a value is
/// sent or quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ParamType {
    Null,
    Int,
    #[default]
    Str,
    Bool,
}

impl ParamType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParamType::Null => "null",
            ParamType::Int => "int",
            ParamType::Str => "str",
            ParamType::Bool => "bool",
        }
    }
}

impl core::fmt::Display for ParamType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
