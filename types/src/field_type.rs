//! Declared field types recorded in model metadata.

/// The declared type of a model field.
///
/// This decides how criteria values for the field are bound: fields of a
/// [quotable](FieldType::is_quotable) type bind as strings, everything else
/// binds as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldType {
    Integer,
    Boolean,
    Float,
    #[default]
    String,
    Password,
    Date,
    Datetime,
    Timestamp,
    Time,
    Json,
    Array,
    Binary,
    Bit,
}

impl FieldType {
    /// Returns `true` when values of this type are bound and quoted as strings.
    #[must_use]
    pub const fn is_quotable(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Password
                | FieldType::Date
                | FieldType::Datetime
                | FieldType::Timestamp
                | FieldType::Time
                | FieldType::Json
                | FieldType::Array
                | FieldType::Float
        )
    }

    /// Maps a database column type name (e.g. `VARCHAR(255)`, `int unsigned`)
    /// to the field type used for binding. Unknown types map to `String`.
    #[must_use]
    pub fn from_db_type(db_type: &str) -> Self {
        let upper = db_type.trim().to_ascii_uppercase();
        let base = upper
            .split(|c: char| c == '(' || c.is_ascii_whitespace())
            .next()
            .unwrap_or_default();

        if upper.contains("INT") {
            FieldType::Integer
        } else if base.starts_with("BOOL") {
            FieldType::Boolean
        } else if base.starts_with("DEC")
            || base == "NUMERIC"
            || base == "FLOAT"
            || base.starts_with("DOUBLE")
            || base.starts_with("REAL")
        {
            FieldType::Float
        } else if upper.contains("CHAR")
            || upper.contains("TEXT")
            || matches!(base, "ENUM" | "SET" | "TIME" | "YEAR")
        {
            FieldType::String
        } else if base == "TIMESTAMP" {
            FieldType::Timestamp
        } else if base == "DATETIME" {
            FieldType::Datetime
        } else if base == "DATE" {
            FieldType::Date
        } else if upper.contains("BINARY") || upper.contains("BLOB") {
            FieldType::Binary
        } else if base == "BIT" {
            FieldType::Bit
        } else {
            FieldType::String
        }
    }

    /// Lowercase name as used in metadata maps.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Password => "password",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Timestamp => "timestamp",
            FieldType::Time => "time",
            FieldType::Json => "json",
            FieldType::Array => "array",
            FieldType::Binary => "binary",
            FieldType::Bit => "bit",
        }
    }
}

impl core::fmt::Display for FieldType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for FieldType {
    type Err = FieldTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "integer" | "int" => FieldType::Integer,
            "boolean" | "bool" => FieldType::Boolean,
            "float" => FieldType::Float,
            "string" => FieldType::String,
            "password" => FieldType::Password,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "timestamp" => FieldType::Timestamp,
            "time" => FieldType::Time,
            "json" => FieldType::Json,
            "array" => FieldType::Array,
            "binary" => FieldType::Binary,
            "bit" => FieldType::Bit,
            _ => return Err(FieldTypeParseError),
        };
        Ok(ty)
    }
}

/// Error returned when parsing an unknown field type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTypeParseError;

impl core::fmt::Display for FieldTypeParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown field type")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FieldTypeParseError {}
