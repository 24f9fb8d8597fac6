use crate::value::Value;
use vellum_types::{Dialect, ParamType};

/// Renders values as SQL literals.
///
/// Literal `IN (...)` lists and debug interpolation go through this trait so
/// a connection can substitute its driver's own quoting.
pub trait Quote {
    fn quote(&self, value: &Value, param_type: ParamType) -> String;
}

impl Quote for Dialect {
    fn quote(&self, value: &Value, param_type: ParamType) -> String {
        match (value, param_type) {
            (Value::Null, _) | (_, ParamType::Null) => "NULL".to_string(),
            (_, ParamType::Int) => value.to_int_lossy().to_string(),
            (Value::Bool(_) | Value::Integer(_), ParamType::Bool) => {
                if value.to_int_lossy() != 0 { "1" } else { "0" }.to_string()
            }
            (Value::Blob(bytes), _) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                match self {
                    Dialect::PostgreSQL => format!("'\\x{hex}'"),
                    Dialect::SQLite | Dialect::MySQL => format!("X'{hex}'"),
                }
            }
            (other, _) => {
                let text = other.to_key_string().unwrap_or_default();
                quote_text(*self, &text)
            }
        }
    }
}

fn quote_text(dialect: Dialect, text: &str) -> String {
    let q = dialect.quote_char();
    let mut out = String::with_capacity(text.len() + 2);
    out.push(q);
    for ch in text.chars() {
        match ch {
            c if c == q => {
                out.push(q);
                out.push(q);
            }
            '\\' if dialect == Dialect::MySQL => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push(q);
    out
}
