use crate::value::Value;
use serde::{Deserialize, Serialize};
use vellum_types::ParamType;

/// A value bound to one placeholder, with the type it is bound as.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Binding {
    pub value: Value,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

impl Binding {
    pub fn new(value: impl Into<Value>, param_type: ParamType) -> Self {
        Self {
            value: value.into(),
            param_type,
        }
    }

    /// Binds as a string.
    pub fn text(value: impl Into<Value>) -> Self {
        Self::new(value, ParamType::Str)
    }

    /// Binds as an integer.
    pub fn int(value: impl Into<Value>) -> Self {
        Self::new(value, ParamType::Int)
    }

    pub fn null() -> Self {
        Self::new(Value::Null, ParamType::Null)
    }
}
