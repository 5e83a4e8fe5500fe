//! State records and sequence validation.
//!
//! A state is an opaque JSON object. The engine never looks inside one except
//! to hand individual fields to template handlers on recall.

use crate::{error::Result, Error};
use serde_json::Value;

/// A single snapshot stored at one position of the history.
pub type State = serde_json::Map<String, Value>;

/// Convert a JSON value into a [`State`].
///
/// Only objects are accepted.
pub fn state_from_value(value: Value) -> Result<State> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidState(format!(
            "expected an object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Convert a JSON value into an ordered sequence of states.
///
/// The value must be an array whose every element is an object. The whole
/// value is rejected if any element fails.
pub fn sequence_from_value(value: Value) -> Result<Vec<State>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::InvalidSequence(format!(
                "expected an array, got {}",
                json_type_name(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidSequence(format!(
                "element {} is {}, expected an object",
                position,
                json_type_name(&other)
            ))),
        })
        .collect()
}

/// Render a sequence back into a JSON array.
pub fn sequence_to_value(sequence: &[State]) -> Value {
    Value::Array(sequence.iter().cloned().map(Value::Object).collect())
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
