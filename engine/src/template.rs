//! Template definition and recall dispatch.
//!
//! A template maps field names to handlers. When a state is recalled, every
//! field present in both the template and the state is handed to its handler.
//! Fields present on only one side are skipped.

use crate::{error::Result, state::json_type_name, Error, FieldName, State};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A unary handler invoked with a copy of one field's value.
pub type Handler = Box<dyn FnMut(Value)>;

/// Mapping from field name to handler.
///
/// Uses BTreeMap so handlers always run in field-name order.
#[derive(Default)]
pub struct Template {
    handlers: BTreeMap<FieldName, Handler>,
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Builder method to add a handler.
    pub fn with<F>(mut self, field: impl Into<FieldName>, handler: F) -> Self
    where
        F: FnMut(Value) + 'static,
    {
        self.insert(field, handler);
        self
    }

    /// Add or replace the handler for a field.
    ///
    /// Returns the previous handler for that field, if any.
    pub fn insert<F>(&mut self, field: impl Into<FieldName>, handler: F) -> Option<Handler>
    where
        F: FnMut(Value) + 'static,
    {
        self.handlers.insert(field.into(), Box::new(handler))
    }

    /// Remove the handler for a field.
    pub fn remove(&mut self, field: &str) -> Option<Handler> {
        self.handlers.remove(field)
    }

    /// Check if a field has a handler.
    pub fn contains(&self, field: &str) -> bool {
        self.handlers.contains_key(field)
    }

    /// Field names covered by this template, in dispatch order.
    pub fn fields(&self) -> Vec<FieldName> {
        self.handlers.keys().cloned().collect()
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the template has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Check whether a JSON value is a well-formed template descriptor.
    ///
    /// A descriptor is an object mapping each field name to the name of a
    /// handler, e.g. `{"title": "setTitle", "zoom": "applyZoom"}`.
    pub fn validate(descriptor: &Value) -> bool {
        Self::check_descriptor(descriptor).is_ok()
    }

    /// Build a template from a descriptor, resolving each handler name.
    ///
    /// `resolve` receives `(field, handler_name)` and returns the handler to
    /// install. The descriptor is rejected as a whole if it is malformed or
    /// if any handler name does not resolve.
    pub fn from_descriptor<R>(descriptor: &Value, mut resolve: R) -> Result<Self>
    where
        R: FnMut(&str, &str) -> Option<Handler>,
    {
        let entries = Self::check_descriptor(descriptor)?;

        let mut handlers = BTreeMap::new();
        for (field, handler_name) in entries {
            let handler = resolve(field, handler_name).ok_or_else(|| {
                Error::InvalidTemplate(format!(
                    "unknown handler '{}' for field '{}'",
                    handler_name, field
                ))
            })?;
            handlers.insert(field.to_string(), handler);
        }

        Ok(Self { handlers })
    }

    fn check_descriptor(descriptor: &Value) -> Result<Vec<(&str, &str)>> {
        let map = descriptor.as_object().ok_or_else(|| {
            Error::InvalidTemplate(format!(
                "expected an object, got {}",
                json_type_name(descriptor)
            ))
        })?;

        map.iter()
            .map(|(field, value)| match value.as_str() {
                Some(handler_name) => Ok((field.as_str(), handler_name)),
                None => Err(Error::InvalidTemplate(format!(
                    "field '{}' maps to {}, expected a handler name",
                    field,
                    json_type_name(value)
                ))),
            })
            .collect()
    }

    /// Run every handler whose field is present in `state`.
    ///
    /// Each handler receives its own copy of the field value. Returns the
    /// number of handlers invoked.
    pub fn dispatch(&mut self, state: &State) -> usize {
        let mut invoked = 0;
        for (field, handler) in self.handlers.iter_mut() {
            if let Some(value) = state.get(field) {
                handler(value.clone());
                invoked += 1;
            }
        }
        invoked
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("fields", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
