//! Command types describing history operations.
//!
//! Every mutating or navigating call on a [`History`](crate::History) can also
//! be expressed as a [`Command`], which is how operations cross the FFI
//! boundary and how callers attach a completion callback.

use crate::{state::state_from_value, Error, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An operation that can be executed against a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Push a state to the tail
    Append { state: State },
    /// Insert a state at a position
    Insert { index: usize, state: State },
    /// Remove the state at a position
    Delete { index: usize },
    /// Swap the state at a position for a new one
    Replace { index: usize, state: State },
    /// Move the cursor to a position and dispatch that state
    Recall { index: usize },
    /// Recall the state before the cursor
    Undo,
    /// Recall the state after the cursor
    Redo,
    /// Move the cursor without dispatching
    Set { index: usize },
}

impl Command {
    /// Parse a command from JSON.
    ///
    /// A `state` payload that is not an object is reported as
    /// [`Error::InvalidState`]; any other malformed input as
    /// [`Error::InvalidCommand`].
    pub fn from_value(mut value: Value) -> crate::error::Result<Self> {
        if let Some(state) = value.get_mut("state") {
            *state = Value::Object(state_from_value(state.take())?);
        }
        serde_json::from_value(value).map_err(|e| Error::InvalidCommand(e.to_string()))
    }

    /// Short name of the command, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Append { .. } => "append",
            Command::Insert { .. } => "insert",
            Command::Delete { .. } => "delete",
            Command::Replace { .. } => "replace",
            Command::Recall { .. } => "recall",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::Set { .. } => "set",
        }
    }

    /// The position this command targets, if it takes one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Command::Insert { index, .. }
            | Command::Delete { index }
            | Command::Replace { index, .. }
            | Command::Recall { index }
            | Command::Set { index } => Some(*index),
            Command::Append { .. } | Command::Undo | Command::Redo => None,
        }
    }

    /// Whether the command changes the stored sequence (as opposed to only
    /// moving the cursor).
    pub fn mutates_sequence(&self) -> bool {
        matches!(
            self,
            Command::Append { .. }
                | Command::Insert { .. }
                | Command::Delete { .. }
                | Command::Replace { .. }
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "{}({})", self.name(), index),
            None => write!(f, "{}", self.name()),
        }
    }
}
