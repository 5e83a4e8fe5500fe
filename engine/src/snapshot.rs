//! Snapshot types for persisting and restoring a history.
//!
//! A snapshot carries the `(template, sequence, cursor)` triple in a
//! serializable shape. Template handlers are functions and never survive
//! serialization; only the names of the fields they cover are recorded, and
//! handlers must be supplied again on restore.

use crate::{error::Result, Error, FieldName, State};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Fields the template covered when the snapshot was taken
    #[serde(default)]
    pub template_fields: Vec<FieldName>,
    /// Stored states in history order
    pub sequence: Vec<State>,
    /// Cursor position, `None` for an empty sequence
    pub cursor: Option<usize>,
}

impl HistorySnapshot {
    /// Create a snapshot from its parts.
    pub fn new(
        template_fields: Vec<FieldName>,
        sequence: Vec<State>,
        cursor: Option<usize>,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            template_fields,
            sequence,
            cursor,
        }
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Check if the snapshot holds no states.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Check that the cursor agrees with the sequence.
    pub fn validate(&self) -> Result<()> {
        match (self.cursor, self.sequence.len()) {
            (None, 0) => Ok(()),
            (None, len) => Err(Error::InvalidSnapshot(format!(
                "missing cursor for sequence of length {}",
                len
            ))),
            (Some(cursor), len) if cursor >= len => Err(Error::InvalidSnapshot(format!(
                "cursor {} out of range for sequence of length {}",
                cursor, len
            ))),
            (Some(_), _) => Ok(()),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        snapshot.validate()?;
        Ok(snapshot)
    }
}
