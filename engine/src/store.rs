//! Store - the indexed sequence of states and its cursor.
//!
//! The Store owns every positional mutation and the cursor adjustment each one
//! triggers. Each operation either moves `(sequence, cursor)` to a new valid
//! pair or fails and leaves both untouched.

use crate::{
    config::DeleteCursorRule, error::Result, state::sequence_from_value, Error, State, Template,
};

/// Ordered sequence of states plus the current position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    /// States in history order
    sequence: Vec<State>,
    /// Current position, `None` only while the sequence is empty
    cursor: Option<usize>,
    /// How delete moves the cursor
    delete_rule: DeleteCursorRule,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store using the given delete rule.
    pub fn with_delete_rule(delete_rule: DeleteCursorRule) -> Self {
        Self {
            sequence: Vec::new(),
            cursor: None,
            delete_rule,
        }
    }

    /// Create a store from an existing sequence.
    ///
    /// A missing cursor defaults to the last index. A cursor outside the
    /// sequence is rejected.
    pub fn from_parts(
        sequence: Vec<State>,
        cursor: Option<usize>,
        delete_rule: DeleteCursorRule,
    ) -> Result<Self> {
        let mut store = Self::with_delete_rule(delete_rule);
        store.set_sequence(sequence);
        if let Some(index) = cursor {
            store.set_cursor(index)?;
        }
        Ok(store)
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Check if the store holds no states.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// The current cursor position.
    pub fn current(&self) -> Option<usize> {
        self.cursor
    }

    /// The first valid index.
    pub fn first(&self) -> Option<usize> {
        if self.sequence.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    /// The last valid index.
    pub fn last(&self) -> Option<usize> {
        self.sequence.len().checked_sub(1)
    }

    /// The rule applied to the cursor on delete.
    pub fn delete_rule(&self) -> DeleteCursorRule {
        self.delete_rule
    }

    /// Check if undo would succeed.
    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    /// Check if redo would succeed.
    pub fn can_redo(&self) -> bool {
        match (self.cursor, self.last()) {
            (Some(cursor), Some(last)) => cursor < last,
            _ => false,
        }
    }

    /// Get a copy of the state at `index` without moving the cursor.
    pub fn get(&self, index: usize) -> Option<State> {
        self.sequence.get(index).cloned()
    }

    /// Get a copy of the whole sequence.
    pub fn sequence(&self) -> Vec<State> {
        self.sequence.clone()
    }

    /// Replace the whole sequence and move the cursor to its last index.
    pub fn set_sequence(&mut self, sequence: Vec<State>) {
        self.sequence = sequence;
        self.cursor = self.last();
    }

    /// Replace the whole sequence from a JSON array of objects.
    ///
    /// Nothing changes if the value is not a valid sequence.
    pub fn set_sequence_value(&mut self, value: serde_json::Value) -> Result<()> {
        let sequence = sequence_from_value(value)?;
        self.set_sequence(sequence);
        Ok(())
    }

    /// Move the cursor to an existing index without recalling it.
    pub fn set_cursor(&mut self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        self.cursor = Some(index);
        Ok(index)
    }

    /// Remove every state.
    pub fn clear(&mut self) {
        self.sequence.clear();
        self.cursor = None;
    }

    /// Push a state to the tail and move the cursor onto it.
    pub fn append(&mut self, state: State) -> State {
        self.sequence.push(state.clone());
        self.cursor = self.last();
        state
    }

    /// Insert a state at `index`, shifting later states back by one.
    ///
    /// Valid indices are `0..=len`. When the insertion point is at or before
    /// the cursor, the cursor moves with the state it was pointing at.
    pub fn insert(&mut self, index: usize, state: State) -> Result<State> {
        if index > self.sequence.len() {
            return Err(Error::invalid_index(index, self.sequence.len()));
        }

        self.sequence.insert(index, state.clone());
        self.cursor = match self.cursor {
            Some(cursor) if index <= cursor => Some(cursor + 1),
            Some(cursor) => Some(cursor),
            None => Some(index),
        };

        Ok(state)
    }

    /// Remove the state at `index` and return it.
    pub fn delete(&mut self, index: usize) -> Result<State> {
        self.check_index(index)?;

        let removed = self.sequence.remove(index);
        self.cursor = self.cursor_after_delete(index);

        Ok(removed)
    }

    fn cursor_after_delete(&self, index: usize) -> Option<usize> {
        let last = self.last()?;
        self.cursor.map(|cursor| {
            let moved = match self.delete_rule {
                DeleteCursorRule::FollowRecord if index > cursor => Some(cursor),
                _ => cursor.checked_sub(1),
            };
            // Deleting at 0 with the cursor at 0 leaves it on the new head.
            moved.unwrap_or(0).min(last)
        })
    }

    /// Delete the state at `index` and insert `state` in its place.
    ///
    /// Away from the cursor, the cursor moves exactly as a delete followed by
    /// an insert would move it. Replacing the state under the cursor leaves
    /// the cursor on the new state. Fails without touching anything if
    /// `index` is out of range.
    pub fn replace(&mut self, index: usize, state: State) -> Result<State> {
        self.check_index(index)?;

        let at_cursor = self.cursor == Some(index);
        self.delete(index)?;
        let inserted = self.insert(index, state)?;
        if at_cursor {
            self.cursor = Some(index);
        }

        Ok(inserted)
    }

    /// Move the cursor to `index` and run the state there through `template`.
    pub fn recall(&mut self, index: usize, template: &mut Template) -> Result<State> {
        self.check_index(index)?;

        self.cursor = Some(index);
        let state = self.sequence[index].clone();
        template.dispatch(&state);

        Ok(state)
    }

    /// Recall the state before the cursor.
    pub fn undo(&mut self, template: &mut Template) -> Result<State> {
        match self.cursor {
            Some(cursor) if cursor > 0 => self.recall(cursor - 1, template),
            _ => Err(Error::NothingToUndo),
        }
    }

    /// Recall the state after the cursor.
    pub fn redo(&mut self, template: &mut Template) -> Result<State> {
        match self.cursor {
            Some(cursor) if self.can_redo() => self.recall(cursor + 1, template),
            _ => Err(Error::NothingToRedo),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.sequence.len() {
            Ok(())
        } else {
            Err(Error::invalid_index(index, self.sequence.len()))
        }
    }
}
