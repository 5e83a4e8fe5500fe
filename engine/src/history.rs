//! History - the caller-facing manager.
//!
//! A [`History`] owns one [`Store`] and one [`Template`] and funnels every
//! operation through them. It adds the pieces that sit around the core:
//! diagnostics in dev mode, the error sink, completion callbacks and the
//! snapshot/persistence round trip.

use crate::{
    error::Result,
    persist::KeyValueStore,
    template::Handler,
    Command, Error, FieldName, HistoryOptions, HistorySnapshot, State, Store, Template,
};
use serde_json::Value;
use std::fmt;

/// Callback receiving every error reported by a history.
pub type ErrorSink = Box<dyn FnMut(&Error)>;

/// An indexed history of states with a single cursor.
pub struct History {
    /// Sequence and cursor
    store: Store,
    /// Handlers run on recall
    template: Template,
    /// Whether to emit diagnostic traces
    dev_mode: bool,
    /// Developer-facing error notification
    error_sink: Option<ErrorSink>,
}

impl History {
    /// Create an empty history with the given template.
    pub fn new(template: Template) -> Self {
        Self {
            store: Store::new(),
            template,
            dev_mode: false,
            error_sink: None,
        }
    }

    /// Create a history from construction options.
    ///
    /// Fails if `initial_cursor` does not address a state of
    /// `initial_sequence`.
    pub fn with_options(template: Template, options: HistoryOptions) -> Result<Self> {
        let store = Store::from_parts(
            options.initial_sequence,
            options.initial_cursor,
            options.delete_rule,
        )?;

        if options.dev_mode {
            tracing::debug!(
                len = store.len(),
                cursor = ?store.current(),
                rule = ?store.delete_rule(),
                fields = ?template.fields(),
                "history created"
            );
        }

        Ok(Self {
            store,
            template,
            dev_mode: options.dev_mode,
            error_sink: None,
        })
    }

    /// Builder method to install the error sink at construction.
    pub fn on_error<F>(mut self, sink: F) -> Self
    where
        F: FnMut(&Error) + 'static,
    {
        self.set_error_sink(sink);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Check if diagnostics are enabled.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Enable or disable diagnostics.
    pub fn set_dev_mode(&mut self, enabled: bool) {
        self.dev_mode = enabled;
    }

    /// Install the error sink, replacing any previous one.
    pub fn set_error_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&Error) + 'static,
    {
        self.error_sink = Some(Box::new(sink));
    }

    /// Remove the error sink.
    pub fn clear_error_sink(&mut self) {
        self.error_sink = None;
    }

    /// Number of stored states.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the history holds no states.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Copy of the state at `index`, without recalling it.
    pub fn get(&self, index: usize) -> Option<State> {
        self.store.get(index)
    }

    /// Check if undo would succeed.
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    /// Check if redo would succeed.
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    // ------------------------------------------------------------------
    // Sequence mutation
    // ------------------------------------------------------------------

    /// Push a state to the tail and move the cursor onto it.
    pub fn append(&mut self, state: State) -> State {
        let stored = self.store.append(state);
        self.trace("append", self.store.current());
        stored
    }

    /// Insert a state at `index` (`0..=len`).
    pub fn insert(&mut self, index: usize, state: State) -> Result<State> {
        let result = self.store.insert(index, state);
        self.finish("insert", Some(index), result)
    }

    /// Remove the state at `index` and return it.
    pub fn delete(&mut self, index: usize) -> Result<State> {
        let result = self.store.delete(index);
        self.finish("delete", Some(index), result)
    }

    /// Put `state` in place of the state at `index`.
    pub fn replace(&mut self, index: usize, state: State) -> Result<State> {
        let result = self.store.replace(index, state);
        self.finish("replace", Some(index), result)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Move the cursor to `index` and dispatch that state through the template.
    pub fn recall(&mut self, index: usize) -> Result<State> {
        let result = self.store.recall(index, &mut self.template);
        self.finish("recall", Some(index), result)
    }

    /// Recall the state before the cursor.
    pub fn undo(&mut self) -> Result<State> {
        let result = self.store.undo(&mut self.template);
        self.finish("undo", None, result)
    }

    /// Recall the state after the cursor.
    pub fn redo(&mut self) -> Result<State> {
        let result = self.store.redo(&mut self.template);
        self.finish("redo", None, result)
    }

    /// The cursor position.
    pub fn current(&self) -> Option<usize> {
        self.store.current()
    }

    /// The first valid index.
    pub fn first(&self) -> Option<usize> {
        self.store.first()
    }

    /// The last valid index.
    pub fn last(&self) -> Option<usize> {
        self.store.last()
    }

    /// Move the cursor without dispatching.
    pub fn set(&mut self, index: usize) -> Result<usize> {
        let result = self.store.set_cursor(index);
        self.finish("set", Some(index), result)
    }

    // ------------------------------------------------------------------
    // Bulk accessors
    // ------------------------------------------------------------------

    /// The active template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Field names covered by the active template.
    pub fn template_fields(&self) -> Vec<FieldName> {
        self.template.fields()
    }

    /// Replace the template, returning the previous one.
    pub fn set_template(&mut self, template: Template) -> Template {
        let previous = std::mem::replace(&mut self.template, template);
        if self.dev_mode {
            tracing::debug!(fields = ?self.template.fields(), "template replaced");
        }
        previous
    }

    /// Replace the template from a JSON descriptor.
    ///
    /// See [`Template::from_descriptor`]. The active template is kept if the
    /// descriptor is rejected.
    pub fn set_template_descriptor<R>(&mut self, descriptor: &Value, resolve: R) -> Result<()>
    where
        R: FnMut(&str, &str) -> Option<Handler>,
    {
        let result = Template::from_descriptor(descriptor, resolve).map(|template| {
            self.set_template(template);
        });
        self.finish("template", None, result)
    }

    /// Copy of every stored state.
    pub fn sequence(&self) -> Vec<State> {
        self.store.sequence()
    }

    /// Replace every stored state. The cursor moves to the new last index.
    pub fn set_sequence(&mut self, sequence: Vec<State>) {
        self.store.set_sequence(sequence);
        self.trace("sequence", None);
    }

    /// Replace every stored state from a JSON array of objects.
    pub fn set_sequence_value(&mut self, value: Value) -> Result<()> {
        let result = self.store.set_sequence_value(value);
        self.finish("sequence", None, result)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Execute a command.
    ///
    /// `Set` yields a copy of the state the cursor lands on, without
    /// dispatching it.
    pub fn execute(&mut self, command: Command) -> Result<State> {
        if self.dev_mode {
            tracing::debug!(
                %command,
                op = command.name(),
                mutates = command.mutates_sequence(),
                "executing command"
            );
        }

        match command {
            Command::Append { state } => Ok(self.append(state)),
            Command::Insert { index, state } => self.insert(index, state),
            Command::Delete { index } => self.delete(index),
            Command::Replace { index, state } => self.replace(index, state),
            Command::Recall { index } => self.recall(index),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Set { index } => {
                self.set(index)?;
                Ok(self.store.get(index).unwrap_or_default())
            }
        }
    }

    /// Execute a command and hand the outcome to `done` before returning it.
    pub fn execute_with<F>(&mut self, command: Command, done: F) -> Result<State>
    where
        F: FnOnce(&Result<State>),
    {
        let result = self.execute(command);
        done(&result);
        result
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Export the current state as a snapshot.
    pub fn export_state(&self) -> HistorySnapshot {
        HistorySnapshot::new(
            self.template.fields(),
            self.store.sequence(),
            self.store.current(),
        )
    }

    /// Replace the sequence and cursor with a snapshot's.
    ///
    /// The active template stays in place; handlers are never part of a
    /// snapshot.
    pub fn import_state(&mut self, snapshot: HistorySnapshot) -> Result<()> {
        let result = self.restore(snapshot);
        self.finish("import", None, result)
    }

    fn restore(&mut self, snapshot: HistorySnapshot) -> Result<()> {
        snapshot.validate()?;

        if self.dev_mode {
            let uncovered: Vec<_> = snapshot
                .template_fields
                .iter()
                .filter(|field| !self.template.contains(field))
                .collect();
            if !uncovered.is_empty() {
                tracing::warn!(?uncovered, "snapshot fields without a handler");
            }
        }

        self.store = Store::from_parts(
            snapshot.sequence,
            snapshot.cursor,
            self.store.delete_rule(),
        )?;
        Ok(())
    }

    /// Serialize the history and store it under `key`.
    pub fn save<S>(&mut self, storage: &mut S, key: &str) -> Result<()>
    where
        S: KeyValueStore + ?Sized,
    {
        let result = self
            .export_state()
            .to_json()
            .and_then(|json| storage.set(key, json));
        self.finish("save", None, result)
    }

    /// Restore the history stored under `key`.
    pub fn load<S>(&mut self, storage: &S, key: &str) -> Result<()>
    where
        S: KeyValueStore + ?Sized,
    {
        let result = storage
            .get(key)
            .and_then(|stored| stored.ok_or_else(|| Error::SnapshotNotFound(key.to_string())))
            .and_then(|json| HistorySnapshot::from_json(&json))
            .and_then(|snapshot| self.restore(snapshot));
        self.finish("load", None, result)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    fn finish<T>(
        &mut self,
        op: &'static str,
        index: Option<usize>,
        result: Result<T>,
    ) -> Result<T> {
        match &result {
            Ok(_) => self.trace(op, index),
            Err(err) => self.report(op, index, err),
        }
        result
    }

    fn trace(&self, op: &'static str, index: Option<usize>) {
        if self.dev_mode {
            tracing::debug!(
                op,
                index = ?index,
                cursor = ?self.store.current(),
                len = self.store.len(),
                "history operation applied"
            );
        }
    }

    fn report(&mut self, op: &'static str, index: Option<usize>, err: &Error) {
        if self.dev_mode {
            tracing::warn!(op, index = ?index, error = %err, "history operation rejected");
        }
        if let Some(sink) = self.error_sink.as_mut() {
            sink(err);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Template::new())
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("store", &self.store)
            .field("template", &self.template)
            .field("dev_mode", &self.dev_mode)
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}
