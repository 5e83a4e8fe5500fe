//! # Rewind Engine
//!
//! An in-memory, indexed history of application snapshots with a single
//! cursor for undo/redo.
//!
//! Callers push full snapshots ("states") into a linear history, edit it
//! positionally, and walk a cursor back and forth through it. Whenever a state
//! is recalled, a caller-supplied template routes each of its fields to a
//! handler so the application can apply it.
//!
//! ## Design Principles
//!
//! - **No IO**: persistence goes through the [`KeyValueStore`] trait
//! - **No partial mutation**: a failed call leaves sequence and cursor untouched
//! - **Isolation**: states are copied on the way in and on the way out
//! - **Linear**: full snapshots only, no diffing, merging or branching
//!
//! ## Core Concepts
//!
//! ### States
//!
//! A [`State`] is a JSON object. The engine never inspects it except to hand
//! fields to template handlers.
//!
//! ### Store and cursor
//!
//! The [`Store`] keeps the ordered sequence and the cursor. Positional edits
//! shift the cursor so it keeps addressing the same state:
//! - append moves the cursor to the new tail
//! - insert at or before the cursor shifts it forward
//! - delete shifts it back according to the [`DeleteCursorRule`]
//!
//! ### Template
//!
//! A [`Template`] maps field names to handlers. On recall (including undo and
//! redo) every field present in both the template and the state is passed to
//! its handler.
//!
//! ## Quick Start
//!
//! ```rust
//! use rewind_engine::{History, Template};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let titles = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&titles);
//! let template = Template::new().with("title", move |value| sink.borrow_mut().push(value));
//!
//! let mut history = History::new(template);
//! history.append(json!({"title": "draft"}).as_object().cloned().unwrap());
//! history.append(json!({"title": "final"}).as_object().cloned().unwrap());
//!
//! let previous = history.undo().unwrap();
//! assert_eq!(previous["title"], "draft");
//! assert_eq!(history.current(), Some(0));
//! assert_eq!(*titles.borrow(), vec![json!("draft")]);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other
//! languages. All data is exchanged as JSON strings.
//!
//! ## Persistence
//!
//! Use [`History::save`] and [`History::load`] with any [`KeyValueStore`], or
//! [`History::export_state`] / [`History::import_state`] with
//! [`HistorySnapshot`] directly. Template handlers are never persisted.

pub mod command;
pub mod config;
pub mod error;
pub mod ffi;
pub mod history;
pub mod persist;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod template;

// Re-export main types at crate root
pub use command::Command;
pub use config::{ConfigError, DeleteCursorRule, HistoryOptions};
pub use error::Error;
pub use history::{ErrorSink, History};
pub use persist::{KeyValueStore, MemoryStore};
pub use snapshot::{HistorySnapshot, SNAPSHOT_FORMAT_VERSION};
pub use state::State;
pub use store::Store;
pub use template::{Handler, Template};

/// Type alias for clarity
pub type FieldName = String;
