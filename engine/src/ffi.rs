//! FFI layer for host-language bindings.
//!
//! This module provides C-compatible functions callable from any language with
//! a C FFI. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `rewind_*` functions are allocated by Rust
//! - Caller must free them with `rewind_string_free`
//! - History pointers must be freed with `rewind_history_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! # Template handlers
//!
//! A template is installed from a descriptor such as
//! `{"title": "setTitle"}` together with one C callback. On recall the
//! callback receives the field name, the handler name from the descriptor,
//! the field value as JSON and the caller's `user_data` pointer.

use crate::{
    template::Handler, Command, DeleteCursorRule, History, HistoryOptions, HistorySnapshot,
    State, Template,
};
use serde::Deserialize;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

/// Callback invoked for each dispatched field.
pub type RewindFieldCallback = unsafe extern "C" fn(
    field: *const c_char,
    handler: *const c_char,
    value_json: *const c_char,
    user_data: *mut c_void,
);

/// Callback invoked with the message of every rejected operation.
pub type RewindErrorCallback = unsafe extern "C" fn(message: *const c_char, user_data: *mut c_void);

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: serde::Serialize> From<crate::error::Result<T>> for FfiResult<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => FfiResult::ok(value),
            Err(e) => FfiResult::err(e.to_string()),
        }
    }
}

/// Construction options as they arrive over FFI.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FfiOptions {
    dev_mode: bool,
    initial_sequence: Vec<State>,
    initial_cursor: Option<usize>,
    delete_rule: DeleteCursorRule,
}

impl From<FfiOptions> for HistoryOptions {
    fn from(options: FfiOptions) -> Self {
        HistoryOptions {
            dev_mode: options.dev_mode,
            initial_sequence: options.initial_sequence,
            initial_cursor: options.initial_cursor,
            delete_rule: options.delete_rule,
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `rewind_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

fn respond<T: serde::Serialize>(result: crate::error::Result<T>) -> *mut c_char {
    to_c_string(FfiResult::from(result).to_json())
}

fn respond_err(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn position(index: Option<usize>) -> i64 {
    index
        .and_then(|i| i64::try_from(i).ok())
        .unwrap_or(-1)
}

// ============================================================================
// History Lifecycle
// ============================================================================

/// Create a new history with an empty template.
///
/// # Arguments
/// - `options_json`: JSON object with optional `devMode`, `initialSequence`,
///   `initialCursor` and `deleteRule`, or null for defaults
///
/// # Returns
/// Pointer to History, or null on failure.
///
/// # Safety
/// - `options_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `rewind_history_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_new(options_json: *const c_char) -> *mut History {
    let options = match from_c_string(options_json) {
        Some(s) => match serde_json::from_str::<FfiOptions>(&s) {
            Ok(o) => o,
            Err(_) => return ptr::null_mut(),
        },
        None => FfiOptions::default(),
    };

    match History::with_options(Template::new(), options.into()) {
        Ok(history) => Box::into_raw(Box::new(history)),
        Err(_) => ptr::null_mut(),
    }
}

/// Create a new history configured from `REWIND_DEV_MODE` and
/// `REWIND_DELETE_RULE`.
///
/// # Returns
/// Pointer to History, or null if either variable holds an invalid value.
///
/// # Safety
/// - Caller must free the returned pointer with `rewind_history_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_new_from_env() -> *mut History {
    let options = match HistoryOptions::from_env() {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(error = %e, "rejected environment configuration");
            return ptr::null_mut();
        }
    };

    match History::with_options(Template::new(), options) {
        Ok(history) => Box::into_raw(Box::new(history)),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a history.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rewind_history_free(history: *mut History) {
    if !history.is_null() {
        drop(Box::from_raw(history));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `rewind_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rewind_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// History Operations
// ============================================================================

/// Execute a command against the history.
///
/// # Arguments
/// - `command_json`: JSON string of Command, e.g. `{"type": "undo"}`
///
/// # Returns
/// JSON string: `{"ok": State}` or `{"error": "message"}`
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - `command_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_execute(
    history: *mut History,
    command_json: *const c_char,
) -> *mut c_char {
    let history = match history.as_mut() {
        Some(h) => h,
        None => return respond_err("null history pointer"),
    };

    let command_str = match from_c_string(command_json) {
        Some(s) => s,
        None => return respond_err("invalid command JSON"),
    };

    let value: serde_json::Value = match serde_json::from_str(&command_str) {
        Ok(v) => v,
        Err(e) => return respond_err(format!("parse error: {}", e)),
    };

    match Command::from_value(value) {
        Ok(command) => respond(history.execute(command)),
        Err(e) => respond::<State>(Err(e)),
    }
}

/// Get every stored state.
///
/// # Returns
/// JSON string: `{"ok": [State, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_sequence(history: *const History) -> *mut c_char {
    match history.as_ref() {
        Some(h) => respond(Ok(h.sequence())),
        None => respond_err("null history pointer"),
    }
}

/// Replace every stored state. The cursor moves to the new last index.
///
/// # Arguments
/// - `sequence_json`: JSON array of objects
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - `sequence_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_set_sequence(
    history: *mut History,
    sequence_json: *const c_char,
) -> *mut c_char {
    let history = match history.as_mut() {
        Some(h) => h,
        None => return respond_err("null history pointer"),
    };

    let sequence_str = match from_c_string(sequence_json) {
        Some(s) => s,
        None => return respond_err("invalid sequence JSON"),
    };

    let value: serde_json::Value = match serde_json::from_str(&sequence_str) {
        Ok(v) => v,
        Err(e) => return respond_err(format!("parse error: {}", e)),
    };

    respond(history.set_sequence_value(value))
}

/// Install a template from a descriptor and a field callback.
///
/// # Arguments
/// - `descriptor_json`: JSON object mapping field name to handler name
/// - `callback`: invoked for each dispatched field; may be null only for an
///   empty descriptor
/// - `user_data`: passed through to `callback` untouched
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`. The previous
/// template is kept on error.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - `descriptor_json` must be a valid null-terminated C string or null
/// - `callback` and `user_data` must stay valid while the template is installed
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_set_template(
    history: *mut History,
    descriptor_json: *const c_char,
    callback: Option<RewindFieldCallback>,
    user_data: *mut c_void,
) -> *mut c_char {
    let history = match history.as_mut() {
        Some(h) => h,
        None => return respond_err("null history pointer"),
    };

    let descriptor_str = match from_c_string(descriptor_json) {
        Some(s) => s,
        None => return respond_err("invalid template JSON"),
    };

    let descriptor: serde_json::Value = match serde_json::from_str(&descriptor_str) {
        Ok(v) => v,
        Err(e) => return respond_err(format!("parse error: {}", e)),
    };

    let result = history.set_template_descriptor(&descriptor, |field, handler_name| {
        let callback = callback?;
        let field = CString::new(field).ok()?;
        let handler_name = CString::new(handler_name).ok()?;
        let handler: Handler = Box::new(move |value: serde_json::Value| {
            let Ok(value_json) = CString::new(value.to_string()) else {
                return;
            };
            unsafe {
                callback(
                    field.as_ptr(),
                    handler_name.as_ptr(),
                    value_json.as_ptr(),
                    user_data,
                );
            }
        });
        Some(handler)
    });

    respond(result)
}

/// Install an error callback, or remove it when `callback` is null.
///
/// The callback receives the error message of every failed operation, in
/// addition to the `{"error": ...}` response of the call itself.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - `callback` and `user_data` must stay valid while the callback is installed
#[no_mangle]
pub unsafe extern "C" fn rewind_history_set_error_callback(
    history: *mut History,
    callback: Option<RewindErrorCallback>,
    user_data: *mut c_void,
) {
    let Some(history) = history.as_mut() else {
        return;
    };

    match callback {
        Some(callback) => history.set_error_sink(move |err: &crate::Error| {
            let Ok(message) = CString::new(err.to_string()) else {
                return;
            };
            unsafe { callback(message.as_ptr(), user_data) };
        }),
        None => history.clear_error_sink(),
    }
}

/// Get the cursor position, or -1 if there is none.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
#[no_mangle]
pub unsafe extern "C" fn rewind_history_current(history: *const History) -> i64 {
    history.as_ref().map_or(-1, |h| position(h.current()))
}

/// Get the first valid index, or -1 if the history is empty.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
#[no_mangle]
pub unsafe extern "C" fn rewind_history_first(history: *const History) -> i64 {
    history.as_ref().map_or(-1, |h| position(h.first()))
}

/// Get the last valid index, or -1 if the history is empty.
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
#[no_mangle]
pub unsafe extern "C" fn rewind_history_last(history: *const History) -> i64 {
    history.as_ref().map_or(-1, |h| position(h.last()))
}

// ============================================================================
// Persistence
// ============================================================================

/// Export the history as a snapshot.
///
/// # Returns
/// JSON string: `{"ok": HistorySnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_export(history: *const History) -> *mut c_char {
    match history.as_ref() {
        Some(h) => respond(Ok(h.export_state())),
        None => respond_err("null history pointer"),
    }
}

/// Import a snapshot, replacing sequence and cursor.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `history` must be a valid pointer from `rewind_history_new` or null
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rewind_string_free`
#[no_mangle]
pub unsafe extern "C" fn rewind_history_import(
    history: *mut History,
    snapshot_json: *const c_char,
) -> *mut c_char {
    let history = match history.as_mut() {
        Some(h) => h,
        None => return respond_err("null history pointer"),
    };

    let snapshot_str = match from_c_string(snapshot_json) {
        Some(s) => s,
        None => return respond_err("invalid snapshot JSON"),
    };

    let snapshot = match HistorySnapshot::from_json(&snapshot_str) {
        Ok(s) => s,
        Err(e) => return respond_err(e.to_string()),
    };

    respond(history.import_state(snapshot))
}

// ============================================================================
// Utility
// ============================================================================

/// Install a global `tracing` subscriber writing to stderr.
///
/// The filter is read from `RUST_LOG`, defaulting to `rewind_engine=debug`.
/// Returns 1 if the subscriber was installed, 0 if one was already set.
#[no_mangle]
pub extern "C" fn rewind_init_logging() -> i32 {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewind_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();

    i32::from(installed)
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn rewind_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn rewind_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        let json = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        rewind_string_free(ptr);
        serde_json::from_str(&json).unwrap()
    }

    unsafe fn execute(history: *mut History, command: &str) -> serde_json::Value {
        let command = CString::new(command).unwrap();
        take_json(rewind_history_execute(history, command.as_ptr()))
    }

    unsafe extern "C" fn record_field(
        field: *const c_char,
        handler: *const c_char,
        value_json: *const c_char,
        user_data: *mut c_void,
    ) {
        let calls = &mut *(user_data as *mut Vec<String>);
        calls.push(format!(
            "{}/{}={}",
            CStr::from_ptr(field).to_str().unwrap(),
            CStr::from_ptr(handler).to_str().unwrap(),
            CStr::from_ptr(value_json).to_str().unwrap(),
        ));
    }

    #[test]
    fn ffi_history_lifecycle() {
        unsafe {
            let history = rewind_history_new(ptr::null());
            assert!(!history.is_null());
            assert_eq!(rewind_history_current(history), -1);
            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_history_with_options() {
        unsafe {
            let options = CString::new(
                r#"{"initialSequence": [{"x": 1}, {"x": 2}, {"x": 3}], "initialCursor": 1}"#,
            )
            .unwrap();
            let history = rewind_history_new(options.as_ptr());
            assert!(!history.is_null());

            assert_eq!(rewind_history_current(history), 1);
            assert_eq!(rewind_history_first(history), 0);
            assert_eq!(rewind_history_last(history), 2);

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_history_from_env() {
        let _guard = crate::config::ENV_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        unsafe {
            std::env::set_var("REWIND_DELETE_RULE", "always");
            std::env::remove_var("REWIND_DEV_MODE");
            let history = rewind_history_new_from_env();
            assert!(!history.is_null());
            assert_eq!(
                (*history).store().delete_rule(),
                DeleteCursorRule::AlwaysDecrement
            );
            rewind_history_free(history);

            std::env::set_var("REWIND_DELETE_RULE", "sometimes");
            assert!(rewind_history_new_from_env().is_null());
            std::env::remove_var("REWIND_DELETE_RULE");
        }
    }

    #[test]
    fn ffi_history_rejects_bad_options() {
        unsafe {
            let options =
                CString::new(r#"{"initialSequence": [{"x": 1}], "initialCursor": 4}"#).unwrap();
            assert!(rewind_history_new(options.as_ptr()).is_null());

            let garbage = CString::new("not json").unwrap();
            assert!(rewind_history_new(garbage.as_ptr()).is_null());
        }
    }

    #[test]
    fn ffi_execute_commands() {
        unsafe {
            let history = rewind_history_new(ptr::null());

            let result = execute(history, r#"{"type": "append", "state": {"x": 1}}"#);
            assert_eq!(result, serde_json::json!({"ok": {"x": 1}}));
            execute(history, r#"{"type": "append", "state": {"x": 2}}"#);

            let result = execute(history, r#"{"type": "undo"}"#);
            assert_eq!(result, serde_json::json!({"ok": {"x": 1}}));
            assert_eq!(rewind_history_current(history), 0);

            let result = execute(history, r#"{"type": "undo"}"#);
            assert_eq!(result, serde_json::json!({"error": "nothing to undo"}));

            let sequence = take_json(rewind_history_sequence(history));
            assert_eq!(sequence, serde_json::json!({"ok": [{"x": 1}, {"x": 2}]}));

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_execute_rejects_non_object_state() {
        unsafe {
            let history = rewind_history_new(ptr::null());

            let result = execute(history, r#"{"type": "append", "state": 5}"#);
            assert_eq!(
                result,
                serde_json::json!({"error": "invalid state: expected an object, got a number"})
            );
            assert_eq!(rewind_history_current(history), -1);

            rewind_history_free(history);
        }
    }

    unsafe extern "C" fn record_error(message: *const c_char, user_data: *mut c_void) {
        let errors = &mut *(user_data as *mut Vec<String>);
        errors.push(CStr::from_ptr(message).to_str().unwrap().to_string());
    }

    #[test]
    fn ffi_error_callback() {
        unsafe {
            let history = rewind_history_new(ptr::null());
            let mut errors: Vec<String> = Vec::new();

            rewind_history_set_error_callback(
                history,
                Some(record_error),
                &mut errors as *mut Vec<String> as *mut c_void,
            );
            execute(history, r#"{"type": "undo"}"#);
            execute(history, r#"{"type": "recall", "index": 2}"#);

            rewind_history_set_error_callback(history, None, ptr::null_mut());
            execute(history, r#"{"type": "redo"}"#);

            assert_eq!(
                errors,
                vec![
                    "nothing to undo".to_string(),
                    "invalid index 2 for sequence of length 0".to_string(),
                ]
            );

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_template_callback() {
        unsafe {
            let history = rewind_history_new(ptr::null());
            let mut calls: Vec<String> = Vec::new();
            let descriptor = CString::new(r#"{"title": "setTitle"}"#).unwrap();

            let result = take_json(rewind_history_set_template(
                history,
                descriptor.as_ptr(),
                Some(record_field),
                &mut calls as *mut Vec<String> as *mut c_void,
            ));
            assert_eq!(result, serde_json::json!({"ok": null}));

            execute(history, r#"{"type": "append", "state": {"title": "a", "n": 1}}"#);
            execute(history, r#"{"type": "recall", "index": 0}"#);

            assert_eq!(calls, vec![r#"title/setTitle="a""#.to_string()]);

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_template_rejected() {
        unsafe {
            let history = rewind_history_new(ptr::null());
            let descriptor = CString::new(r#"{"title": 5}"#).unwrap();

            let result = take_json(rewind_history_set_template(
                history,
                descriptor.as_ptr(),
                Some(record_field),
                ptr::null_mut(),
            ));
            assert!(result.get("error").is_some());

            let descriptor = CString::new(r#"{"title": "setTitle"}"#).unwrap();
            let result = take_json(rewind_history_set_template(
                history,
                descriptor.as_ptr(),
                None,
                ptr::null_mut(),
            ));
            assert!(result.get("error").is_some());

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_set_sequence() {
        unsafe {
            let history = rewind_history_new(ptr::null());

            let sequence = CString::new(r#"[{"x": 1}, {"x": 2}]"#).unwrap();
            let result = take_json(rewind_history_set_sequence(history, sequence.as_ptr()));
            assert_eq!(result, serde_json::json!({"ok": null}));
            assert_eq!(rewind_history_current(history), 1);

            let bad = CString::new(r#"{"x": 1}"#).unwrap();
            let result = take_json(rewind_history_set_sequence(history, bad.as_ptr()));
            assert!(result.get("error").is_some());
            assert_eq!(rewind_history_last(history), 1);

            rewind_history_free(history);
        }
    }

    #[test]
    fn ffi_export_import() {
        unsafe {
            let history = rewind_history_new(ptr::null());
            execute(history, r#"{"type": "append", "state": {"x": 1}}"#);
            execute(history, r#"{"type": "append", "state": {"x": 2}}"#);
            execute(history, r#"{"type": "set", "index": 0}"#);

            let exported = take_json(rewind_history_export(history));
            let snapshot = CString::new(exported["ok"].to_string()).unwrap();

            let other = rewind_history_new(ptr::null());
            let result = take_json(rewind_history_import(other, snapshot.as_ptr()));
            assert_eq!(result, serde_json::json!({"ok": null}));
            assert_eq!(rewind_history_current(other), 0);
            assert_eq!(rewind_history_last(other), 1);

            rewind_history_free(history);
            rewind_history_free(other);
        }
    }

    #[test]
    fn ffi_version() {
        let version = unsafe { CStr::from_ptr(rewind_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(rewind_snapshot_format_version(), 1);
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            let result = take_json(rewind_history_execute(ptr::null_mut(), ptr::null()));
            assert_eq!(result, serde_json::json!({"error": "null history pointer"}));

            let history = rewind_history_new(ptr::null());
            let result = take_json(rewind_history_execute(history, ptr::null()));
            assert_eq!(result, serde_json::json!({"error": "invalid command JSON"}));

            let result = execute(history, "{not json");
            assert!(result["error"].as_str().unwrap().starts_with("parse error"));

            let result = execute(history, r#"{"type": "teleport"}"#);
            assert!(result["error"].as_str().unwrap().starts_with("invalid command"));

            assert_eq!(rewind_history_current(ptr::null()), -1);
            rewind_history_free(history);
        }
    }
}
