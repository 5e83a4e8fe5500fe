//! Construction options for a [`History`](crate::History).

use crate::State;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// How `delete` moves the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteCursorRule {
    /// Decrement only when the deleted index is at or before the cursor, so
    /// the cursor keeps pointing at the same state whenever that state survives.
    #[default]
    FollowRecord,
    /// Decrement on every delete, wherever the deleted index lies.
    AlwaysDecrement,
}

impl FromStr for DeleteCursorRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" | "follow_record" | "followrecord" => Ok(DeleteCursorRule::FollowRecord),
            "always" | "always_decrement" | "alwaysdecrement" => {
                Ok(DeleteCursorRule::AlwaysDecrement)
            }
            _ => Err(ConfigError::InvalidDeleteRule(s.to_string())),
        }
    }
}

/// Options recognised when constructing a history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryOptions {
    /// Emit diagnostic traces for every operation
    pub dev_mode: bool,
    /// States to seed the store with
    pub initial_sequence: Vec<State>,
    /// Starting cursor; defaults to the last index of `initial_sequence`
    pub initial_cursor: Option<usize>,
    /// Cursor behaviour on delete
    pub delete_rule: DeleteCursorRule,
}

impl HistoryOptions {
    /// Default options: empty store, diagnostics off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from environment variables.
    ///
    /// - `REWIND_DEV_MODE`: `1`/`true`/`yes`/`on` to enable diagnostics
    /// - `REWIND_DELETE_RULE`: `follow` or `always`
    pub fn from_env() -> Result<Self, ConfigError> {
        let dev_mode = match env::var("REWIND_DEV_MODE") {
            Ok(value) => parse_flag(&value)?,
            Err(_) => false,
        };

        let delete_rule = match env::var("REWIND_DELETE_RULE") {
            Ok(value) => value.parse()?,
            Err(_) => DeleteCursorRule::default(),
        };

        Ok(Self {
            dev_mode,
            delete_rule,
            ..Self::default()
        })
    }

    /// Builder method to toggle diagnostics.
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Builder method to seed the store.
    pub fn initial_sequence(mut self, sequence: Vec<State>) -> Self {
        self.initial_sequence = sequence;
        self
    }

    /// Builder method to seed the cursor.
    pub fn initial_cursor(mut self, cursor: usize) -> Self {
        self.initial_cursor = Some(cursor);
        self
    }

    /// Builder method to choose the delete rule.
    pub fn delete_rule(mut self, rule: DeleteCursorRule) -> Self {
        self.delete_rule = rule;
        self
    }
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidDevMode(value.to_string())),
    }
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid REWIND_DEV_MODE value: {0}")]
    InvalidDevMode(String),

    #[error("invalid REWIND_DELETE_RULE value: {0}")]
    InvalidDeleteRule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = HistoryOptions::new();
        assert!(!options.dev_mode);
        assert!(options.initial_sequence.is_empty());
        assert_eq!(options.initial_cursor, None);
        assert_eq!(options.delete_rule, DeleteCursorRule::FollowRecord);
    }

    #[test]
    fn builder() {
        let options = HistoryOptions::new()
            .dev_mode(true)
            .initial_sequence(vec![State::new(), State::new()])
            .initial_cursor(0)
            .delete_rule(DeleteCursorRule::AlwaysDecrement);

        assert!(options.dev_mode);
        assert_eq!(options.initial_sequence.len(), 2);
        assert_eq!(options.initial_cursor, Some(0));
        assert_eq!(options.delete_rule, DeleteCursorRule::AlwaysDecrement);
    }

    #[test]
    fn parse_delete_rule() {
        assert_eq!(
            "follow".parse::<DeleteCursorRule>(),
            Ok(DeleteCursorRule::FollowRecord)
        );
        assert_eq!(
            " Always ".parse::<DeleteCursorRule>(),
            Ok(DeleteCursorRule::AlwaysDecrement)
        );
        assert_eq!(
            "sometimes".parse::<DeleteCursorRule>(),
            Err(ConfigError::InvalidDeleteRule("sometimes".into()))
        );
    }

    #[test]
    fn parse_dev_mode_flag() {
        assert_eq!(parse_flag("TRUE"), Ok(true));
        assert_eq!(parse_flag("0"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }

    fn with_env<T>(dev_mode: Option<&str>, rule: Option<&str>, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in [("REWIND_DEV_MODE", dev_mode), ("REWIND_DELETE_RULE", rule)] {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
        let result = f();
        env::remove_var("REWIND_DEV_MODE");
        env::remove_var("REWIND_DELETE_RULE");
        result
    }

    #[test]
    fn from_env_defaults() {
        let options = with_env(None, None, HistoryOptions::from_env).unwrap();
        assert_eq!(options, HistoryOptions::new());
    }

    #[test]
    fn from_env_reads_both_variables() {
        let options = with_env(Some("yes"), Some("always"), HistoryOptions::from_env).unwrap();
        assert!(options.dev_mode);
        assert_eq!(options.delete_rule, DeleteCursorRule::AlwaysDecrement);
        assert!(options.initial_sequence.is_empty());
    }

    #[test]
    fn from_env_rejects_invalid_values() {
        let result = with_env(Some("on"), Some("sometimes"), HistoryOptions::from_env);
        assert_eq!(
            result,
            Err(ConfigError::InvalidDeleteRule("sometimes".into()))
        );

        let result = with_env(Some("maybe"), None, HistoryOptions::from_env);
        assert_eq!(result, Err(ConfigError::InvalidDevMode("maybe".into())));
    }

    #[test]
    fn delete_rule_serialization() {
        let json = serde_json::to_string(&DeleteCursorRule::AlwaysDecrement).unwrap();
        assert_eq!(json, r#""alwaysDecrement""#);
    }
}
