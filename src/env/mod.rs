//! Process environment access.
//!
//! The process environment is the only global mutable state the loader
//! touches. All reads and writes go through [`EnvSource`] so tests (and
//! embedders that want isolation) can hand the loader a [`MapEnv`] snapshot
//! instead of the real environment.
//!
//! # Concurrency
//!
//! [`ProcessEnv`] performs no locking. If two loads republish concurrently,
//! the last writer wins per key.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;

/// Read/write access to a set of environment variables.
pub trait EnvSource: Send + Sync + fmt::Debug {
    /// Raw value of `name`. An empty value is still `Some("")`.
    fn var(&self, name: &str) -> Option<String>;

    /// Sets `name` to `value`.
    fn set_var(&self, name: &str, value: &str);

    /// Value of `name`, treating an empty string as unset.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|value| !value.is_empty())
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_var(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// An in-memory environment snapshot.
#[derive(Debug, Default)]
pub struct MapEnv {
    vars: DashMap<String, String>,
}

impl MapEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Builder-style insert.
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Copies the contents into a plain map.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.vars.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = DashMap::new();
        for (name, value) in iter {
            vars.insert(name.into(), value.into());
        }
        Self { vars }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(|value| value.clone())
    }

    fn set_var(&self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }
}
