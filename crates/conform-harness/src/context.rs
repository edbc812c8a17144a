//! Scenario-scoped key/value state threaded between steps

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};

use crate::ContextError;

struct Entry {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Typed, write-once map shared by the steps of one scenario
///
/// A value written by a step is seen unmodified by every later step of the
/// same scenario. Each scenario run starts with a fresh, empty context.
#[derive(Default)]
pub struct Context {
    entries: HashMap<String, Entry>,
}

impl Context {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`; a key can be written only once
    pub fn insert<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), ContextError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(ContextError::AlreadySet(key));
        }
        self.entries.insert(
            key,
            Entry {
                value: Box::new(value),
                type_name: type_name::<T>(),
            },
        );
        Ok(())
    }

    /// Borrow the value under `key`
    pub fn get<T: Any>(&self, key: &str) -> Result<&T, ContextError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| ContextError::Missing(key.to_string()))?;
        entry
            .value
            .downcast_ref::<T>()
            .ok_or_else(|| ContextError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
                actual: entry.type_name,
            })
    }

    /// Whether `key` has been written
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Written keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl Context {
    pub(crate) fn key_set(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Drop every key written since `kept` was taken
    pub(crate) fn retain_keys(&mut self, kept: &HashSet<String>) {
        self.entries.retain(|key, _| kept.contains(key));
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("keys", &self.keys()).finish()
    }
}
