//! Environment stores used by the configuration loader.

use std::collections::HashMap;
use std::sync::RwLock;

/// A key/value environment that configuration is read from and published to.
pub trait EnvStore: Send + Sync {
    /// Current value of `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Set `key` to `value`.
    fn set(&self, key: &str, value: &str);
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        // SAFETY: configuration is published once at startup, before any
        // other thread reads or writes the environment.
        unsafe { std::env::set_var(key, value) }
    }
}

/// An isolated in-memory environment.
#[derive(Debug, Default)]
pub struct MapEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vars.read().unwrap().is_empty()
    }
}

impl EnvStore for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.vars
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}
