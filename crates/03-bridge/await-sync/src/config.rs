//! Bridge sizing and naming.

use std::env;

/// Default total size of the shared channel, header included.
pub const DEFAULT_CAPACITY: usize = 8192;
/// Default name of the worker thread.
pub const DEFAULT_THREAD_NAME: &str = "await-sync-worker";

const CAPACITY_ENV: &str = "AWAIT_SYNC_CAPACITY";
const THREAD_NAME_ENV: &str = "AWAIT_SYNC_THREAD_NAME";

/// Settings applied when a bridge is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Total shared channel size; the payload window is 8 bytes smaller.
    pub capacity: usize,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `AWAIT_SYNC_CAPACITY` / `AWAIT_SYNC_THREAD_NAME`.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| env::var(key).ok())
    }

    /// Overrides the channel capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Overrides the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(CAPACITY_ENV) {
            match raw.trim().parse() {
                Ok(capacity) => self.capacity = capacity,
                Err(err) => log::warn!("ignoring {CAPACITY_ENV}={raw:?}: {err}"),
            }
        }
        if let Some(name) = lookup(THREAD_NAME_ENV).filter(|name| !name.is_empty()) {
            self.thread_name = name;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.capacity, 8192);
        assert_eq!(config.thread_name, "await-sync-worker");
    }

    #[test]
    fn overlay_applies_valid_values() {
        let config = BridgeConfig::default().overlay(|key| match key {
            CAPACITY_ENV => Some(" 1024 ".into()),
            THREAD_NAME_ENV => Some("loader".into()),
            _ => None,
        });
        assert_eq!(
            config,
            BridgeConfig::default()
                .with_capacity(1024)
                .with_thread_name("loader")
        );
    }

    #[test]
    fn overlay_ignores_garbage() {
        let config = BridgeConfig::default().overlay(|key| match key {
            CAPACITY_ENV => Some("lots".into()),
            THREAD_NAME_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config, BridgeConfig::default());
    }
}
