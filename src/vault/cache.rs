//! Response cache with a fixed time-to-live.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::SecretBundle;

/// Cached read results keyed by request path. A TTL of zero disables it.
///
/// Negative results (`None`) are cached too, so a missing secret is not
/// re-requested within the window.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Option<SecretBundle>)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Fresh entry for `path`. The outer `None` is a miss.
    pub fn get(&self, path: &str) -> Option<Option<SecretBundle>> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(path) {
            Some((stored, value)) if stored.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(path);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, path: &str, value: Option<SecretBundle>) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(path.to_string(), (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_never_stores() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("p", Some(SecretBundle::new()));
        assert!(cache.get("p").is_none());
    }

    #[test]
    fn entries_expire() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        cache.insert("p", None);
        assert_eq!(cache.get("p"), Some(None));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("p").is_none());
    }
}
