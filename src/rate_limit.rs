use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Window used for signup and login attempts.
pub const AUTH_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Past this many tracked keys, expired ones are swept on the next check.
pub const CLEANUP_THRESHOLD: usize = 1024;

/// In-memory rate limiter keyed by (bucket, ip_hash).
/// Each bucket (e.g. "login", "signup") has its own max attempts and window.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        // A panic mid-update leaves at worst a stale timestamp list
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an attempt and return true if the attempt is allowed (under the limit).
    /// `key` should be something like "login:<ip_hash>".
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        self.check_and_record_at(key, max_attempts, window, Instant::now())
    }

    fn check_and_record_at(
        &self,
        key: &str,
        max_attempts: u64,
        window: Duration,
        now: Instant,
    ) -> bool {
        let mut map = self.lock();
        let attempts = map.entry(key.to_string()).or_default();

        // Prune old entries outside the window
        attempts.retain(|t| now.duration_since(*t) < window);

        if (attempts.len() as u64) < max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Forget a key, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop stale entries.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        let mut map = self.lock();
        map.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < max_age);
            !attempts.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }
}
