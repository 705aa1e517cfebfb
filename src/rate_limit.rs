use std::time::{Duration, Instant};

use dashmap::DashMap;

const CONTACT_LIMIT: u32 = 5;
const CONTACT_WINDOW_SECS: u64 = 60 * 60;
const LOGIN_MAX_FAILURES: u32 = 5;
const LOGIN_WINDOW_SECS: u64 = 15 * 60;

/// Per-client-IP limiter for the public contact form, fixed window.
pub struct ContactRateLimiter {
    /// ip -> (count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl Default for ContactRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if a submission is allowed. Returns Err with retry-after seconds.
    pub fn check(&self, ip: &str) -> Result<(), u64> {
        let window = Duration::from_secs(CONTACT_WINDOW_SECS);
        let now = Instant::now();

        let mut entry = self.entries.entry(ip.to_string()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= CONTACT_LIMIT {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(CONTACT_WINDOW_SECS.saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

/// Per-email login brute force limiter.
pub struct LoginRateLimiter {
    /// email -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Does not count the attempt; call `record_failure()` on a bad password.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let window = Duration::from_secs(LOGIN_WINDOW_SECS);
        let now = Instant::now();

        let Some(entry) = self.entries.get(&email.to_lowercase()) else {
            return Ok(());
        };
        let (count, start) = entry.value();

        if now.duration_since(*start) > window {
            return Ok(());
        }

        if *count >= LOGIN_MAX_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(LOGIN_WINDOW_SECS.saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, email: &str) {
        let window = Duration::from_secs(LOGIN_WINDOW_SECS);
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > window {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn clear(&self, email: &str) {
        self.entries.remove(&email.to_lowercase());
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}
