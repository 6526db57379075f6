use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Clock;

/// The bucket a route is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Login,
    Register,
}

impl EndpointClass {
    pub fn exhausted_message(self) -> &'static str {
        match self {
            EndpointClass::Login => "Too many login attempts, please try again later.",
            EndpointClass::Register => "Too many registration attempts, please try again later.",
        }
    }
}

/// How many requests a client may make per window.
#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Allowance left after an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateLimitState {
    pub fn reset_after_secs(&self) -> u64 {
        ceil_secs(self.reset_after)
    }
}

/// A request refused because the window allowance is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyAttempts {
    pub class: EndpointClass,
    pub limit: u32,
    pub retry_after: Duration,
}

impl TooManyAttempts {
    pub fn retry_after_secs(&self) -> u64 {
        ceil_secs(self.retry_after)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// End of a window opened at `now`. Lengths past what `DateTime` can
/// represent saturate to the latest representable instant.
fn window_end(now: DateTime<Utc>, window_secs: u64) -> DateTime<Utc> {
    i64::try_from(window_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|len| now.checked_add_signed(len))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

struct Window {
    count: u32,
    expires_at: DateTime<Utc>,
}

/// Fixed-window request counters keyed by client and endpoint class.
///
/// Windows live only in memory: they are created on a client's first request,
/// reset once they elapse, and dropped by [`sweep_task`] or a restart.
pub struct RateLimiter {
    login: WindowPolicy,
    register: WindowPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<(String, EndpointClass), Window>>,
}

impl RateLimiter {
    pub fn new(login: WindowPolicy, register: WindowPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            login,
            register,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self, class: EndpointClass) -> WindowPolicy {
        match class {
            EndpointClass::Login => self.login,
            EndpointClass::Register => self.register,
        }
    }

    // A panic while holding the lock leaves the counters intact, so poisoning is ignored.
    fn windows(&self) -> MutexGuard<'_, HashMap<(String, EndpointClass), Window>> {
        self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one request from `client` against `class`.
    ///
    /// The check and the increment happen under a single lock acquisition, so
    /// concurrent bursts from the same client cannot overshoot the limit.
    pub fn check(
        &self,
        client: &str,
        class: EndpointClass,
    ) -> Result<RateLimitState, TooManyAttempts> {
        let policy = self.policy(class);
        let now = self.clock.now();

        let mut windows = self.windows();
        let window = windows
            .entry((client.to_string(), class))
            .or_insert_with(|| Window {
                count: 0,
                expires_at: window_end(now, policy.window_secs),
            });

        if now >= window.expires_at {
            window.count = 0;
            window.expires_at = window_end(now, policy.window_secs);
        }

        let remaining_time = (window.expires_at - now).to_std().unwrap_or_default();

        if window.count >= policy.max_requests {
            debug!(
                "rate_limit: {:?} allowance exhausted for client={}",
                class, client
            );
            return Err(TooManyAttempts {
                class,
                limit: policy.max_requests,
                retry_after: remaining_time,
            });
        }

        window.count += 1;
        Ok(RateLimitState {
            limit: policy.max_requests,
            remaining: policy.max_requests - window.count,
            reset_after: remaining_time,
        })
    }

    /// Drop every window that has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows();
        let before = windows.len();
        windows.retain(|_, w| w.expires_at > now);
        before - windows.len()
    }

    pub fn tracked_windows(&self) -> usize {
        self.windows().len()
    }
}

/// Background task that periodically removes expired windows so idle clients
/// do not accumulate in memory.
pub async fn sweep_task(limiter: Arc<RateLimiter>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let removed = limiter.purge_expired();
        if removed > 0 {
            info!(
                "rate_limit: swept {} expired window(s), {} still tracked",
                removed,
                limiter.tracked_windows()
            );
        }
    }
}
