use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Shared by every fetch task. Keeps the run under GitHub's request ceiling:
/// honours the reported remaining budget and caps requests per minute.
pub struct RateLimiter {
    state: Arc<Mutex<RateLimitState>>,
    requests_per_minute: u32,
}

struct RateLimitState {
    remaining: u32,
    reset_at: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Instant,
}

/// Budget reported by the API on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub remaining: u32,
    pub reset_epoch_secs: Option<u64>,
}

impl RateLimitHeaders {
    pub fn parse(headers: &HeaderMap) -> Option<Self> {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())?;
        let reset_epoch_secs = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        Some(Self {
            remaining,
            reset_epoch_secs,
        })
    }

    /// Seconds until the budget resets, relative to `now_epoch_secs`.
    pub fn reset_in(&self, now_epoch_secs: u64) -> Option<u64> {
        self.reset_epoch_secs
            .filter(|reset| *reset > now_epoch_secs)
            .map(|reset| reset - now_epoch_secs)
    }
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState {
                remaining: 5000,
                reset_at: None,
                requests_this_minute: 0,
                minute_start: Instant::now(),
            })),
            requests_per_minute: requests_per_minute.max(1),
        }
    }

    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        // Budget exhausted: sleep until GitHub resets it
        if state.remaining == 0 {
            if let Some(reset_at) = state.reset_at {
                let now = Instant::now();
                if reset_at > now {
                    let wait_duration = reset_at - now;
                    drop(state);
                    tracing::info!("Rate limited, waiting {:?}", wait_duration);
                    sleep(wait_duration).await;
                    state = self.state.lock().await;
                }
            }
            state.remaining = 1;
        }

        let minute_elapsed = state.minute_start.elapsed();
        if minute_elapsed < Duration::from_secs(60) {
            if state.requests_this_minute >= self.requests_per_minute {
                let wait_time = Duration::from_secs(60) - minute_elapsed;
                drop(state);
                tracing::debug!("Soft rate limiting, waiting {:?}", wait_time);
                sleep(wait_time).await;
                state = self.state.lock().await;
                state.requests_this_minute = 0;
                state.minute_start = Instant::now();
            }
        } else {
            state.requests_this_minute = 0;
            state.minute_start = Instant::now();
        }

        state.requests_this_minute += 1;
    }

    pub async fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(limits) = RateLimitHeaders::parse(headers) else {
            return;
        };
        let now_epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut state = self.state.lock().await;
        state.remaining = limits.remaining;
        if let Some(wait_secs) = limits.reset_in(now_epoch_secs) {
            state.reset_at = Some(Instant::now() + Duration::from_secs(wait_secs));
        }
        if limits.remaining < 50 {
            tracing::warn!(remaining = limits.remaining, "GitHub rate limit budget is low");
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60)
    }
}
