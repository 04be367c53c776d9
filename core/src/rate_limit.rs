//! Request throttling shared by every caller of one `TrelloClient`.
//!
//! Two limits apply: a semaphore caps requests in flight, and a sliding
//! window history caps how many requests may *start* within `window`. Both
//! waits are cooperative; nothing here blocks a thread.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{self, Instant};
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    in_flight: Semaphore,
    history: Mutex<VecDeque<Instant>>,
}

/// Held for the duration of one request; dropping it frees the slot.
#[derive(Debug)]
pub struct RequestSlot<'a> {
    _permit: SemaphorePermit<'a>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, max_concurrent: usize) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            in_flight: Semaphore::new(max_concurrent.max(1)),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request may start, then record it.
    pub async fn acquire(&self) -> Result<RequestSlot<'_>, ApiError> {
        let permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| ApiError::Transport("rate limiter closed".to_string()))?;

        loop {
            let wait = {
                let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                while history
                    .front()
                    .is_some_and(|started| now.duration_since(*started) >= self.window)
                {
                    history.pop_front();
                }
                if history.len() < self.max_requests {
                    history.push_back(now);
                    None
                } else {
                    history
                        .front()
                        .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                }
            };

            match wait {
                None => return Ok(RequestSlot { _permit: permit }),
                Some(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "throttling request");
                    time::sleep(delay).await;
                }
            }
        }
    }

    /// Requests started within the current window.
    pub fn recent_requests(&self) -> usize {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        history
            .iter()
            .filter(|started| now.duration_since(**started) < self.window)
            .count()
    }
}
