// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pacing of recognition calls.
//
// The fixed form is a plain wait between two pages of the same item. The
// token bucket lets short bursts through and then spaces calls at the refill
// rate, across item boundaries too.

use std::time::Duration;

use lipika_core::config::ThrottleConfig;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::debug;

/// Default wait between two pages of one item.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub enum Throttle {
    /// Wait this long before every page except an item's first.
    Fixed(Duration),
    TokenBucket(TokenBucket),
}

impl Default for Throttle {
    fn default() -> Self {
        Self::Fixed(DEFAULT_PAGE_DELAY)
    }
}

impl Throttle {
    /// No pacing at all.
    pub fn none() -> Self {
        Self::Fixed(Duration::ZERO)
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        match config.token_bucket {
            Some(bucket) => Self::TokenBucket(TokenBucket::new(
                bucket.capacity,
                Duration::from_millis(bucket.refill_ms),
            )),
            None => Self::Fixed(Duration::from_millis(config.page_delay_ms)),
        }
    }

    /// Wait until the next recognition call may go out.
    ///
    /// `first_page` is true for the first page of an item.
    pub async fn wait_turn(&mut self, first_page: bool) {
        match self {
            Self::Fixed(delay) => {
                if !first_page && !delay.is_zero() {
                    debug!(delay_ms = delay.as_millis() as u64, "Waiting between pages");
                    sleep(*delay).await;
                }
            }
            Self::TokenBucket(bucket) => bucket.acquire().await,
        }
    }
}

/// Token bucket holding up to `capacity` calls, earning one back every
/// `refill`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill: Duration,
    available: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Starts full. A zero capacity is treated as one.
    pub fn new(capacity: u32, refill: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill,
            available: capacity,
            last_refill: Instant::now(),
        }
    }

    pub fn available(&mut self) -> u32 {
        self.top_up(Instant::now());
        self.available
    }

    fn top_up(&mut self, now: Instant) {
        if self.refill.is_zero() {
            self.available = self.capacity;
            self.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = (elapsed.as_nanos() / self.refill.as_nanos()) as u64;
        if earned == 0 {
            return;
        }
        self.available = (self.available as u64 + earned).min(self.capacity as u64) as u32;
        if self.available == self.capacity {
            self.last_refill = now;
        } else {
            self.last_refill += self.refill * earned as u32;
        }
    }

    /// Take one token, sleeping until one is earned if the bucket is empty.
    pub async fn acquire(&mut self) {
        self.top_up(Instant::now());
        if self.available == 0 {
            let ready_at = self.last_refill + self.refill;
            debug!(
                wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Token bucket empty"
            );
            sleep_until(ready_at).await;
            self.top_up(Instant::now());
        }
        self.available = self.available.saturating_sub(1);
    }
}
