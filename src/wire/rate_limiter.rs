//! Request pacing for the wire API
//!
//! The wire enforces a minimum spacing between requests and caps the number
//! of items per search call. Search and document fetches are paced in
//! separate buckets so a burst of document fetches never starves the next
//! search and vice versa.

use crate::config::RateLimitConfig;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The endpoint family a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Search,
    Document,
}

/// Pacing state of one bucket
#[derive(Debug, Clone)]
struct BucketState {
    /// Minimum time between two requests in this bucket
    min_interval: Duration,

    /// When the last request in this bucket was released
    last_request_time: Option<Instant>,

    /// Requests released so far
    request_count: u64,
}

impl BucketState {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_time: None,
            request_count: 0,
        }
    }

    /// Time until the next request may be released, `None` when it may go now
    fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}

/// Enforces minimum inter-request spacing and the per-request item cap
#[derive(Debug)]
pub struct RateLimiter {
    search: Mutex<BucketState>,
    document: Mutex<BucketState>,
    max_items_per_request: u32,
}

impl RateLimiter {
    /// Creates a rate limiter from the pacing configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            search: Mutex::new(BucketState::new(Duration::from_millis(
                config.search_interval_ms,
            ))),
            document: Mutex::new(BucketState::new(Duration::from_millis(
                config.document_interval_ms,
            ))),
            max_items_per_request: config.max_items_per_request.clamp(1, 100),
        }
    }

    /// Waits until a request in `bucket` may be sent, then records it
    ///
    /// The bucket lock is held across the sleep, so concurrent callers are
    /// released one at a time, each at least `min_interval` after the last.
    pub async fn acquire(&self, bucket: Bucket) {
        let mut state = match bucket {
            Bucket::Search => self.search.lock().await,
            Bucket::Document => self.document.lock().await,
        };

        if let Some(wait) = state.time_until_next_request(Instant::now()) {
            tracing::trace!("Rate limiter holding {:?} request for {:?}", bucket, wait);
            tokio::time::sleep(wait).await;
        }

        state.record_request(Instant::now());
    }

    /// Caps a requested batch size to what the wire accepts
    pub fn clamp_limit(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_items_per_request)
    }

    /// Number of requests released in a bucket
    pub async fn request_count(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Search => self.search.lock().await.request_count,
            Bucket::Document => self.document.lock().await.request_count,
        }
    }
}
