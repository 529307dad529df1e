//! Wire module for talking to the news-wire API
//!
//! This module contains:
//! - The rate-limited HTTP client (search + document fetch)
//! - The rate limiter that spaces requests and caps batch sizes

mod client;
mod rate_limiter;

pub use client::{build_http_client, SearchQuery, WireClient};
pub use rate_limiter::{Bucket, RateLimiter};
