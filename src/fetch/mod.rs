//! Polled REST resources
//!
//! - [`CacheStore`]: last successful response per request signature, with a freshness TTL
//! - [`RequestDeduplicator`]: at most one outstanding fetch per signature; every
//!   concurrent caller shares its outcome
//! - [`FetchScheduler`]: immediate fetch plus interval refreshes that bypass the cache,
//!   torn down through [`PollSubscription::close`] or drop
//!
//! The transport sits behind [`ResourceFetcher`] so tests can substitute their own.

mod cache;
mod client;
mod config;
mod dedup;
mod error;
mod request;
mod scheduler;

pub use cache::{CacheEntry, CacheStore, DEFAULT_CACHE_TTL};
pub use client::{HttpFetcher, ResourceFetcher};
pub use config::PollingConfig;
pub use dedup::{FetchOptions, RequestDeduplicator};
pub use error::FetchError;
pub use request::{parse_query_pair, ResourceRequest};
pub use scheduler::{FetchScheduler, PollState, PollSubscription};
