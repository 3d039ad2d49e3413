//! LedgerSweep Rate Source
//!
//! Fetches spot exchange rates for ordered currency pairs from an external
//! quote service. A rate lookup is a pure read: any transport failure,
//! timeout, or missing pair surfaces as [`RateError`] and is treated by
//! callers as a recoverable business failure, never a panic into ledger
//! logic.

pub mod cache;
pub mod error;
pub mod source;

pub use cache::{CachedRateSource, RateCache, RateCacheConfig};
pub use error::{RateError, RateResult};
pub use source::{HttpRateSource, RateSource};

#[cfg(any(test, feature = "test-utils"))]
pub use source::MockRateSource;
