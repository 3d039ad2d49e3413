//! Rate source error types.

use ledgersweep_common::CurrencyPair;
use thiserror::Error;

/// Errors that can occur while fetching a rate.
///
/// Every variant means the same thing to the ledger: no usable rate.
/// The variants exist so operators can tell a down quote service from
/// an unsupported pair in the logs.
#[derive(Debug, Error)]
pub enum RateError {
    /// The quote service does not carry this pair.
    #[error("Rate not available for {0}")]
    Unavailable(CurrencyPair),

    /// The request exceeded its deadline.
    #[error("Rate lookup timed out for {0}")]
    Timeout(CurrencyPair),

    /// Transport-level failure reaching the quote service.
    #[error("Rate transport error: {0}")]
    Transport(String),

    /// The quote service answered with something unparseable.
    #[error("Malformed quote response: {0}")]
    Malformed(String),
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
