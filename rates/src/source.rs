//! Rate source trait and implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ledgersweep_common::{CurrencyPair, Rate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{RateError, RateResult};

/// Trait for spot exchange rate sources.
///
/// Callers reject same-currency pairs before invocation; a rate of 1 is
/// never implicitly assumed.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Get the current spot rate for an ordered currency pair.
    async fn get_rate(&self, pair: &CurrencyPair) -> RateResult<Rate>;
}

/// Wire format of the quote endpoint: `{"rates": {"EUR": 0.9132}}`.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// Rate source backed by a frankfurter-style HTTP quote endpoint.
///
/// Issues `GET {base_url}/latest?from={BASE}&to={QUOTE}` with a bounded
/// timeout. Non-2xx responses and responses missing the requested pair
/// are reported as [`RateError::Unavailable`].
pub struct HttpRateSource {
    client: reqwest::Client,
    base_url: String,
    name: String,
}

impl HttpRateSource {
    /// Create a new HTTP rate source with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            name: "HTTP".to_string(),
        })
    }

    fn quote_url(&self, pair: &CurrencyPair) -> String {
        format!(
            "{}/latest?from={}&to={}",
            self.base_url,
            pair.base.code(),
            pair.quote.code()
        )
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> RateResult<Rate> {
        let url = self.quote_url(pair);
        debug!(pair = %pair, url = %url, "Fetching rate");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                RateError::Timeout(pair.clone())
            } else {
                RateError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            warn!(
                pair = %pair,
                status = %response.status(),
                "Quote service returned non-success status"
            );
            return Err(RateError::Unavailable(pair.clone()));
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| RateError::Malformed(e.to_string()))?;

        match quote.rates.get(pair.quote.code()) {
            Some(rate) if *rate > Decimal::ZERO => {
                Ok(Rate::new(pair.clone(), *rate, self.name.clone()))
            }
            _ => {
                warn!(pair = %pair, "Pair missing from quote response");
                Err(RateError::Unavailable(pair.clone()))
            }
        }
    }
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: String,
    rates: dashmap::DashMap<String, Rate>,
    unavailable: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a new mock source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rates: dashmap::DashMap::new(),
            unavailable: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Set the rate for a currency pair.
    pub fn set_rate(&self, pair: CurrencyPair, rate: Decimal) {
        let key = format!("{pair}");
        self.rates.insert(key, Rate::new(pair, rate, self.name.clone()));
    }

    /// Make every subsequent lookup fail, simulating an outage.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable
            .store(down, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> RateResult<Rate> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RateError::Transport("simulated outage".to_string()));
        }
        self.rates
            .get(&format!("{pair}"))
            .map(|r| r.clone())
            .ok_or_else(|| RateError::Unavailable(pair.clone()))
    }
}
