//! Error taxonomy for ledger operations.

use crate::identifiers::{ProductId, PurchaseId, UserId};
use crate::monetary::{Currency, CurrencyPair, Money};
use crate::purchase::InvalidTransition;
use thiserror::Error;

/// Main error type for ledger operations.
///
/// Validation, not-found, insufficient-funds, and rate-unavailable
/// variants are business outcomes returned to the caller. Configuration
/// and persistence variants are faults surfaced to operators.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Missing or malformed input.
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Unknown user.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// User exists but has not been verified.
    #[error("User not verified: {0}")]
    UserNotVerified(UserId),

    /// Unknown product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product exists but has no stock.
    #[error("Product not available: {0}")]
    ProductUnavailable(ProductId),

    /// No account for the user in the given currency.
    #[error("No {currency} account for user {user_id}")]
    AccountNotFound { user_id: UserId, currency: Currency },

    /// Unknown purchase.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    /// Source and target currency are the same.
    #[error("Source and target currency must differ: {0}")]
    SameCurrency(Currency),

    /// Insufficient funds.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    /// External quote source down or pair unsupported.
    #[error("Exchange rate unavailable for {0}")]
    RateUnavailable(CurrencyPair),

    /// Purchase already settled.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Missing house account or similar deployment misconfiguration.
    /// Aborts a sweep entirely, before any purchase is touched.
    #[error("Configuration fault: {0}")]
    ConfigurationFault(String),

    /// Store transaction failure; the failing unit was rolled back.
    #[error("Persistence fault: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Check if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::RateUnavailable(_))
    }

    /// Stable error code for API responses and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "VALIDATION",
            LedgerError::UserNotFound(_) => "USER_NOT_FOUND",
            LedgerError::UserNotVerified(_) => "USER_NOT_VERIFIED",
            LedgerError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            LedgerError::ProductUnavailable(_) => "PRODUCT_UNAVAILABLE",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::PurchaseNotFound(_) => "PURCHASE_NOT_FOUND",
            LedgerError::SameCurrency(_) => "SAME_CURRENCY",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::RateUnavailable(_) => "RATE_UNAVAILABLE",
            LedgerError::InvalidTransition(_) => "INVALID_TRANSITION",
            LedgerError::ConfigurationFault(_) => "CONFIGURATION_FAULT",
            LedgerError::Persistence(_) => "PERSISTENCE_FAULT",
        }
    }
}

/// Result type alias for ledger operations.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
