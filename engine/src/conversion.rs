//! Currency conversion between a user's accounts.
//!
//! A conversion quotes the live rate, rounds the target amount to the
//! target currency's minor units, then moves both balances in one atomic
//! unit. The rate fetch happens before the transaction opens, so a slow
//! or failing quote service never holds the store lock.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use ledgersweep_common::{
    Account, Currency, CurrencyPair, LedgerError, Money, Rate, Result, UserId,
};
use ledgersweep_rates::RateSource;
use ledgersweep_store::MemoryLedger;

/// Result of a completed conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// Amount debited from the source account.
    pub from: Money,
    /// Amount credited to the target account, rounded to minor units.
    pub to: Money,
    /// Source account balance after the move.
    pub source_balance: Money,
    /// Target account balance after the move.
    pub target_balance: Money,
    /// The rate applied.
    pub rate: Rate,
}

/// Converts funds between a user's per-currency accounts.
pub struct ConversionService {
    store: Arc<MemoryLedger>,
    rates: Arc<dyn RateSource>,
}

impl ConversionService {
    pub fn new(store: Arc<MemoryLedger>, rates: Arc<dyn RateSource>) -> Self {
        Self { store, rates }
    }

    /// Convert `amount` from the user's `from` account into their `to`
    /// account. The target account is created if it does not exist yet.
    ///
    /// Either both balances move or neither does: a failure inside the
    /// transaction rolls back the debit.
    #[instrument(skip(self), fields(user_id = %user_id, from = %from, to = %to))]
    pub async fn convert(
        &self,
        user_id: UserId,
        from: Currency,
        to: Currency,
        amount: Decimal,
    ) -> Result<ConversionOutcome> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation {
                message: "Conversion amount must be positive".to_string(),
                field: Some("amount".to_string()),
            });
        }

        if from == to {
            return Err(LedgerError::SameCurrency(from));
        }

        self.store.user(user_id).ok_or(LedgerError::UserNotFound(user_id))?;

        let pair = CurrencyPair::new(from.clone(), to.clone());
        let rate = self.rates.get_rate(&pair).await.map_err(|err| {
            warn!(pair = %pair, error = %err, "Rate lookup failed");
            LedgerError::RateUnavailable(pair.clone())
        })?;

        let source_amount = Money::new(amount, from.clone());
        let target_amount = rate.convert(&source_amount).map_err(|_| {
            // The source reported a rate for a different pair than asked.
            warn!(pair = %pair, "Rate source returned mismatched pair");
            LedgerError::RateUnavailable(pair.clone())
        })?;

        let (source_account, target_account) = self.store.transaction(|tx| {
            let mut source = tx.account(user_id, &from).ok_or_else(|| {
                // No account in the source currency means no funds there.
                LedgerError::InsufficientFunds {
                    required: source_amount.clone(),
                    available: Money::zero(from.clone()),
                }
            })?;
            source.debit(amount)?;

            let mut target = tx
                .account(user_id, &to)
                .unwrap_or_else(|| Account::new(user_id, to.clone()));
            target.credit(target_amount.value);

            tx.upsert_account(source.clone());
            tx.upsert_account(target.clone());
            Ok::<_, LedgerError>((source, target))
        })?;

        info!(
            user_id = %user_id,
            from_amount = %source_amount,
            to_amount = %target_amount,
            rate = %rate.rate,
            "Conversion completed"
        );

        Ok(ConversionOutcome {
            from: source_amount,
            to: target_amount,
            source_balance: source_account.balance_money(),
            target_balance: target_account.balance_money(),
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersweep_common::User;
    use ledgersweep_rates::MockRateSource;
    use rust_decimal_macros::dec;

    fn setup(balance_usd: Decimal) -> (ConversionService, Arc<MemoryLedger>, UserId) {
        let store = Arc::new(MemoryLedger::new());
        let user = User::new("Alice", "alice@example.com");
        let user_id = user.id;
        store.upsert_user(user);

        let mut account = Account::new(user_id, Currency::usd());
        account.credit(balance_usd);
        store.upsert_account(account);

        let rates = Arc::new(MockRateSource::new("test"));
        rates.set_rate(
            CurrencyPair::new(Currency::usd(), Currency::eur()),
            dec!(0.85),
        );

        let service = ConversionService::new(store.clone(), rates);
        (service, store, user_id)
    }

    #[tokio::test]
    async fn test_convert_moves_both_balances() {
        let (service, store, user_id) = setup(dec!(100));

        let outcome = service
            .convert(user_id, Currency::usd(), Currency::eur(), dec!(40))
            .await
            .unwrap();

        assert_eq!(outcome.to.value, dec!(34.00));
        assert_eq!(
            store.account(user_id, &Currency::usd()).unwrap().balance,
            dec!(60)
        );
        assert_eq!(
            store.account(user_id, &Currency::eur()).unwrap().balance,
            dec!(34.00)
        );
    }

    #[tokio::test]
    async fn test_convert_creates_target_account() {
        let (service, store, user_id) = setup(dec!(10));
        assert!(store.account(user_id, &Currency::eur()).is_none());

        service
            .convert(user_id, Currency::usd(), Currency::eur(), dec!(10))
            .await
            .unwrap();

        assert!(store.account(user_id, &Currency::eur()).is_some());
    }

    #[tokio::test]
    async fn test_convert_insufficient_funds_rolls_back() {
        let (service, store, user_id) = setup(dec!(5));

        let result = service
            .convert(user_id, Currency::usd(), Currency::eur(), dec!(10))
            .await;

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(
            store.account(user_id, &Currency::usd()).unwrap().balance,
            dec!(5)
        );
        assert!(store.account(user_id, &Currency::eur()).is_none());
    }

    #[tokio::test]
    async fn test_convert_missing_source_account_reads_as_empty() {
        let (service, _, user_id) = setup(dec!(100));

        let result = service
            .convert(user_id, Currency::gbp(), Currency::usd(), dec!(10))
            .await;

        match result {
            Err(LedgerError::InsufficientFunds { available, .. }) => {
                assert!(available.is_zero());
                assert_eq!(available.currency, Currency::gbp());
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_convert_same_currency_rejected() {
        let (service, _, user_id) = setup(dec!(100));

        let result = service
            .convert(user_id, Currency::usd(), Currency::usd(), dec!(10))
            .await;
        assert!(matches!(result, Err(LedgerError::SameCurrency(_))));
    }

    #[tokio::test]
    async fn test_convert_rate_outage_leaves_balances_untouched() {
        let (service, store, user_id) = setup(dec!(100));

        let result = service
            .convert(user_id, Currency::usd(), Currency::gbp(), dec!(10))
            .await;

        assert!(matches!(result, Err(LedgerError::RateUnavailable(_))));
        assert_eq!(
            store.account(user_id, &Currency::usd()).unwrap().balance,
            dec!(100)
        );
    }
}
