//! Purchase reservation.
//!
//! Reserving a purchase fixes the price the buyer will pay and records a
//! PENDING row. Nothing else moves: no funds are held, no stock is
//! decremented. The balance check at reservation time is advisory; the
//! settlement sweep re-validates everything before money moves.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use ledgersweep_common::{
    Currency, CurrencyPair, LedgerError, Money, ProductId, Purchase, Result, UserId,
};
use ledgersweep_rates::RateSource;
use ledgersweep_store::MemoryLedger;

/// Reserves purchases against a buyer's available funds.
pub struct ReservationService {
    store: Arc<MemoryLedger>,
    rates: Arc<dyn RateSource>,
}

impl ReservationService {
    pub fn new(store: Arc<MemoryLedger>, rates: Arc<dyn RateSource>) -> Self {
        Self { store, rates }
    }

    /// Reserve one unit of a product, paying from the buyer's account in
    /// `pay_currency`. Returns the PENDING purchase with its price fixed.
    ///
    /// When `pay_currency` differs from the product's native currency the
    /// price is converted at the current rate and rounded to the paying
    /// currency's minor units. That converted amount is stored on the
    /// purchase and is what settlement will debit, whatever the rate does
    /// afterwards.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id, currency = %pay_currency))]
    pub async fn reserve(
        &self,
        user_id: UserId,
        product_id: ProductId,
        pay_currency: Currency,
    ) -> Result<Purchase> {
        let user = self
            .store
            .user(user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        if !user.is_verified {
            return Err(LedgerError::UserNotVerified(user_id));
        }

        let product = self
            .store
            .product(product_id)
            .ok_or(LedgerError::ProductNotFound(product_id))?;
        if !product.in_stock() {
            return Err(LedgerError::ProductUnavailable(product_id));
        }

        let account = self.store.account(user_id, &pay_currency).ok_or_else(|| {
            LedgerError::AccountNotFound {
                user_id,
                currency: pay_currency.clone(),
            }
        })?;

        let price = self.price_in(&product.price, &pay_currency).await?;

        if !account.can_cover(price.value) {
            return Err(LedgerError::InsufficientFunds {
                required: price,
                available: account.balance_money(),
            });
        }

        let purchase = Purchase::new(user_id, product_id, price);
        let purchase_id = self.store.create_purchase(purchase.clone());

        info!(
            purchase_id = %purchase_id,
            user_id = %user_id,
            product = %product.name,
            amount = %purchase.amount,
            "Purchase reserved"
        );

        Ok(purchase)
    }

    /// Price of a product in the paying currency, rounded to its minor
    /// units. Same-currency purchases skip the rate lookup entirely.
    async fn price_in(&self, native_price: &Money, pay_currency: &Currency) -> Result<Money> {
        if &native_price.currency == pay_currency {
            return Ok(native_price.round());
        }

        let pair = CurrencyPair::new(native_price.currency.clone(), pay_currency.clone());
        let rate = self.rates.get_rate(&pair).await.map_err(|err| {
            warn!(pair = %pair, error = %err, "Rate lookup failed");
            LedgerError::RateUnavailable(pair.clone())
        })?;

        rate.convert(native_price)
            .map_err(|_| LedgerError::RateUnavailable(pair))
    }
}
