//! Deposits, balance queries, and purchase history.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use ledgersweep_common::{Account, Currency, LedgerError, Money, Purchase, Result, UserId};
use ledgersweep_store::MemoryLedger;

/// A purchase joined with its product name, for history views.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub purchase: Purchase,
    pub product_name: String,
}

/// Deposits and read paths over the ledger.
pub struct AccountService {
    store: Arc<MemoryLedger>,
}

impl AccountService {
    pub fn new(store: Arc<MemoryLedger>) -> Self {
        Self { store }
    }

    /// Credit a user's account in the given currency, creating the
    /// account on first deposit. Returns the updated account.
    #[instrument(skip(self), fields(user_id = %user_id, currency = %currency))]
    pub fn deposit(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Account> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation {
                message: "Deposit amount must be positive".to_string(),
                field: Some("amount".to_string()),
            });
        }

        self.store.user(user_id).ok_or(LedgerError::UserNotFound(user_id))?;

        let amount = Money::new(amount, currency.clone()).round().value;

        let account = self.store.transaction(|tx| {
            let mut account = tx
                .account(user_id, &currency)
                .unwrap_or_else(|| Account::new(user_id, currency.clone()));
            account.credit(amount);
            tx.upsert_account(account.clone());
            Ok::<_, LedgerError>(account)
        })?;

        info!(
            user_id = %user_id,
            currency = %currency,
            amount = %amount,
            balance = %account.balance,
            "Deposit credited"
        );

        Ok(account)
    }

    /// All accounts held by a user, ordered by currency code.
    pub fn accounts(&self, user_id: UserId) -> Result<Vec<Account>> {
        self.store.user(user_id).ok_or(LedgerError::UserNotFound(user_id))?;
        Ok(self.store.accounts_for(user_id))
    }

    /// A user's purchases, newest first, joined with product names.
    pub fn purchase_history(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>> {
        self.store.user(user_id).ok_or(LedgerError::UserNotFound(user_id))?;

        let records = self
            .store
            .purchases_for(user_id)
            .into_iter()
            .map(|purchase| {
                let product_name = self
                    .store
                    .product(purchase.product_id)
                    .map(|p| p.name)
                    .unwrap_or_else(|| "unknown product".to_string());
                PurchaseRecord {
                    purchase,
                    product_name,
                }
            })
            .collect();

        Ok(records)
    }
}
