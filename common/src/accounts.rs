//! User, account, and product records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::identifiers::{ProductId, UserId};
use crate::monetary::{Currency, Money};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (unique).
    pub email: String,
    /// Whether this user is the designated admin.
    pub is_admin: bool,
    /// Whether the user has been verified. Unverified users cannot
    /// reserve purchases.
    pub is_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new unverified, non-admin user.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            is_admin: false,
            is_verified: false,
            created_at: Utc::now(),
        }
    }

    /// Create the admin user. Admins start verified.
    pub fn admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            is_verified: true,
            ..Self::new(name, email)
        }
    }

    /// Mark the user as verified.
    pub fn verify(&mut self) {
        self.is_verified = true;
    }
}

/// A per-user, per-currency balance record.
///
/// Exactly one account exists per (user, currency) pair; accounts are
/// created lazily on first deposit or conversion credit. The balance is
/// never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owning user.
    pub user_id: UserId,
    /// Account currency.
    pub currency: Currency,
    /// Current balance, always >= 0.
    pub balance: Decimal,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance.
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            currency,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current balance as Money.
    pub fn balance_money(&self) -> Money {
        Money::new(self.balance, self.currency.clone())
    }

    /// Check whether the balance covers an amount.
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Increase the balance.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.updated_at = Utc::now();
    }

    /// Decrease the balance. Fails without mutating if funds are short.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if !self.can_cover(amount) {
            return Err(LedgerError::InsufficientFunds {
                required: Money::new(amount, self.currency.clone()),
                available: self.balance_money(),
            });
        }
        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A catalog product with stock and a native price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Units in stock.
    pub quantity: u32,
    /// Catalog price in the product's native currency.
    pub price: Money,
}

impl Product {
    /// Create a new product.
    pub fn new(name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Check whether at least one unit is in stock.
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Remove one unit from stock. Fails without mutating when empty.
    pub fn take_one(&mut self) -> Result<(), LedgerError> {
        if !self.in_stock() {
            return Err(LedgerError::ProductUnavailable(self.id));
        }
        self.quantity -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_debit_checks_balance() {
        let mut account = Account::new(UserId::new(), Currency::usd());
        account.credit(dec!(50));

        assert!(account.debit(dec!(60)).is_err());
        assert_eq!(account.balance, dec!(50));

        account.debit(dec!(50)).unwrap();
        assert_eq!(account.balance, dec!(0));
    }

    #[test]
    fn test_product_take_one() {
        let mut product = Product::new("Widget", 1, Money::new(dec!(10), Currency::usd()));

        product.take_one().unwrap();
        assert_eq!(product.quantity, 0);
        assert!(product.take_one().is_err());
    }

    #[test]
    fn test_admin_starts_verified() {
        let admin = User::admin("House", "house@example.com");
        assert!(admin.is_admin);
        assert!(admin.is_verified);

        let user = User::new("Alice", "alice@example.com");
        assert!(!user.is_verified);
    }
}
