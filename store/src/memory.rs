//! In-memory ledger store.
//!
//! All state lives behind one `parking_lot::Mutex`, which serializes every
//! mutation: concurrent read-modify-write against the same account cannot
//! lose an update. Multi-row units run through [`MemoryLedger::transaction`],
//! which stages the whole state and commits only on `Ok`; a failing unit
//! leaves no partial effects visible to other readers.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use ledgersweep_common::{
    Account, Currency, Product, ProductId, Purchase, PurchaseId, PurchaseStatus, User, UserId,
};

type AccountKey = (UserId, Currency);

/// The full ledger state. Cloneable so transactions can stage a copy.
#[derive(Debug, Clone, Default)]
struct LedgerState {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountKey, Account>,
    products: HashMap<ProductId, Product>,
    purchases: HashMap<PurchaseId, Purchase>,
}

/// In-memory ledger store.
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
        }
    }

    // --- Users ---

    /// Insert or replace a user.
    pub fn upsert_user(&self, user: User) {
        self.state.lock().users.insert(user.id, user);
    }

    /// Look up a user by id.
    pub fn user(&self, id: UserId) -> Option<User> {
        self.state.lock().users.get(&id).cloned()
    }

    /// Find the designated admin user, if one exists.
    pub fn find_admin(&self) -> Option<User> {
        self.state
            .lock()
            .users
            .values()
            .find(|u| u.is_admin)
            .cloned()
    }

    // --- Accounts ---

    /// Look up an account by user and currency.
    pub fn account(&self, user_id: UserId, currency: &Currency) -> Option<Account> {
        self.state
            .lock()
            .accounts
            .get(&(user_id, currency.clone()))
            .cloned()
    }

    /// Insert or replace an account row.
    pub fn upsert_account(&self, account: Account) {
        let key = (account.user_id, account.currency.clone());
        self.state.lock().accounts.insert(key, account);
    }

    /// All accounts owned by a user.
    pub fn accounts_for(&self, user_id: UserId) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .state
            .lock()
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.currency.code().cmp(b.currency.code()));
        accounts
    }

    // --- Products ---

    /// Insert or replace a product.
    pub fn upsert_product(&self, product: Product) {
        self.state.lock().products.insert(product.id, product);
    }

    /// Look up a product by id.
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().products.get(&id).cloned()
    }

    // --- Purchases ---

    /// Record a new purchase row, returning its id.
    pub fn create_purchase(&self, purchase: Purchase) -> PurchaseId {
        let id = purchase.id;
        self.state.lock().purchases.insert(id, purchase);
        debug!(purchase_id = %id, "Purchase recorded");
        id
    }

    /// Look up a purchase by id.
    pub fn purchase(&self, id: PurchaseId) -> Option<Purchase> {
        self.state.lock().purchases.get(&id).cloned()
    }

    /// All purchases with the given status, oldest first.
    pub fn purchases_by_status(&self, status: PurchaseStatus) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .state
            .lock()
            .purchases
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        purchases.sort_by_key(|p| p.created_at);
        purchases
    }

    /// All purchases made by a user, newest first.
    pub fn purchases_for(&self, user_id: UserId) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .state
            .lock()
            .purchases
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        purchases
    }

    // --- Transactions ---

    /// Run a multi-row atomic unit.
    ///
    /// The closure works on a staged copy of the state under the store
    /// lock. Returning `Ok` commits the copy; returning `Err` discards it,
    /// rolling back every row the closure touched. No other reader or
    /// writer can observe the intermediate state.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut LedgerTx<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.state.lock();
        let mut staged = guard.clone();

        let result = f(&mut LedgerTx {
            state: &mut staged,
        })?;

        *guard = staged;
        Ok(result)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Row access within a transaction. Writes land in the staged state and
/// become visible only when the transaction commits.
pub struct LedgerTx<'a> {
    state: &'a mut LedgerState,
}

impl LedgerTx<'_> {
    /// Look up an account by user and currency.
    pub fn account(&self, user_id: UserId, currency: &Currency) -> Option<Account> {
        self.state
            .accounts
            .get(&(user_id, currency.clone()))
            .cloned()
    }

    /// Insert or replace an account row.
    pub fn upsert_account(&mut self, account: Account) {
        let key = (account.user_id, account.currency.clone());
        self.state.accounts.insert(key, account);
    }

    /// Look up a product by id.
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.state.products.get(&id).cloned()
    }

    /// Replace a product row.
    pub fn update_product(&mut self, product: Product) {
        self.state.products.insert(product.id, product);
    }

    /// Look up a purchase by id.
    pub fn purchase(&self, id: PurchaseId) -> Option<Purchase> {
        self.state.purchases.get(&id).cloned()
    }

    /// Replace a purchase row.
    pub fn update_purchase(&mut self, purchase: Purchase) {
        self.state.purchases.insert(purchase.id, purchase);
    }
}
