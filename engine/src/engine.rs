//! Engine façade wiring the services over one shared store.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use ledgersweep_common::{
    Account, Currency, LedgerError, Money, Product, ProductId, Purchase, Result, User, UserId,
};
use ledgersweep_rates::RateSource;
use ledgersweep_store::MemoryLedger;

use crate::accounts::{AccountService, PurchaseRecord};
use crate::config::EngineConfig;
use crate::conversion::{ConversionOutcome, ConversionService};
use crate::notifier::Notifier;
use crate::reservation::ReservationService;
use crate::sweeper::{SettlementSweeper, SweepReport};

/// The assembled ledger engine: one shared store, the three services
/// over it, and the settlement sweeper.
pub struct LedgerEngine {
    store: Arc<MemoryLedger>,
    accounts: AccountService,
    conversion: ConversionService,
    reservation: ReservationService,
    sweeper: Arc<SettlementSweeper>,
    config: EngineConfig,
}

impl LedgerEngine {
    /// Wire the engine from its seams.
    pub fn new(
        config: EngineConfig,
        rates: Arc<dyn RateSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let store = Arc::new(MemoryLedger::new());

        let accounts = AccountService::new(store.clone());
        let conversion = ConversionService::new(store.clone(), rates.clone());
        let reservation = ReservationService::new(store.clone(), rates);
        let sweeper = Arc::new(SettlementSweeper::new(
            store.clone(),
            notifier,
            config.settlement_currency.clone(),
            config.notification_batch_size,
        ));

        Self {
            store,
            accounts,
            conversion,
            reservation,
            sweeper,
            config,
        }
    }

    /// Ensure the admin user and their house account exist. Idempotent;
    /// called once at startup so the first sweep cannot hit a
    /// configuration fault on a fresh store.
    #[instrument(skip(self))]
    pub fn bootstrap_house(&self) -> Result<Account> {
        let admin = match self.store.find_admin() {
            Some(admin) => admin,
            None => {
                let admin = User::admin("House", self.config.house_admin_email.clone());
                info!(user_id = %admin.id, "Created house admin user");
                self.store.upsert_user(admin.clone());
                admin
            }
        };

        let currency = &self.config.settlement_currency;
        match self.store.account(admin.id, currency) {
            Some(account) => Ok(account),
            None => {
                let account = Account::new(admin.id, currency.clone());
                info!(user_id = %admin.id, currency = %currency, "Created house account");
                self.store.upsert_account(account.clone());
                Ok(account)
            }
        }
    }

    // --- Users and catalog ---

    /// Register a new (unverified) user.
    pub fn register_user(&self, name: &str, email: &str) -> User {
        let user = User::new(name, email);
        self.store.upsert_user(user.clone());
        user
    }

    /// Mark a user as verified.
    pub fn verify_user(&self, user_id: UserId) -> Result<()> {
        let mut user = self
            .store
            .user(user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        user.verify();
        self.store.upsert_user(user);
        Ok(())
    }

    /// Add a product to the catalog.
    pub fn add_product(&self, name: &str, quantity: u32, price: Money) -> Product {
        let product = Product::new(name, quantity, price);
        self.store.upsert_product(product.clone());
        product
    }

    // --- Ledger operations ---

    /// Credit a user's account, creating it on first deposit.
    pub fn deposit(&self, user_id: UserId, currency: Currency, amount: Decimal) -> Result<Account> {
        self.accounts.deposit(user_id, currency, amount)
    }

    /// All accounts held by a user.
    pub fn accounts(&self, user_id: UserId) -> Result<Vec<Account>> {
        self.accounts.accounts(user_id)
    }

    /// A user's purchase history, newest first.
    pub fn purchase_history(&self, user_id: UserId) -> Result<Vec<PurchaseRecord>> {
        self.accounts.purchase_history(user_id)
    }

    /// Convert funds between a user's per-currency accounts.
    pub async fn convert(
        &self,
        user_id: UserId,
        from: Currency,
        to: Currency,
        amount: Decimal,
    ) -> Result<ConversionOutcome> {
        self.conversion.convert(user_id, from, to, amount).await
    }

    /// Reserve one unit of a product as a pending purchase.
    pub async fn reserve_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
        pay_currency: Currency,
    ) -> Result<Purchase> {
        self.reservation.reserve(user_id, product_id, pay_currency).await
    }

    /// Run one settlement sweep now. `Ok(None)` means a sweep was
    /// already in progress.
    pub async fn run_settlement_sweep(&self) -> Result<Option<SweepReport>> {
        self.sweeper.run_once().await
    }

    /// The sweeper, for handing to a [`crate::scheduler::SweepScheduler`].
    pub fn sweeper(&self) -> Arc<SettlementSweeper> {
        self.sweeper.clone()
    }

    /// Direct store access, for seeding and inspection.
    pub fn store(&self) -> &Arc<MemoryLedger> {
        &self.store
    }
}
