//! End-to-end flows through the assembled engine: deposit, conversion,
//! reservation, and settlement.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;

use ledgersweep_common::{Currency, CurrencyPair, LedgerError, Money, PurchaseStatus};
use ledgersweep_engine::notifier::{Notifier, NotifyError};
use ledgersweep_engine::{EngineConfig, LedgerEngine};
use ledgersweep_rates::MockRateSource;

/// Notifier that records every batch it is handed.
struct RecordingNotifier {
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, lines: &[String]) -> Result<(), NotifyError> {
        self.batches.lock().push(lines.to_vec());
        Ok(())
    }
}

fn build_engine() -> (LedgerEngine, Arc<MockRateSource>, Arc<RecordingNotifier>) {
    let rates = Arc::new(MockRateSource::new("test"));
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = LedgerEngine::new(EngineConfig::default(), rates.clone(), notifier.clone());
    (engine, rates, notifier)
}

#[tokio::test]
async fn deposit_convert_reserve_settle_full_flow() {
    let (engine, rates, notifier) = build_engine();
    engine.bootstrap_house().unwrap();
    rates.set_rate(
        CurrencyPair::new(Currency::usd(), Currency::eur()),
        dec!(0.85),
    );

    let user = engine.register_user("Alice", "alice@example.com");
    engine.verify_user(user.id).unwrap();

    engine.deposit(user.id, Currency::usd(), dec!(100)).unwrap();
    let outcome = engine
        .convert(user.id, Currency::usd(), Currency::eur(), dec!(50))
        .await
        .unwrap();
    assert_eq!(outcome.to, Money::new(dec!(42.50), Currency::eur()));

    let product = engine.add_product("Keyboard", 3, Money::new(dec!(20), Currency::usd()));
    // Product is priced in USD; the buyer pays from their EUR account.
    let purchase = engine
        .reserve_purchase(user.id, product.id, Currency::eur())
        .await
        .unwrap();
    assert_eq!(purchase.amount, Money::new(dec!(17.00), Currency::eur()));
    assert_eq!(purchase.status, PurchaseStatus::Pending);

    let report = engine.run_settlement_sweep().await.unwrap().unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.batches_sent, 1);

    // Buyer paid from the EUR balance; stock went down by one.
    let accounts = engine.accounts(user.id).unwrap();
    let eur = accounts
        .iter()
        .find(|a| a.currency == Currency::eur())
        .unwrap();
    assert_eq!(eur.balance, dec!(25.50));
    assert_eq!(engine.store().product(product.id).unwrap().quantity, 2);

    let history = engine.purchase_history(user.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].product_name, "Keyboard");
    assert_eq!(history[0].purchase.status, PurchaseStatus::Completed);
    assert!(history[0].purchase.processed_at.is_some());

    let batches = notifier.batches();
    assert_eq!(batches.len(), 1);
    assert!(batches[0][0].contains("bought Keyboard for 17.00 EUR"));
}

#[tokio::test]
async fn settlement_debits_reservation_time_amount_not_current_rate() {
    let (engine, rates, _) = build_engine();
    engine.bootstrap_house().unwrap();
    rates.set_rate(
        CurrencyPair::new(Currency::usd(), Currency::eur()),
        dec!(0.85),
    );

    let user = engine.register_user("Alice", "alice@example.com");
    engine.verify_user(user.id).unwrap();
    engine.deposit(user.id, Currency::eur(), dec!(50)).unwrap();

    let product = engine.add_product("Mouse", 1, Money::new(dec!(20), Currency::usd()));
    let purchase = engine
        .reserve_purchase(user.id, product.id, Currency::eur())
        .await
        .unwrap();
    assert_eq!(purchase.amount.value, dec!(17.00));

    // The rate moves between reservation and settlement.
    rates.set_rate(
        CurrencyPair::new(Currency::usd(), Currency::eur()),
        dec!(0.95),
    );

    engine.run_settlement_sweep().await.unwrap().unwrap();

    let accounts = engine.accounts(user.id).unwrap();
    assert_eq!(accounts[0].balance, dec!(33.00));
    assert_eq!(
        engine.store().purchase(purchase.id).unwrap().status,
        PurchaseStatus::Completed
    );
}

#[tokio::test]
async fn sweep_without_house_account_aborts_and_preserves_pending() {
    let (engine, _, _) = build_engine();
    // No bootstrap: the store has no admin user or house account.

    let user = engine.register_user("Alice", "alice@example.com");
    engine.verify_user(user.id).unwrap();
    engine.deposit(user.id, Currency::usd(), dec!(100)).unwrap();
    let product = engine.add_product("Cable", 1, Money::new(dec!(5), Currency::usd()));
    let purchase = engine
        .reserve_purchase(user.id, product.id, Currency::usd())
        .await
        .unwrap();

    let result = engine.run_settlement_sweep().await;
    assert!(matches!(result, Err(LedgerError::ConfigurationFault(_))));
    assert_eq!(
        engine.store().purchase(purchase.id).unwrap().status,
        PurchaseStatus::Pending
    );

    // Once the house account exists the same purchase settles.
    engine.bootstrap_house().unwrap();
    let report = engine.run_settlement_sweep().await.unwrap().unwrap();
    assert_eq!(report.completed, 1);
}

#[tokio::test]
async fn outcomes_are_reported_in_batches_of_five() {
    let (engine, _, notifier) = build_engine();
    engine.bootstrap_house().unwrap();

    let user = engine.register_user("Alice", "alice@example.com");
    engine.verify_user(user.id).unwrap();
    engine.deposit(user.id, Currency::usd(), dec!(100)).unwrap();
    let product = engine.add_product("Sticker", 10, Money::new(dec!(1), Currency::usd()));

    for _ in 0..7 {
        engine
            .reserve_purchase(user.id, product.id, Currency::usd())
            .await
            .unwrap();
    }

    let report = engine.run_settlement_sweep().await.unwrap().unwrap();
    assert_eq!(report.completed, 7);
    assert_eq!(report.batches_sent, 2);

    let batches = notifier.batches();
    assert_eq!(batches[0].len(), 5);
    assert_eq!(batches[1].len(), 2);
}

#[tokio::test]
async fn unverified_user_cannot_reserve_but_can_deposit_and_convert() {
    let (engine, rates, _) = build_engine();
    engine.bootstrap_house().unwrap();
    rates.set_rate(
        CurrencyPair::new(Currency::usd(), Currency::gbp()),
        dec!(0.78),
    );

    let user = engine.register_user("Bob", "bob@example.com");
    engine.deposit(user.id, Currency::usd(), dec!(100)).unwrap();
    engine
        .convert(user.id, Currency::usd(), Currency::gbp(), dec!(10))
        .await
        .unwrap();

    let product = engine.add_product("Pen", 1, Money::new(dec!(2), Currency::usd()));
    let result = engine
        .reserve_purchase(user.id, product.id, Currency::usd())
        .await;
    assert!(matches!(result, Err(LedgerError::UserNotVerified(_))));
}

#[tokio::test]
async fn repeated_sweeps_settle_each_purchase_exactly_once() {
    let (engine, _, _) = build_engine();
    let house = engine.bootstrap_house().unwrap();

    let user = engine.register_user("Alice", "alice@example.com");
    engine.verify_user(user.id).unwrap();
    engine.deposit(user.id, Currency::usd(), dec!(100)).unwrap();
    let product = engine.add_product("Book", 5, Money::new(dec!(30), Currency::usd()));
    engine
        .reserve_purchase(user.id, product.id, Currency::usd())
        .await
        .unwrap();

    engine.run_settlement_sweep().await.unwrap().unwrap();
    engine.run_settlement_sweep().await.unwrap().unwrap();
    engine.run_settlement_sweep().await.unwrap().unwrap();

    let accounts = engine.accounts(user.id).unwrap();
    assert_eq!(accounts[0].balance, dec!(70));
    assert_eq!(
        engine
            .store()
            .account(house.user_id, &Currency::usd())
            .unwrap()
            .balance,
        dec!(30)
    );
    assert_eq!(engine.store().product(product.id).unwrap().quantity, 4);
}
