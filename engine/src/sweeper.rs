//! Settlement sweep over pending purchases.
//!
//! Each sweep scans PENDING purchases oldest-first and settles every one
//! in its own atomic unit: debit the buyer, credit the house account,
//! decrement stock, mark COMPLETED. A purchase that no longer passes
//! re-validation is marked FAILED with nothing else moved. One purchase's
//! outcome never affects another's.
//!
//! Sweeps never overlap: a compare-exchange run flag makes a sweep that
//! starts while another is active a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use ledgersweep_common::{Account, Currency, LedgerError, Purchase, PurchaseStatus, Result};
use ledgersweep_store::MemoryLedger;

use crate::notifier::Notifier;

/// Summary of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending purchases seen by the scan.
    pub scanned: usize,
    /// Purchases settled successfully.
    pub completed: usize,
    /// Purchases that failed re-validation.
    pub failed: usize,
    /// Purchases already terminal when re-read (settled concurrently).
    pub skipped: usize,
    /// Notification batches handed to the notifier.
    pub batches_sent: usize,
    /// Batches the notifier rejected. Settlements stand regardless.
    pub delivery_failures: usize,
}

/// Why a purchase failed settlement.
#[derive(Debug)]
enum FailReason {
    BuyerAccountMissing,
    InsufficientFunds,
    ProductMissing,
    OutOfStock,
}

impl FailReason {
    fn as_str(&self) -> &'static str {
        match self {
            FailReason::BuyerAccountMissing => "buyer account missing",
            FailReason::InsufficientFunds => "insufficient funds",
            FailReason::ProductMissing => "product missing",
            FailReason::OutOfStock => "out of stock",
        }
    }
}

/// Per-purchase settlement outcome.
enum Settlement {
    /// Settled; carries the formatted outcome line.
    Completed(String),
    Failed(FailReason),
    /// Already terminal when re-read inside the transaction.
    AlreadySettled,
}

/// Periodic settlement of pending purchases.
pub struct SettlementSweeper {
    store: Arc<MemoryLedger>,
    notifier: Arc<dyn Notifier>,
    settlement_currency: Currency,
    batch_size: usize,
    running: AtomicBool,
}

impl SettlementSweeper {
    pub fn new(
        store: Arc<MemoryLedger>,
        notifier: Arc<dyn Notifier>,
        settlement_currency: Currency,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            settlement_currency,
            batch_size: batch_size.max(1),
            running: AtomicBool::new(false),
        }
    }

    /// Run one sweep. Returns `Ok(None)` when another sweep is already
    /// active. Returns `Err(ConfigurationFault)` when the house account
    /// cannot be resolved; in that case no purchase was touched.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<Option<SweepReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sweep already in progress, skipping this run");
            return Ok(None);
        }

        let result = self.sweep().await;
        self.running.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn sweep(&self) -> Result<SweepReport> {
        // Resolve the house account before touching any purchase. A
        // misconfigured deployment aborts the whole sweep.
        let house = self.house_account()?;

        let pending = self.store.purchases_by_status(PurchaseStatus::Pending);
        let mut report = SweepReport {
            scanned: pending.len(),
            ..SweepReport::default()
        };

        if pending.is_empty() {
            debug!("No pending purchases");
            return Ok(report);
        }

        info!(pending = pending.len(), "Settlement sweep started");

        let mut outcome_lines = Vec::new();
        for purchase in pending {
            let purchase_id = purchase.id;
            match self.settle_one(&purchase, &house)? {
                Settlement::Completed(line) => {
                    report.completed += 1;
                    outcome_lines.push(line);
                }
                Settlement::Failed(reason) => {
                    report.failed += 1;
                    warn!(
                        purchase_id = %purchase_id,
                        reason = reason.as_str(),
                        "Purchase failed settlement"
                    );
                }
                Settlement::AlreadySettled => {
                    report.skipped += 1;
                }
            }
        }

        for batch in outcome_lines.chunks(self.batch_size) {
            match self.notifier.send(batch).await {
                Ok(()) => report.batches_sent += 1,
                Err(err) => {
                    // Settlements already committed; delivery is best-effort.
                    report.delivery_failures += 1;
                    warn!(error = %err, "Outcome notification failed");
                }
            }
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            batches_sent = report.batches_sent,
            "Settlement sweep finished"
        );

        Ok(report)
    }

    /// The admin user's account in the settlement currency.
    fn house_account(&self) -> Result<Account> {
        let admin = self.store.find_admin().ok_or_else(|| {
            LedgerError::ConfigurationFault("No admin user configured".to_string())
        })?;

        self.store
            .account(admin.id, &self.settlement_currency)
            .ok_or_else(|| {
                LedgerError::ConfigurationFault(format!(
                    "Admin user {} has no {} house account",
                    admin.id, self.settlement_currency
                ))
            })
    }

    /// Settle one purchase in its own transaction.
    ///
    /// Re-validation failures commit a FAILED status and nothing else.
    /// Only store-level faults propagate as `Err`, and those roll the
    /// whole unit back, leaving the purchase PENDING for the next sweep.
    fn settle_one(&self, purchase: &Purchase, house: &Account) -> Result<Settlement> {
        let purchase_id = purchase.id;
        let now = Utc::now();

        self.store.transaction(|tx| {
            let mut purchase = tx
                .purchase(purchase_id)
                .ok_or(LedgerError::PurchaseNotFound(purchase_id))?;

            // Another path may have settled it since the scan.
            if !purchase.is_pending() {
                return Ok(Settlement::AlreadySettled);
            }

            let buyer_account = tx.account(purchase.user_id, &purchase.amount.currency);
            let product = tx.product(purchase.product_id);

            let fail_reason = match (&buyer_account, &product) {
                (None, _) => Some(FailReason::BuyerAccountMissing),
                (Some(account), _) if !account.can_cover(purchase.amount.value) => {
                    Some(FailReason::InsufficientFunds)
                }
                (_, None) => Some(FailReason::ProductMissing),
                (_, Some(product)) if !product.in_stock() => Some(FailReason::OutOfStock),
                _ => None,
            };

            if let Some(reason) = fail_reason {
                purchase.fail(now)?;
                tx.update_purchase(purchase);
                return Ok(Settlement::Failed(reason));
            }

            // Checked above; the transaction holds the store lock, so
            // these reads cannot have gone stale.
            let mut buyer_account =
                buyer_account.ok_or(LedgerError::AccountNotFound {
                    user_id: purchase.user_id,
                    currency: purchase.amount.currency.clone(),
                })?;
            let mut product =
                product.ok_or(LedgerError::ProductNotFound(purchase.product_id))?;

            buyer_account.debit(purchase.amount.value)?;
            product.take_one()?;
            purchase.complete(now)?;

            let line = format!(
                "Purchase {}: user {} bought {} for {}",
                purchase.id, purchase.user_id, product.name, purchase.amount
            );

            tx.upsert_account(buyer_account);

            // Re-read after the debit landed: the buyer may be the house
            // account itself.
            let mut house = tx
                .account(house.user_id, &house.currency)
                .ok_or_else(|| {
                    LedgerError::ConfigurationFault(
                        "House account vanished mid-sweep".to_string(),
                    )
                })?;
            house.credit(purchase.amount.value);
            tx.upsert_account(house);

            tx.update_product(product);
            tx.update_purchase(purchase);

            Ok(Settlement::Completed(line))
        })
    }
}
