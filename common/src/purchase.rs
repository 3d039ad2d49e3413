//! Purchase record and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{ProductId, PurchaseId, UserId};
use crate::monetary::Money;

/// Purchase lifecycle status.
///
/// A purchase is created `Pending` and transitions exactly once, to
/// `Completed` or `Failed`, during a settlement sweep. Terminal states
/// are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    /// Reserved, awaiting settlement.
    Pending,
    /// Settled: buyer debited, house credited, stock decremented.
    Completed,
    /// Settlement re-validation failed; no funds or stock moved.
    Failed,
}

impl PurchaseStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStatus::Completed | PurchaseStatus::Failed)
    }
}

/// Error when attempting to settle a purchase twice.
#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub from: PurchaseStatus,
    pub to: PurchaseStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid purchase transition from {:?} to {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// A reserved-then-settled intent to buy one unit of a product.
///
/// `amount` is the price computed at reservation time in the buyer's
/// requested currency. It is fixed at creation; settlement uses the
/// stored amount and never recomputes it from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique purchase identifier.
    pub id: PurchaseId,
    /// Buying user.
    pub user_id: UserId,
    /// Product being bought.
    pub product_id: ProductId,
    /// Price fixed at reservation time, in the buyer's currency.
    pub amount: Money,
    /// Current status.
    pub status: PurchaseStatus,
    /// When the purchase was reserved.
    pub created_at: DateTime<Utc>,
    /// When the purchase was settled (None while pending).
    pub processed_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Create a new pending purchase.
    pub fn new(user_id: UserId, product_id: ProductId, amount: Money) -> Self {
        Self {
            id: PurchaseId::new(),
            user_id,
            product_id,
            amount,
            status: PurchaseStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Check if the purchase is still awaiting settlement.
    pub fn is_pending(&self) -> bool {
        self.status == PurchaseStatus::Pending
    }

    /// Mark the purchase as settled. Only valid from `Pending`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(PurchaseStatus::Completed, at)
    }

    /// Mark the purchase as failed. Only valid from `Pending`.
    pub fn fail(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition(PurchaseStatus::Failed, at)
    }

    fn transition(
        &mut self,
        to: PurchaseStatus,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if self.status != PurchaseStatus::Pending {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.processed_at = Some(at);
        Ok(())
    }
}
