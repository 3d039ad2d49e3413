//! LedgerSweep Common Types
//!
//! Shared types used across the LedgerSweep ledger: identifiers, monetary
//! types, account/product/purchase records, and the error taxonomy.

pub mod accounts;
pub mod error;
pub mod identifiers;
pub mod monetary;
pub mod purchase;

pub use accounts::*;
pub use error::*;
pub use identifiers::*;
pub use monetary::*;
pub use purchase::*;
