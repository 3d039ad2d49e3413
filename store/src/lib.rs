//! LedgerSweep Ledger Store
//!
//! Durable keyed storage for users, accounts, products, and purchases,
//! behind an interface of per-row reads/upserts plus closure-scoped
//! multi-row transactions. This crate ships the in-memory implementation;
//! persistence mechanics below this abstraction are out of scope.

pub mod memory;

pub use memory::{LedgerTx, MemoryLedger};
