//! LedgerSweep Engine
//!
//! The settlement and ledger consistency engine: currency conversion with
//! atomic balance moves, purchase reservation against available funds, and
//! the recurring settlement sweep that finalizes pending purchases.

pub mod accounts;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod notifier;
pub mod reservation;
pub mod scheduler;
pub mod sweeper;

pub use config::EngineConfig;
pub use engine::LedgerEngine;
