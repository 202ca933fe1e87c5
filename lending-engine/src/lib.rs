#![no_std]

pub mod admin;
pub mod common;
pub mod contract;
pub mod operations;

// Re-exports
pub use common::error::Error;
pub use common::types::{
    AlertLevel, DistributionSummary, EscrowWallet, LiquidationReceipt, Loan, LoanConfig,
    LoanStatus, MarginCallEntry, RepayOutcome, StakingPool, TxKind, TxRecord, TxStatus,
    UserProfile, WalletKind,
};
pub use contract::{LendingEngine, LendingEngineClient};
pub use price_oracle::{Asset, PriceData, PriceSource};

#[cfg(test)]
mod test;
