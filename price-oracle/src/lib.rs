#![no_std]

use soroban_sdk::contracttype;

pub mod contract;
pub mod error;

// Re-exports
pub use contract::{PriceOracle, PriceOracleClient};
pub use error::Error;

/// Fixed-point scale shared by prices, amounts and rates (7 decimals).
/// Example: 1.0 USD = 10_000_000, 0.00003 USD = 300.
pub const SCALAR_7: i128 = 10_000_000;

/// Tracked platform assets. A closed set: asset identity is never derived
/// from untrusted input.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Asset {
    /// Native volatile coin.
    Xec,
    /// USD-pegged stablecoin, constant 1.0.
    Firma,
    /// Staking-wrapped form of XEC; always priced as XEC.
    Xecx,
}

/// Where a quoted price came from.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PriceSource {
    /// Posted by the feed relayer within the freshness window.
    Feed,
    /// Posted by the feed relayer, but older than the freshness window.
    Cached,
    /// No observation on record; configured fallback value.
    Default,
    /// Hard-coded 1:1 USD peg.
    Pegged,
}

/// Price record returned to consumers.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceData {
    pub price: i128,   // USD per whole unit, 7 decimals
    pub timestamp: u64,
    pub source: PriceSource,
}
