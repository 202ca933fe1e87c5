use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Oracle storage accessed before the constructor ran
    NotInitialized = 1,

    /// Negative price posted
    InvalidPrice = 2,

    /// FIRMA is a hard 1:1 peg and takes no feed observations
    PeggedAsset = 3,

    /// XECX shadows XEC; post XEC instead
    ShadowedAsset = 4,

    /// Observation timestamp ahead of ledger time beyond drift bound
    TimestampInFuture = 5,

    /// Observation not newer than the last accepted record
    TimestampTooOld = 6,
}
