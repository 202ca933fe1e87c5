use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Engine already initialized
    AlreadyInitialized = 1,

    /// Engine storage accessed before initialization
    NotInitialized = 2,

    /// Caller is not the loan owner
    Unauthorized = 3,

    /// Missing or malformed request field
    ValidationError = 4,

    /// No profile exists for this user
    UserNotFound = 5,

    /// No loan with this id
    LoanNotFound = 6,

    /// Balance below the requested debit
    InsufficientBalance = 7,

    /// Implied LTV above the creation cap
    LtvExceeded = 8,

    /// Loan already repaid or liquidated
    TerminalLoan = 9,

    /// Zero or negative amount
    InvalidAmount = 10,

    /// Chain address already linked to another user
    AddressInUse = 11,

    /// Asset not usable on this side of a loan
    UnsupportedAsset = 12,

    /// Checked arithmetic overflow
    ArithmeticError = 13,

    /// No escrow wallet registered for this chain
    EscrowWalletNotFound = 14,
}
