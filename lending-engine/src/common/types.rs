use soroban_sdk::{contracttype, Address, Map, String, Symbol};

use crate::common::error::Error;
use price_oracle::Asset;

// ============================================================================
// SCALAR CONSTANTS
// ============================================================================

/// 7 decimals - shared scale for amounts, USD values, prices, rates and LTV
/// fractions. Example: 65% = 6_500_000, 0.00003 USD = 300.
pub const SCALAR_7: i128 = 10_000_000;

pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;

// ============================================================================
// TTL CONSTANTS
// ============================================================================

/// Ledgers per day (~5 seconds per ledger on Stellar)
pub const ONE_DAY_LEDGERS: u32 = 17280;

/// Instance storage TTL (engine config, pool, indexes) - 30 days
pub const INSTANCE_TTL: u32 = ONE_DAY_LEDGERS * 30;
pub const INSTANCE_BUMP: u32 = ONE_DAY_LEDGERS * 31;

/// User storage TTL (profiles, loans, logs) - 100 days
pub const USER_TTL: u32 = ONE_DAY_LEDGERS * 100;
pub const USER_BUMP: u32 = ONE_DAY_LEDGERS * 120;

// ============================================================================
// RISK PARAMETERS (7 decimals)
// ============================================================================

/// Maximum LTV at loan creation: 65%
pub const DEFAULT_INITIAL_LTV: i128 = 6_500_000;

/// Margin-call band entry: 75%
pub const DEFAULT_MARGIN_CALL_LTV: i128 = 7_500_000;

/// Liquidation threshold: 83%
pub const DEFAULT_LIQUIDATION_LTV: i128 = 8_300_000;

/// Margin-call alerts escalate to critical at 80%
pub const CRITICAL_ALERT_LTV: i128 = 8_000_000;

/// Per-hour interest fraction: 0.0001
pub const DEFAULT_HOURLY_INTEREST_RATE: i128 = 1_000;

/// Liquidation fee as a fraction of debt: 2%
pub const DEFAULT_LIQUIDATION_FEE: i128 = 200_000;

/// Daily staking yield fraction: 0.0001 (~3.65% APY)
pub const DEFAULT_DAILY_YIELD_RATE: i128 = 1_000;

/// Platform seed of the staking pool: 50,000 XEC
pub const STAKING_PLATFORM_BASE: i128 = 50_000 * SCALAR_7;

/// LTV reported for a loan whose collateral is worth nothing: 100%
pub const LTV_CEILING: i128 = SCALAR_7;

// ============================================================================
// LOAN CONFIG
// ============================================================================

/// Tunable engine parameters. All fractions use 7 decimals.
#[contracttype]
#[derive(Clone, Debug)]
pub struct LoanConfig {
    /// Maximum LTV accepted at creation
    pub initial_ltv: i128,

    /// LTV at which a loan enters the margin-call band
    pub margin_call_ltv: i128,

    /// LTV at which the risk loop liquidates
    pub liquidation_ltv: i128,

    /// Interest fraction charged per whole elapsed hour
    pub hourly_interest_rate: i128,

    /// Fee taken on liquidation, as a fraction of debt
    pub liquidation_fee: i128,

    /// Staking pool yield distributed per UTC day
    pub daily_yield_rate: i128,
}

impl LoanConfig {
    pub fn default_config() -> Self {
        Self {
            initial_ltv: DEFAULT_INITIAL_LTV,
            margin_call_ltv: DEFAULT_MARGIN_CALL_LTV,
            liquidation_ltv: DEFAULT_LIQUIDATION_LTV,
            hourly_interest_rate: DEFAULT_HOURLY_INTEREST_RATE,
            liquidation_fee: DEFAULT_LIQUIDATION_FEE,
            daily_yield_rate: DEFAULT_DAILY_YIELD_RATE,
        }
    }

    /// Thresholds must be strictly ordered and inside (0, 100%]; rates and
    /// fees must not be negative.
    pub fn validate(&self) -> Result<(), Error> {
        if self.initial_ltv <= 0
            || self.initial_ltv >= self.margin_call_ltv
            || self.margin_call_ltv >= self.liquidation_ltv
            || self.liquidation_ltv > SCALAR_7
        {
            return Err(Error::ValidationError);
        }
        if self.hourly_interest_rate < 0 || self.liquidation_fee < 0 || self.daily_yield_rate < 0 {
            return Err(Error::ValidationError);
        }
        Ok(())
    }
}

// ============================================================================
// USERS
// ============================================================================

/// External chains a user can link an address from.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WalletKind {
    Ecash,
    Solana,
}

/// Platform-side account. Balances are ledger entries, moved only by
/// recorded transactions; the profile lives for the life of the system.
#[contracttype]
#[derive(Clone, Debug)]
pub struct UserProfile {
    pub ecash_address: Option<String>,
    pub solana_address: Option<String>,
    pub xec: i128,
    pub firma: i128,
    pub xecx: i128,
    /// Cumulative staking yield ever paid to this user
    pub staking_rewards_earned: i128,
    pub created_at: u64,
}

impl UserProfile {
    pub fn new(created_at: u64) -> Self {
        Self {
            ecash_address: None,
            solana_address: None,
            xec: 0,
            firma: 0,
            xecx: 0,
            staking_rewards_earned: 0,
            created_at,
        }
    }

    pub fn balance(&self, asset: &Asset) -> i128 {
        match asset {
            Asset::Xec => self.xec,
            Asset::Firma => self.firma,
            Asset::Xecx => self.xecx,
        }
    }

    pub fn credit(&mut self, asset: &Asset, amount: i128) -> Result<(), Error> {
        let balance = self
            .balance(asset)
            .checked_add(amount)
            .ok_or(Error::ArithmeticError)?;
        self.set_balance(asset, balance);
        Ok(())
    }

    pub fn debit(&mut self, asset: &Asset, amount: i128) -> Result<(), Error> {
        let balance = self.balance(asset);
        if balance < amount {
            return Err(Error::InsufficientBalance);
        }
        self.set_balance(asset, balance - amount);
        Ok(())
    }

    fn set_balance(&mut self, asset: &Asset, balance: i128) {
        match asset {
            Asset::Xec => self.xec = balance,
            Asset::Firma => self.firma = balance,
            Asset::Xecx => self.xecx = balance,
        }
    }
}

// ============================================================================
// LOANS
// ============================================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoanStatus {
    Active,
    MarginCall,
    Repaid,
    Liquidated,
}

impl LoanStatus {
    /// Repaid and liquidated loans never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Repaid | LoanStatus::Liquidated)
    }
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct Loan {
    pub id: u64,
    pub borrower: Address,
    pub status: LoanStatus,

    pub collateral_asset: Asset,
    pub collateral_amount: i128,
    pub collateral_value_usd_at_open: i128,

    pub borrow_asset: Asset,
    /// Outstanding principal
    pub principal: i128,
    pub borrow_value_usd_at_open: i128,

    /// Per-hour interest fraction fixed at creation (7 decimals)
    pub interest_rate: i128,
    /// Interest charged but not yet paid
    pub accrued_interest: i128,

    /// LTV at creation (7 decimals fraction)
    pub initial_ltv: i128,
    /// LTV at the last recomputation
    pub current_ltv: i128,

    /// Staking yield attributed to this loan's XEC collateral
    pub staking_yield_earned: i128,

    pub created_at: u64,
    pub updated_at: u64,
    pub last_interest_update: u64,
    pub closed_at: Option<u64>,
}

impl Loan {
    pub fn total_debt(&self) -> Result<i128, Error> {
        self.principal
            .checked_add(self.accrued_interest)
            .ok_or(Error::ArithmeticError)
    }
}

/// Result of a repayment.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepayOutcome {
    pub remaining_debt: i128,
    pub fully_repaid: bool,
}

// ============================================================================
// TRANSACTION LOG
// ============================================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxKind {
    DepositXec,
    DepositFirma,
    /// 1:1 USD -> FIRMA bridge credit
    FirmaSwap,
    Borrow,
    Repay,
    AddCollateral,
    Liquidation,
    /// Interest charged onto a loan's debt
    InterestPayment,
    StakingReward,
    WithdrawXec,
    WithdrawFirma,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Append-only record of a state-changing financial action.
#[contracttype]
#[derive(Clone, Debug)]
pub struct TxRecord {
    pub id: u64,
    pub user: Address,
    pub loan_id: Option<u64>,
    pub kind: TxKind,
    pub asset: Asset,
    pub amount: i128,
    pub value_usd: Option<i128>,
    /// Hash/signature of the external-chain transaction, when observed
    pub chain_tx: Option<String>,
    pub status: TxStatus,
    pub timestamp: u64,
}

// ============================================================================
// RISK LOG
// ============================================================================

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// One entry per LTV crossing into the margin band.
#[contracttype]
#[derive(Clone, Debug)]
pub struct MarginCallEntry {
    pub loan_id: u64,
    pub borrower: Address,
    pub ltv: i128,
    pub alert: AlertLevel,
    pub timestamp: u64,
}

/// Outcome of one executed liquidation.
#[contracttype]
#[derive(Clone, Debug)]
pub struct LiquidationReceipt {
    pub loan_id: u64,
    pub borrower: Address,
    pub collateral_asset: Asset,
    /// Collateral sold to cover debt plus fee
    pub sold: i128,
    pub debt_covered_usd: i128,
    pub fee_usd: i128,
    /// Fee expressed in collateral units
    pub fee_collateral: i128,
    /// Residual collateral returned to the borrower
    pub returned: i128,
    pub timestamp: u64,
}

// ============================================================================
// STAKING POOL
// ============================================================================

/// Singleton pool backing the daily yield paid to XEC-collateralised
/// borrowers. `total` always equals `platform_base + user_contributed`.
#[contracttype]
#[derive(Clone, Debug)]
pub struct StakingPool {
    pub platform_base: i128,
    pub user_contributed: i128,
    pub total: i128,
    pub last_reward_distribution: u64,
    pub total_rewards_distributed: i128,
}

/// Result of one daily distribution run.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionSummary {
    pub distributed: i128,
    pub recipients: u32,
}

// ============================================================================
// ESCROW
// ============================================================================

/// Platform-controlled address observed by the indexer; transparency only,
/// no effect on user balances.
#[contracttype]
#[derive(Clone, Debug)]
pub struct EscrowWallet {
    pub chain: Symbol,
    pub address: String,
    pub balances: Map<Asset, i128>,
    pub updated_at: u64,
}

// ============================================================================
// PRICE SNAPSHOT
// ============================================================================

/// Oracle quotes read once at the start of an invocation and passed through
/// every valuation, so no price can change mid-mutation.
#[derive(Clone, Debug)]
pub struct PriceSnapshot {
    pub xec: i128,
    pub firma: i128,
    pub xecx: i128,
}

impl PriceSnapshot {
    pub fn price(&self, asset: &Asset) -> i128 {
        match asset {
            Asset::Xec => self.xec,
            Asset::Firma => self.firma,
            Asset::Xecx => self.xecx,
        }
    }

    /// `amount * price(asset)`, 7 decimals both sides.
    pub fn to_usd(&self, asset: &Asset, amount: i128) -> Result<i128, Error> {
        amount
            .checked_mul(self.price(asset))
            .ok_or(Error::ArithmeticError)
            .map(|v| v / SCALAR_7)
    }

    /// `usd / price(asset)`; 0 when the asset is worthless.
    pub fn from_usd(&self, asset: &Asset, usd: i128) -> Result<i128, Error> {
        let price = self.price(asset);
        if price == 0 {
            return Ok(0);
        }
        usd.checked_mul(SCALAR_7)
            .ok_or(Error::ArithmeticError)
            .map(|v| v / price)
    }
}

// ============================================================================
// PLATFORM STATS
// ============================================================================

/// Aggregate view served to the public stats endpoint.
#[contracttype]
#[derive(Clone, Debug)]
pub struct PlatformStats {
    pub users: u32,
    pub open_loans: u32,
    pub total_collateral_usd: i128,
    pub total_borrowed_usd: i128,
    pub staking_pool: StakingPool,
}

// ============================================================================
// STORAGE KEYS
// ============================================================================

pub use soroban_sdk::symbol_short;

pub const STORAGE: Symbol = symbol_short!("STORAGE");
pub const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
