#![cfg(test)]
extern crate std;

use crate::common::types::{
    DEFAULT_INITIAL_LTV, DEFAULT_LIQUIDATION_LTV, DEFAULT_MARGIN_CALL_LTV, SCALAR_7,
    STAKING_PLATFORM_BASE,
};
use crate::{
    AlertLevel, Asset, LendingEngine, LendingEngineClient, LoanConfig, LoanStatus, TxKind,
    TxStatus, WalletKind,
};
use price_oracle::{PriceOracle, PriceOracleClient};

use soroban_sdk::{testutils::Address as _, testutils::Ledger, Address, Env, String};

const BASE_TIME: u64 = 2_000_000_000;

fn set_ledger_timestamp(e: &Env, timestamp: u64) {
    e.ledger().with_mut(|li| {
        li.timestamp = timestamp;
    });
}

fn advance(e: &Env, seconds: u64) {
    let now = e.ledger().timestamp();
    set_ledger_timestamp(e, now + seconds);
}

fn setup<'a>(e: &Env) -> (LendingEngineClient<'a>, PriceOracleClient<'a>, Address) {
    e.mock_all_auths();
    set_ledger_timestamp(e, BASE_TIME);

    let admin = Address::generate(e);
    let feeder = Address::generate(e);
    let oracle_id = e.register(PriceOracle, (admin.clone(), feeder.clone()));
    let oracle = PriceOracleClient::new(e, &oracle_id);

    let engine_id = e.register(LendingEngine, ());
    let engine = LendingEngineClient::new(e, &engine_id);
    engine.initialize(&admin, &oracle_id);

    (engine, oracle, admin)
}

/// Register a profile and credit it with an observed XEC deposit.
fn fund_user(
    e: &Env,
    engine: &LendingEngineClient,
    chain_address: &str,
    xec_amount: i128,
) -> Address {
    let user = Address::generate(e);
    engine.register_user(
        &user,
        &WalletKind::Ecash,
        &String::from_str(e, chain_address),
    );
    if xec_amount > 0 {
        engine.deposit_xec(&user, &xec_amount, &None);
    }
    user
}

/// Post a fresh XEC observation at the current ledger time.
fn post_xec_price(e: &Env, oracle: &PriceOracleClient, price: i128) {
    advance(e, 30);
    let now = e.ledger().timestamp();
    oracle.set_price(&Asset::Xec, &price, &now);
}

fn xec(amount: i128) -> i128 {
    amount * SCALAR_7
}

/// The reference position used across scenarios: 1,000,000 XEC collateral,
/// 15 FIRMA borrowed, at the 0.00003 default price.
fn open_standard_loan(e: &Env, engine: &LendingEngineClient, chain_address: &str) -> (Address, u64) {
    let user = fund_user(e, engine, chain_address, xec(1_000_000));
    let loan = engine.create_loan(
        &user,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(15 * SCALAR_7),
    );
    (user, loan.id)
}

// ==================== Initialization ====================

#[test]
fn test_initialization() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let pool = engine.staking_pool();
    assert_eq!(pool.platform_base, STAKING_PLATFORM_BASE);
    assert_eq!(pool.user_contributed, 0);
    assert_eq!(pool.total, STAKING_PLATFORM_BASE);
    assert_eq!(pool.total_rewards_distributed, 0);

    let config = engine.loan_config();
    assert_eq!(config.initial_ltv, DEFAULT_INITIAL_LTV);
    assert_eq!(config.margin_call_ltv, DEFAULT_MARGIN_CALL_LTV);
    assert_eq!(config.liquidation_ltv, DEFAULT_LIQUIDATION_LTV);
}

#[test]
#[should_panic(expected = "Error(Contract, #1)")] // AlreadyInitialized
fn test_double_initialization() {
    let e = Env::default();
    let (engine, _, admin) = setup(&e);
    let oracle = Address::generate(&e);
    engine.initialize(&admin, &oracle);
}

#[test]
#[should_panic(expected = "Error(Contract, #4)")] // ValidationError
fn test_loan_config_ordering_is_enforced() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    // margin-call threshold above liquidation threshold
    engine.set_loan_config(&LoanConfig {
        initial_ltv: 6_500_000,
        margin_call_ltv: 8_500_000,
        liquidation_ltv: 8_300_000,
        hourly_interest_rate: 1_000,
        liquidation_fee: 200_000,
        daily_yield_rate: 1_000,
    });
}

// ==================== Accounts ====================

#[test]
fn test_register_and_link_wallets() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = Address::generate(&e);
    let ecash = String::from_str(&e, "ecash:qz2708636snqhy4aa7wjgw");
    let solana = String::from_str(&e, "7GczfuFkhsQnT4jSi6uB2Mu7pZSqAeDGBVND");

    let profile = engine.register_user(&user, &WalletKind::Ecash, &ecash);
    assert_eq!(profile.ecash_address, Some(ecash.clone()));
    assert_eq!(profile.solana_address, None);
    assert_eq!(profile.xec, 0);

    let profile = engine.link_wallet(&user, &WalletKind::Solana, &solana);
    assert_eq!(profile.ecash_address, Some(ecash));
    assert_eq!(profile.solana_address, Some(solana));
}

#[test]
#[should_panic(expected = "Error(Contract, #11)")] // AddressInUse
fn test_chain_address_is_globally_unique() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let shared = String::from_str(&e, "ecash:qz2708636snqhy4aa7wjgw");
    let first = Address::generate(&e);
    engine.register_user(&first, &WalletKind::Ecash, &shared);

    let second = Address::generate(&e);
    engine.register_user(&second, &WalletKind::Ecash, &shared);
}

#[test]
#[should_panic(expected = "Error(Contract, #5)")] // UserNotFound
fn test_link_wallet_requires_profile() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);
    let user = Address::generate(&e);
    engine.link_wallet(&user, &WalletKind::Solana, &String::from_str(&e, "sol1"));
}

#[test]
fn test_deposits_credit_balances_and_log() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qdeposit", xec(1_000_000));
    engine.deposit_firma(&user, &(40 * SCALAR_7), &None);
    engine.deposit_usdt_bridge(&user, &(25 * SCALAR_7), &None);

    let profile = engine.get_user(&user);
    assert_eq!(profile.xec, xec(1_000_000));
    assert_eq!(profile.firma, 65 * SCALAR_7);

    let txs = engine.get_user_transactions(&user, &10);
    assert_eq!(txs.len(), 3);
    // Newest first
    let bridge = txs.get_unchecked(0);
    assert_eq!(bridge.kind, TxKind::FirmaSwap);
    assert_eq!(bridge.asset, Asset::Firma);
    assert_eq!(bridge.value_usd, Some(25 * SCALAR_7));
    assert_eq!(bridge.status, TxStatus::Confirmed);
    assert_eq!(txs.get_unchecked(2).kind, TxKind::DepositXec);
}

#[test]
fn test_withdrawal_is_pending_and_debits() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qwithdraw", xec(500_000));
    engine.withdraw_xec(&user, &xec(200_000));

    assert_eq!(engine.get_user(&user).xec, xec(300_000));
    let txs = engine.get_user_transactions(&user, &1);
    let withdrawal = txs.get_unchecked(0);
    assert_eq!(withdrawal.kind, TxKind::WithdrawXec);
    assert_eq!(withdrawal.status, TxStatus::Pending);
}

#[test]
#[should_panic(expected = "Error(Contract, #7)")] // InsufficientBalance
fn test_withdrawal_over_balance_rejected() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);
    let user = fund_user(&e, &engine, "ecash:qpoor", xec(10));
    engine.withdraw_xec(&user, &xec(11));
}

// ==================== Loan Creation ====================

#[test]
fn test_happy_path_loan() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qhappy");
    let loan = engine.get_loan(&loan_id);

    // 30 USD of collateral against 15 USD of debt
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.current_ltv, 5_000_000);
    assert_eq!(loan.initial_ltv, 5_000_000);
    assert_eq!(loan.collateral_value_usd_at_open, 30 * SCALAR_7);
    assert_eq!(loan.borrow_value_usd_at_open, 15 * SCALAR_7);

    let profile = engine.get_user(&user);
    assert_eq!(profile.xec, 0);
    assert_eq!(profile.firma, 15 * SCALAR_7);

    // XEC collateral joined the staking pool
    let pool = engine.staking_pool();
    assert_eq!(pool.user_contributed, xec(1_000_000));
    assert_eq!(pool.total, STAKING_PLATFORM_BASE + xec(1_000_000));

    let txs = engine.get_user_transactions(&user, &1);
    let borrow = txs.get_unchecked(0);
    assert_eq!(borrow.kind, TxKind::Borrow);
    assert_eq!(borrow.amount, 15 * SCALAR_7);
    assert_eq!(borrow.loan_id, Some(loan_id));
}

#[test]
fn test_creation_at_exact_cap_succeeds() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let max = engine.calculate_max_borrow(&Asset::Xec, &xec(1_000_000), &Asset::Firma);
    assert_eq!(max, 195_000_000); // 19.5 FIRMA

    let user = fund_user(&e, &engine, "ecash:qcap", xec(1_000_000));
    let loan = engine.create_loan(&user, &Asset::Xec, &xec(1_000_000), &Asset::Firma, &max);
    assert_eq!(loan.current_ltv, DEFAULT_INITIAL_LTV);
    assert_eq!(loan.status, LoanStatus::Active);
}

#[test]
#[should_panic(expected = "Error(Contract, #8)")] // LtvExceeded
fn test_creation_above_cap_fails() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qovercap", xec(1_000_000));
    // 19.51 FIRMA, one cent past the 65% cap
    engine.create_loan(
        &user,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &195_100_000,
    );
}

#[test]
#[should_panic(expected = "Error(Contract, #7)")] // InsufficientBalance
fn test_creation_without_collateral_balance_fails() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qbroke", xec(100));
    engine.create_loan(&user, &Asset::Xec, &xec(1_000), &Asset::Firma, &100);
}

#[test]
#[should_panic(expected = "Error(Contract, #12)")] // UnsupportedAsset
fn test_xecx_cannot_collateralise_a_loan() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qxecx", 0);
    engine.create_loan(&user, &Asset::Xecx, &xec(1_000), &Asset::Firma, &100);
}

// ==================== Interest ====================

#[test]
fn test_interest_first_partial_repay() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qinterest");

    // 100 hours at 0.0001/h on 15 FIRMA = 0.15 FIRMA of interest
    advance(&e, 100 * 3_600);
    assert!(engine.accrue_interest(&loan_id));
    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.accrued_interest, 1_500_000);

    // 0.10 FIRMA pays down interest before principal
    let outcome = engine.repay_loan(&loan_id, &user, &1_000_000);
    assert_eq!(outcome.fully_repaid, false);
    assert_eq!(outcome.remaining_debt, 150_500_000); // 15.05 FIRMA

    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.accrued_interest, 500_000); // 0.05 FIRMA
    assert_eq!(loan.principal, 15 * SCALAR_7);
    assert_eq!(loan.status, LoanStatus::Active);
}

#[test]
fn test_accrual_is_idempotent_within_the_hour() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qidem");

    advance(&e, 2 * 3_600);
    assert!(engine.accrue_interest(&loan_id));
    let accrued = engine.get_loan(&loan_id).accrued_interest;
    assert_eq!(accrued, 30_000); // 2 hours on 15 FIRMA

    // Same instant and half an hour later: no further charge
    assert!(!engine.accrue_interest(&loan_id));
    advance(&e, 1_800);
    assert!(!engine.accrue_interest(&loan_id));
    assert_eq!(engine.get_loan(&loan_id).accrued_interest, accrued);
}

#[test]
fn test_accrual_charge_is_logged() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qcharge");
    advance(&e, 10 * 3_600);
    engine.accrue_interest(&loan_id);

    let txs = engine.get_user_transactions(&user, &1);
    let charge = txs.get_unchecked(0);
    assert_eq!(charge.kind, TxKind::InterestPayment);
    assert_eq!(charge.amount, 150_000); // 0.015 FIRMA
    assert_eq!(charge.loan_id, Some(loan_id));
}

#[test]
fn test_accrual_can_trigger_a_margin_call() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    // Opened at the 65% cap; 2,000 hours of interest pushes LTV to 78%
    let user = fund_user(&e, &engine, "ecash:qdrift", xec(1_000_000));
    let loan = engine.create_loan(
        &user,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &195_000_000,
    );

    advance(&e, 2_000 * 3_600);
    engine.accrue_interest(&loan.id);

    let loan = engine.get_loan(&loan.id);
    assert_eq!(loan.current_ltv, 7_800_000);
    assert_eq!(loan.status, LoanStatus::MarginCall);

    let log = engine.margin_call_log(&10);
    assert_eq!(log.len(), 1);
    assert_eq!(log.get_unchecked(0).alert, AlertLevel::Warning);
}

// ==================== Repayment ====================

#[test]
fn test_full_repay_restores_balances() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qfull");
    let outcome = engine.repay_loan(&loan_id, &user, &(15 * SCALAR_7));
    assert_eq!(outcome.fully_repaid, true);
    assert_eq!(outcome.remaining_debt, 0);

    // Collateral returned, borrowed balance spent
    let profile = engine.get_user(&user);
    assert_eq!(profile.xec, xec(1_000_000));
    assert_eq!(profile.firma, 0);

    // Terminal loans hold nothing
    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.status, LoanStatus::Repaid);
    assert_eq!(loan.collateral_amount, 0);
    assert_eq!(loan.principal, 0);
    assert_eq!(loan.accrued_interest, 0);
    assert!(loan.closed_at.is_some());

    // Pool returned to its platform seed
    let pool = engine.staking_pool();
    assert_eq!(pool.user_contributed, 0);
    assert_eq!(pool.total, STAKING_PLATFORM_BASE);
}

#[test]
fn test_overpayment_is_clamped_to_debt() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qclamp");
    engine.deposit_firma(&user, &(10 * SCALAR_7), &None);

    let outcome = engine.repay_loan(&loan_id, &user, &(25 * SCALAR_7));
    assert_eq!(outcome.fully_repaid, true);
    // Only the 15 FIRMA debt was taken
    assert_eq!(engine.get_user(&user).firma, 10 * SCALAR_7);
}

#[test]
fn test_add_collateral_then_full_repay_returns_the_augmented_stack() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qstack", xec(1_100_000));
    let loan = engine.create_loan(
        &user,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(15 * SCALAR_7),
    );
    engine.add_collateral(&loan.id, &user, &xec(100_000));
    engine.repay_loan(&loan.id, &user, &(15 * SCALAR_7));

    assert_eq!(engine.get_user(&user).xec, xec(1_100_000));
}

#[test]
#[should_panic(expected = "Error(Contract, #3)")] // Unauthorized
fn test_repay_by_non_owner_rejected() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qowner");
    let stranger = fund_user(&e, &engine, "ecash:qstranger", 0);
    engine.deposit_firma(&stranger, &(15 * SCALAR_7), &None);
    engine.repay_loan(&loan_id, &stranger, &(15 * SCALAR_7));
}

#[test]
#[should_panic(expected = "Error(Contract, #9)")] // TerminalLoan
fn test_repay_terminal_loan_rejected() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qdone");
    engine.repay_loan(&loan_id, &user, &(15 * SCALAR_7));
    engine.deposit_firma(&user, &SCALAR_7, &None);
    engine.repay_loan(&loan_id, &user, &SCALAR_7);
}

// ==================== Margin Calls ====================

#[test]
fn test_price_driven_margin_call_at_the_exact_band_edge() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qband");

    // 0.0000201: LTV 74.63%, still active
    post_xec_price(&e, &oracle, 201);
    engine.update_all_ltvs();
    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.current_ltv, 7_462_686);
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(engine.margin_call_log(&10).len(), 0);

    // 0.0000200: LTV exactly 75% enters the band
    post_xec_price(&e, &oracle, 200);
    engine.update_all_ltvs();
    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.current_ltv, DEFAULT_MARGIN_CALL_LTV);
    assert_eq!(loan.status, LoanStatus::MarginCall);

    let log = engine.margin_call_log(&10);
    assert_eq!(log.len(), 1);
    assert_eq!(log.get_unchecked(0).loan_id, loan_id);
    assert_eq!(log.get_unchecked(0).alert, AlertLevel::Warning);

    // Staying in the band does not append a second entry
    engine.update_all_ltvs();
    assert_eq!(engine.margin_call_log(&10).len(), 1);
}

#[test]
fn test_margin_call_alert_escalates_to_critical() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    open_standard_loan(&e, &engine, "ecash:qcrit");

    // 0.0000185: LTV 81.08%, inside the band and past the 80% alert line
    post_xec_price(&e, &oracle, 185);
    engine.update_all_ltvs();

    let log = engine.margin_call_log(&10);
    assert_eq!(log.len(), 1);
    assert_eq!(log.get_unchecked(0).alert, AlertLevel::Critical);
}

#[test]
fn test_recovery_restores_active_status() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qrecover");

    post_xec_price(&e, &oracle, 200);
    engine.update_all_ltvs();
    assert_eq!(engine.get_loan(&loan_id).status, LoanStatus::MarginCall);

    post_xec_price(&e, &oracle, 300);
    engine.update_all_ltvs();
    assert_eq!(engine.get_loan(&loan_id).status, LoanStatus::Active);
    // Recovery is silent: the log keeps only the band entry
    assert_eq!(engine.margin_call_log(&10).len(), 1);
}

#[test]
fn test_add_collateral_lifts_a_margin_call() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let user = fund_user(&e, &engine, "ecash:qlift", xec(1_100_000));
    let loan = engine.create_loan(
        &user,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(15 * SCALAR_7),
    );

    post_xec_price(&e, &oracle, 200);
    engine.update_all_ltvs();
    assert_eq!(engine.get_loan(&loan.id).status, LoanStatus::MarginCall);

    // 100,000 more XEC at 0.0000200 drops LTV to 68.18%
    let loan = engine.add_collateral(&loan.id, &user, &xec(100_000));
    assert_eq!(loan.current_ltv, 6_818_181);
    assert_eq!(loan.status, LoanStatus::Active);

    let pool = engine.staking_pool();
    assert_eq!(pool.user_contributed, xec(1_100_000));
}

#[test]
fn test_loans_at_risk_orders_worst_first() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    // Two positions with different leverage against the same collateral
    let safe = fund_user(&e, &engine, "ecash:qsafe", xec(1_000_000));
    let safe_loan = engine.create_loan(
        &safe,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(15 * SCALAR_7),
    );
    let risky = fund_user(&e, &engine, "ecash:qrisky", xec(1_000_000));
    let risky_loan = engine.create_loan(
        &risky,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(16 * SCALAR_7),
    );

    // 0.0000205: 73.17% and 78.05% - only the second is at risk
    post_xec_price(&e, &oracle, 205);
    engine.update_all_ltvs();
    let at_risk = engine.loans_at_risk();
    assert_eq!(at_risk.len(), 1);
    assert_eq!(at_risk.get_unchecked(0).id, risky_loan.id);

    // 0.0000200: both in the band, worst first
    post_xec_price(&e, &oracle, 200);
    engine.update_all_ltvs();
    let at_risk = engine.loans_at_risk();
    assert_eq!(at_risk.len(), 2);
    assert_eq!(at_risk.get_unchecked(0).id, risky_loan.id);
    assert_eq!(at_risk.get_unchecked(1).id, safe_loan.id);
}

// ==================== Liquidation ====================

#[test]
fn test_liquidation_with_residual_collateral_returned() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qliq");

    // 0.0000180: LTV 83.33% crosses the threshold
    post_xec_price(&e, &oracle, 180);
    let receipts = engine.scan_and_liquidate();
    assert_eq!(receipts.len(), 1);

    let receipt = receipts.get_unchecked(0);
    assert_eq!(receipt.loan_id, loan_id);
    assert_eq!(receipt.debt_covered_usd, 15 * SCALAR_7);
    assert_eq!(receipt.fee_usd, 3_000_000); // 0.30 USD
    assert_eq!(receipt.sold, xec(850_000)); // 15.30 / 0.0000180
    assert_eq!(receipt.returned, xec(150_000));

    let loan = engine.get_loan(&loan_id);
    assert_eq!(loan.status, LoanStatus::Liquidated);
    assert_eq!(loan.collateral_amount, 0);
    assert_eq!(loan.principal, 0);
    assert!(loan.closed_at.is_some());

    // Residual collateral went back to the borrower
    let profile = engine.get_user(&user);
    assert_eq!(profile.xec, xec(150_000));

    // Pool dropped the whole collateral
    assert_eq!(engine.staking_pool().user_contributed, 0);

    // The log and the ledger both carry the sale
    assert_eq!(engine.liquidation_log(&10).len(), 1);
    let txs = engine.get_user_transactions(&user, &1);
    let sale = txs.get_unchecked(0);
    assert_eq!(sale.kind, TxKind::Liquidation);
    assert_eq!(sale.amount, xec(850_000));
    assert_eq!(sale.value_usd, Some(153_000_000)); // 15.30 USD
}

#[test]
fn test_liquidation_below_threshold_is_a_no_op() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qnoop");

    post_xec_price(&e, &oracle, 200);
    let receipts = engine.scan_and_liquidate();
    assert_eq!(receipts.len(), 0);
    assert!(!engine.get_loan(&loan_id).status.is_terminal());
}

#[test]
fn test_underwater_liquidation_accepts_bad_debt() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qunder");

    // 0.0000100: collateral worth 10 USD against 15.30 USD to recover
    post_xec_price(&e, &oracle, 100);
    let receipts = engine.scan_and_liquidate();

    let receipt = receipts.get_unchecked(0);
    assert_eq!(receipt.sold, xec(1_000_000)); // everything
    assert_eq!(receipt.returned, 0);

    assert_eq!(engine.get_loan(&loan_id).status, LoanStatus::Liquidated);
    assert_eq!(engine.get_user(&user).xec, 0);
}

#[test]
fn test_worthless_collateral_reads_fully_underwater_and_liquidates() {
    let e = Env::default();
    let (engine, oracle, _) = setup(&e);

    let (_, loan_id) = open_standard_loan(&e, &engine, "ecash:qzero");

    post_xec_price(&e, &oracle, 0);
    engine.update_all_ltvs();
    assert_eq!(engine.get_loan(&loan_id).current_ltv, SCALAR_7); // 100%

    let receipts = engine.scan_and_liquidate();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts.get_unchecked(0).sold, xec(1_000_000));
    assert_eq!(engine.get_loan(&loan_id).status, LoanStatus::Liquidated);
}

// ==================== Staking Distribution ====================

#[test]
fn test_daily_distribution_is_proportional() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let alice = fund_user(&e, &engine, "ecash:qalice", xec(1_000_000));
    let alice_loan = engine.create_loan(
        &alice,
        &Asset::Xec,
        &xec(1_000_000),
        &Asset::Firma,
        &(15 * SCALAR_7),
    );
    let bob = fund_user(&e, &engine, "ecash:qbob", xec(3_000_000));
    let bob_loan = engine.create_loan(
        &bob,
        &Asset::Xec,
        &xec(3_000_000),
        &Asset::Firma,
        &(45 * SCALAR_7),
    );

    // Pool: 50,000 base + 4,000,000 contributed; daily yield 405 XEC
    assert_eq!(engine.staking_pool().total, xec(4_050_000));
    let summary = engine.distribute_staking_rewards();
    assert_eq!(summary.distributed, xec(405));
    assert_eq!(summary.recipients, 2);

    // 1/4 and 3/4 splits
    assert_eq!(
        engine.get_loan(&alice_loan.id).staking_yield_earned,
        1_012_500_000 // 101.25 XEC
    );
    assert_eq!(
        engine.get_loan(&bob_loan.id).staking_yield_earned,
        3_037_500_000 // 303.75 XEC
    );

    // Paid out as the staking-wrapped coin and counted cumulatively
    let alice_profile = engine.get_user(&alice);
    assert_eq!(alice_profile.xecx, 1_012_500_000);
    assert_eq!(alice_profile.staking_rewards_earned, 1_012_500_000);

    let pool = engine.staking_pool();
    assert_eq!(pool.total_rewards_distributed, xec(405));
    assert!(pool.last_reward_distribution > 0);

    let txs = engine.get_user_transactions(&bob, &1);
    assert_eq!(txs.get_unchecked(0).kind, TxKind::StakingReward);
    assert_eq!(txs.get_unchecked(0).asset, Asset::Xecx);
}

#[test]
fn test_distribution_runs_once_per_utc_day() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (_, _) = open_standard_loan(&e, &engine, "ecash:qdaily");

    let first = engine.distribute_staking_rewards();
    assert!(first.distributed > 0);

    // One hour later, same day: nothing moves
    advance(&e, 3_600);
    let again = engine.distribute_staking_rewards();
    assert_eq!(again.distributed, 0);
    assert_eq!(again.recipients, 0);

    // Next day: pays again
    advance(&e, 86_400);
    let next_day = engine.distribute_staking_rewards();
    assert!(next_day.distributed > 0);
}

#[test]
fn test_distribution_without_xec_collateral_is_empty() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    // A FIRMA-collateralised loan earns no staking yield
    let user = fund_user(&e, &engine, "ecash:qfirmaloan", 0);
    engine.deposit_firma(&user, &(100 * SCALAR_7), &None);
    engine.create_loan(
        &user,
        &Asset::Firma,
        &(100 * SCALAR_7),
        &Asset::Xec,
        &xec(1_000_000),
    );

    let summary = engine.distribute_staking_rewards();
    assert_eq!(summary.distributed, 0);
    assert_eq!(summary.recipients, 0);
}

#[test]
fn test_user_staking_share() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, _) = open_standard_loan(&e, &engine, "ecash:qshare");
    // 1,000,000 over a 1,050,000 pool
    assert_eq!(engine.user_staking_share(&user), 9_523_809);

    let outsider = fund_user(&e, &engine, "ecash:qout", 0);
    assert_eq!(engine.user_staking_share(&outsider), 0);
}

#[test]
fn test_effective_rate_nets_staking_yield() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);
    // 0.0001/h interest minus 0.0001/24 per hour of yield
    assert_eq!(engine.effective_interest_rate(), 959);
}

// ==================== Escrow & Stats ====================

#[test]
fn test_escrow_sync_and_summary() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let chain = soroban_sdk::symbol_short!("ecash");
    engine.upsert_escrow_wallet(&chain, &String::from_str(&e, "ecash:qplatform"));
    engine.sync_escrow_balance(&chain, &Asset::Xec, &xec(2_500_000));

    let wallets = engine.escrow_wallets();
    assert_eq!(wallets.len(), 1);
    assert_eq!(
        wallets.get_unchecked(0).balances.get_unchecked(Asset::Xec),
        xec(2_500_000)
    );

    let summary = engine.escrow_summary();
    assert_eq!(summary.get_unchecked(Asset::Xec), xec(2_500_000));
}

#[test]
#[should_panic(expected = "Error(Contract, #14)")] // EscrowWalletNotFound
fn test_escrow_sync_requires_a_registered_wallet() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);
    engine.sync_escrow_balance(&soroban_sdk::symbol_short!("solana"), &Asset::Xec, &1);
}

#[test]
fn test_platform_stats() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    open_standard_loan(&e, &engine, "ecash:qstats");

    let stats = engine.get_stats();
    assert_eq!(stats.users, 1);
    assert_eq!(stats.open_loans, 1);
    assert_eq!(stats.total_collateral_usd, 30 * SCALAR_7);
    assert_eq!(stats.total_borrowed_usd, 15 * SCALAR_7);
}

// ==================== Ledger Invariant ====================

#[test]
fn test_borrow_asset_balance_matches_the_transaction_log() {
    let e = Env::default();
    let (engine, _, _) = setup(&e);

    let (user, loan_id) = open_standard_loan(&e, &engine, "ecash:qledger");
    engine.deposit_firma(&user, &(5 * SCALAR_7), &None);
    advance(&e, 50 * 3_600);
    engine.accrue_interest(&loan_id);
    engine.repay_loan(&loan_id, &user, &(2 * SCALAR_7));
    engine.withdraw_firma(&user, &SCALAR_7);

    // Net the FIRMA entries: credits minus debits equals the live balance.
    // Interest charges move debt, not balance, and stay out of the sum.
    let mut net = 0i128;
    for tx in engine.get_user_transactions(&user, &50).iter() {
        if tx.asset != Asset::Firma {
            continue;
        }
        match tx.kind {
            TxKind::DepositFirma | TxKind::FirmaSwap | TxKind::Borrow => net += tx.amount,
            TxKind::Repay | TxKind::WithdrawFirma => net -= tx.amount,
            _ => {}
        }
    }
    assert_eq!(net, engine.get_user(&user).firma);
}
