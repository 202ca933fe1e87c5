use soroban_sdk::{
    contract, contractimpl, Address, BytesN, Env, Map, String, Symbol, Vec,
};

use crate::admin::Admin;
use crate::common::error::Error;
use crate::common::storage::Storage;
use crate::common::types::{
    DistributionSummary, EscrowWallet, LiquidationReceipt, Loan, LoanConfig, MarginCallEntry,
    PlatformStats, RepayOutcome, StakingPool, TxKind, TxRecord, UserProfile, WalletKind,
};
use crate::operations::accounts::Accounts;
use crate::operations::interest::Interest;
use crate::operations::loans::Loans;
use crate::operations::oracles::Oracles;
use crate::operations::risk::Risk;
use crate::operations::staking::Staking;
use price_oracle::Asset;

#[contract]
pub struct LendingEngine;

#[contractimpl]
impl LendingEngine {
    // ==================== Setup ====================

    pub fn initialize(env: &Env, admin: Address, oracle: Address) {
        Admin::initialize(env, &admin, &oracle);
    }

    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Admin::upgrade(env, &new_wasm_hash);
    }

    pub fn set_oracle(env: &Env, oracle: Address) {
        Admin::set_oracle(env, &oracle);
    }

    pub fn set_loan_config(env: &Env, config: LoanConfig) -> Result<(), Error> {
        Admin::set_loan_config(env, &config)
    }

    /// Engine parameters served to clients before they build a loan request.
    pub fn loan_config(env: &Env) -> LoanConfig {
        Admin::loan_config(env)
    }

    // ==================== Accounts ====================

    pub fn register_user(
        env: &Env,
        user: Address,
        wallet: WalletKind,
        chain_address: String,
    ) -> Result<UserProfile, Error> {
        Accounts::register(env, &user, &wallet, &chain_address)
    }

    pub fn link_wallet(
        env: &Env,
        user: Address,
        wallet: WalletKind,
        chain_address: String,
    ) -> Result<UserProfile, Error> {
        Accounts::link_wallet(env, &user, &wallet, &chain_address)
    }

    pub fn get_user(env: &Env, user: Address) -> Result<UserProfile, Error> {
        Accounts::get_user(env, &user)
    }

    /// Indexer-observed XEC deposit.
    pub fn deposit_xec(
        env: &Env,
        user: Address,
        amount: i128,
        chain_tx: Option<String>,
    ) -> Result<(), Error> {
        Accounts::deposit(env, &user, &Asset::Xec, amount, TxKind::DepositXec, chain_tx)
    }

    /// Indexer-observed FIRMA deposit.
    pub fn deposit_firma(
        env: &Env,
        user: Address,
        amount: i128,
        chain_tx: Option<String>,
    ) -> Result<(), Error> {
        Accounts::deposit(env, &user, &Asset::Firma, amount, TxKind::DepositFirma, chain_tx)
    }

    /// Bridge credit: observed USDT deposit swapped 1:1 into FIRMA.
    pub fn deposit_usdt_bridge(
        env: &Env,
        user: Address,
        usd_amount: i128,
        chain_tx: Option<String>,
    ) -> Result<(), Error> {
        Accounts::deposit(env, &user, &Asset::Firma, usd_amount, TxKind::FirmaSwap, chain_tx)
    }

    pub fn withdraw_xec(env: &Env, user: Address, amount: i128) -> Result<(), Error> {
        Accounts::withdraw(env, &user, &Asset::Xec, amount)
    }

    pub fn withdraw_firma(env: &Env, user: Address, amount: i128) -> Result<(), Error> {
        Accounts::withdraw(env, &user, &Asset::Firma, amount)
    }

    pub fn get_user_transactions(env: &Env, user: Address, limit: u32) -> Vec<TxRecord> {
        Accounts::user_transactions(env, &user, limit)
    }

    // ==================== Loans ====================

    pub fn calculate_max_borrow(
        env: &Env,
        collateral_asset: Asset,
        collateral_amount: i128,
        borrow_asset: Asset,
    ) -> Result<i128, Error> {
        let snapshot = Oracles::snapshot(env);
        let config = Storage::get(env).config;
        Loans::max_borrow(
            &snapshot,
            &config,
            &collateral_asset,
            collateral_amount,
            &borrow_asset,
        )
    }

    pub fn calculate_ltv(
        env: &Env,
        borrow_asset: Asset,
        principal: i128,
        accrued_interest: i128,
        collateral_asset: Asset,
        collateral_amount: i128,
    ) -> Result<i128, Error> {
        let snapshot = Oracles::snapshot(env);
        Loans::loan_ltv(
            &snapshot,
            &borrow_asset,
            principal,
            accrued_interest,
            &collateral_asset,
            collateral_amount,
        )
    }

    pub fn create_loan(
        env: &Env,
        user: Address,
        collateral_asset: Asset,
        collateral_amount: i128,
        borrow_asset: Asset,
        borrow_amount: i128,
    ) -> Result<Loan, Error> {
        Loans::create_loan(
            env,
            &user,
            &collateral_asset,
            collateral_amount,
            &borrow_asset,
            borrow_amount,
        )
    }

    pub fn get_loan(env: &Env, loan_id: u64) -> Result<Loan, Error> {
        Loans::get_loan(env, loan_id)
    }

    pub fn get_user_loans(env: &Env, user: Address) -> Vec<Loan> {
        Loans::user_loans(env, &user)
    }

    pub fn repay_loan(
        env: &Env,
        loan_id: u64,
        user: Address,
        amount: i128,
    ) -> Result<RepayOutcome, Error> {
        Loans::repay_loan(env, loan_id, &user, amount)
    }

    pub fn add_collateral(
        env: &Env,
        loan_id: u64,
        user: Address,
        amount: i128,
    ) -> Result<Loan, Error> {
        Loans::add_collateral(env, loan_id, &user, amount)
    }

    // ==================== Risk Loop / Scheduler Ticks ====================

    /// Hourly tick, per loan.
    pub fn accrue_interest(env: &Env, loan_id: u64) -> Result<bool, Error> {
        Interest::accrue(env, loan_id)
    }

    /// Hourly tick, full sweep.
    pub fn accrue_all_interest(env: &Env) -> Result<u32, Error> {
        Interest::accrue_all(env)
    }

    /// Minute tick: LTV recompute and margin-band transitions.
    pub fn update_all_ltvs(env: &Env) -> Result<u32, Error> {
        Risk::update_all_ltvs(env)
    }

    /// Minute tick: liquidate everything at or past the threshold.
    pub fn scan_and_liquidate(env: &Env) -> Result<Vec<LiquidationReceipt>, Error> {
        Risk::scan_and_liquidate(env)
    }

    pub fn loans_at_risk(env: &Env) -> Vec<Loan> {
        Risk::loans_at_risk(env)
    }

    // ==================== Staking ====================

    /// Daily tick (00:00 UTC): proportional yield payout.
    pub fn distribute_staking_rewards(env: &Env) -> Result<DistributionSummary, Error> {
        Staking::distribute(env)
    }

    pub fn staking_pool(env: &Env) -> StakingPool {
        Storage::get(env).staking_pool
    }

    pub fn user_staking_share(env: &Env, user: Address) -> i128 {
        Staking::user_share(env, &user)
    }

    pub fn effective_interest_rate(env: &Env) -> i128 {
        Staking::effective_rate(env)
    }

    // ==================== Escrow & Transparency ====================

    pub fn upsert_escrow_wallet(env: &Env, chain: Symbol, address: String) {
        Admin::upsert_escrow_wallet(env, &chain, &address);
    }

    pub fn sync_escrow_balance(
        env: &Env,
        chain: Symbol,
        asset: Asset,
        balance: i128,
    ) -> Result<(), Error> {
        Admin::sync_escrow_balance(env, &chain, &asset, balance)
    }

    pub fn escrow_wallets(env: &Env) -> Vec<EscrowWallet> {
        let storage = Storage::get(env);
        let mut out = Vec::new(env);
        for (_, wallet) in storage.escrow_wallets.iter() {
            out.push_back(wallet);
        }
        out
    }

    /// Observed escrow holdings summed per asset.
    pub fn escrow_summary(env: &Env) -> Map<Asset, i128> {
        let storage = Storage::get(env);
        let mut totals: Map<Asset, i128> = Map::new(env);
        for (_, wallet) in storage.escrow_wallets.iter() {
            for (asset, balance) in wallet.balances.iter() {
                let so_far = totals.get(asset.clone()).unwrap_or(0);
                totals.set(asset, so_far + balance);
            }
        }
        totals
    }

    pub fn margin_call_log(env: &Env, limit: u32) -> Vec<MarginCallEntry> {
        let log = Storage::margin_call_log(env);
        let mut out = Vec::new(env);
        for entry in log.iter().rev().take(limit as usize) {
            out.push_back(entry);
        }
        out
    }

    pub fn liquidation_log(env: &Env, limit: u32) -> Vec<LiquidationReceipt> {
        let log = Storage::liquidation_log(env);
        let mut out = Vec::new(env);
        for receipt in log.iter().rev().take(limit as usize) {
            out.push_back(receipt);
        }
        out
    }

    pub fn get_stats(env: &Env) -> Result<PlatformStats, Error> {
        let snapshot = Oracles::snapshot(env);
        let storage = Storage::get(env);
        let mut total_collateral_usd = 0i128;
        let mut total_borrowed_usd = 0i128;
        for id in storage.open_loans.iter() {
            let Some(loan) = Storage::get_loan(env, id) else {
                continue;
            };
            total_collateral_usd = total_collateral_usd
                .checked_add(snapshot.to_usd(&loan.collateral_asset, loan.collateral_amount)?)
                .ok_or(Error::ArithmeticError)?;
            total_borrowed_usd = total_borrowed_usd
                .checked_add(snapshot.to_usd(&loan.borrow_asset, loan.total_debt()?)?)
                .ok_or(Error::ArithmeticError)?;
        }
        Ok(PlatformStats {
            users: storage.user_count,
            open_loans: storage.open_loans.len(),
            total_collateral_usd,
            total_borrowed_usd,
            staking_pool: storage.staking_pool,
        })
    }
}
