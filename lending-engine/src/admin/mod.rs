use soroban_sdk::{panic_with_error, Address, Env, Map, String, Symbol, Vec};

use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::{EngineStorage, Storage};
use crate::common::types::{EscrowWallet, LoanConfig, StakingPool, STAKING_PLATFORM_BASE};
use price_oracle::Asset;

/// Administrative functions for the lending engine
pub struct Admin;

impl Admin {
    /// Initialize the engine with default risk parameters and the seeded
    /// staking pool.
    pub fn initialize(env: &Env, admin: &Address, oracle: &Address) {
        if Storage::is_initialized(env) {
            panic_with_error!(env, Error::AlreadyInitialized);
        }

        Storage::set_admin(env, admin);

        let storage = EngineStorage {
            oracle: oracle.clone(),
            config: LoanConfig::default_config(),
            staking_pool: StakingPool {
                platform_base: STAKING_PLATFORM_BASE,
                user_contributed: 0,
                total: STAKING_PLATFORM_BASE,
                last_reward_distribution: 0,
                total_rewards_distributed: 0,
            },
            next_loan_id: 1,
            next_tx_id: 1,
            user_count: 0,
            open_loans: Vec::new(env),
            escrow_wallets: Map::new(env),
        };

        Storage::set(env, &storage);
    }

    pub fn get_admin(env: &Env) -> Address {
        Storage::get_admin(env)
    }

    pub fn require_admin(env: &Env) {
        let admin = Self::get_admin(env);
        admin.require_auth();
    }

    /// Replace the oracle contract consulted for valuations.
    pub fn set_oracle(env: &Env, oracle: &Address) {
        Self::require_admin(env);
        let mut storage = Storage::get(env);
        storage.oracle = oracle.clone();
        Storage::set(env, &storage);
    }

    /// Replace the engine parameters after ordering validation.
    pub fn set_loan_config(env: &Env, config: &LoanConfig) -> Result<(), Error> {
        Self::require_admin(env);
        config.validate()?;
        let mut storage = Storage::get(env);
        storage.config = config.clone();
        Storage::set(env, &storage);
        Ok(())
    }

    pub fn loan_config(env: &Env) -> LoanConfig {
        Storage::get(env).config
    }

    // ========== Escrow Wallets ==========

    /// Register or replace the observed escrow wallet for a chain.
    pub fn upsert_escrow_wallet(env: &Env, chain: &Symbol, address: &String) {
        Self::require_admin(env);
        let mut storage = Storage::get(env);
        let wallet = EscrowWallet {
            chain: chain.clone(),
            address: address.clone(),
            balances: Map::new(env),
            updated_at: env.ledger().timestamp(),
        };
        storage.escrow_wallets.set(chain.clone(), wallet);
        Storage::set(env, &storage);
    }

    /// Record an indexer-observed balance for an escrow wallet. Reporting
    /// only; user balances are untouched.
    pub fn sync_escrow_balance(
        env: &Env,
        chain: &Symbol,
        asset: &Asset,
        balance: i128,
    ) -> Result<(), Error> {
        Self::require_admin(env);
        let mut storage = Storage::get(env);
        let mut wallet = storage
            .escrow_wallets
            .get(chain.clone())
            .ok_or(Error::EscrowWalletNotFound)?;
        wallet.balances.set(asset.clone(), balance);
        wallet.updated_at = env.ledger().timestamp();
        storage.escrow_wallets.set(chain.clone(), wallet);
        Storage::set(env, &storage);

        Events::escrow_sync(env, chain, asset, balance);
        Ok(())
    }

    /// Upgrade the contract to a new WASM hash
    pub fn upgrade(env: &Env, new_wasm_hash: &soroban_sdk::BytesN<32>) {
        Self::require_admin(env);
        env.deployer()
            .update_current_contract_wasm(new_wasm_hash.clone());
    }
}
