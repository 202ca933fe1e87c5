use soroban_sdk::{contracttype, panic_with_error, Address, Env, Map, String, Symbol, Vec};

use crate::common::error::Error;
use crate::common::types::{
    EscrowWallet, LiquidationReceipt, Loan, LoanConfig, MarginCallEntry, StakingPool, TxRecord,
    UserProfile, ADMIN_KEY, INSTANCE_BUMP, INSTANCE_TTL, STORAGE, USER_BUMP, USER_TTL,
};

/// Singleton engine state held in instance storage.
#[contracttype]
#[derive(Clone, Debug)]
pub struct EngineStorage {
    /// Price oracle contract consulted for every valuation
    pub oracle: Address,
    pub config: LoanConfig,
    pub staking_pool: StakingPool,

    /// Next identifiers for loans and transaction records
    pub next_loan_id: u64,
    pub next_tx_id: u64,
    pub user_count: u32,

    /// Ids of loans in a non-terminal state, in creation order
    pub open_loans: Vec<u64>,

    /// Observed platform escrow wallets, keyed by chain
    pub escrow_wallets: Map<Symbol, EscrowWallet>,
}

/// Persistent storage keys for per-user and append-only data.
#[contracttype]
pub enum DataKey {
    User(Address),
    UserLoans(Address),
    UserTxs(Address),
    Loan(u64),
    Tx(u64),
    MarginCalls,
    Liquidations,
    /// Reverse index: linked eCash address -> profile owner
    EcashOwner(String),
    /// Reverse index: linked Solana address -> profile owner
    SolanaOwner(String),
}

/// Storage operations for the lending engine
pub struct Storage;

impl Storage {
    // ========== TTL Management ==========

    pub fn extend_instance_ttl(env: &Env) {
        env.storage().instance().extend_ttl(INSTANCE_TTL, INSTANCE_BUMP);
    }

    fn extend_persistent_ttl(env: &Env, key: &DataKey) {
        env.storage().persistent().extend_ttl(key, USER_TTL, USER_BUMP);
    }

    // ========== Instance Storage Operations ==========

    pub fn get(env: &Env) -> EngineStorage {
        Self::extend_instance_ttl(env);
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized))
    }

    pub fn set(env: &Env, storage: &EngineStorage) {
        env.storage().instance().set(&STORAGE, storage);
        Self::extend_instance_ttl(env);
    }

    pub fn is_initialized(env: &Env) -> bool {
        env.storage().instance().has(&STORAGE)
    }

    pub fn get_admin(env: &Env) -> Address {
        Self::extend_instance_ttl(env);
        env.storage()
            .instance()
            .get(&ADMIN_KEY)
            .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized))
    }

    pub fn set_admin(env: &Env, admin: &Address) {
        if env.storage().instance().has(&ADMIN_KEY) {
            panic_with_error!(env, Error::AlreadyInitialized);
        }
        env.storage().instance().set(&ADMIN_KEY, admin);
        Self::extend_instance_ttl(env);
    }

    // ========== User Profiles ==========

    pub fn get_user(env: &Env, user: &Address) -> Option<UserProfile> {
        let key = DataKey::User(user.clone());
        let profile: Option<UserProfile> = env.storage().persistent().get(&key);
        if profile.is_some() {
            Self::extend_persistent_ttl(env, &key);
        }
        profile
    }

    pub fn set_user(env: &Env, user: &Address, profile: &UserProfile) {
        let key = DataKey::User(user.clone());
        env.storage().persistent().set(&key, profile);
        Self::extend_persistent_ttl(env, &key);
    }

    // ========== Chain Address Indexes ==========

    pub fn ecash_owner(env: &Env, address: &String) -> Option<Address> {
        env.storage()
            .persistent()
            .get(&DataKey::EcashOwner(address.clone()))
    }

    pub fn set_ecash_owner(env: &Env, address: &String, user: &Address) {
        let key = DataKey::EcashOwner(address.clone());
        env.storage().persistent().set(&key, user);
        Self::extend_persistent_ttl(env, &key);
    }

    pub fn solana_owner(env: &Env, address: &String) -> Option<Address> {
        env.storage()
            .persistent()
            .get(&DataKey::SolanaOwner(address.clone()))
    }

    pub fn set_solana_owner(env: &Env, address: &String, user: &Address) {
        let key = DataKey::SolanaOwner(address.clone());
        env.storage().persistent().set(&key, user);
        Self::extend_persistent_ttl(env, &key);
    }

    // ========== Loans ==========

    pub fn get_loan(env: &Env, loan_id: u64) -> Option<Loan> {
        let key = DataKey::Loan(loan_id);
        let loan: Option<Loan> = env.storage().persistent().get(&key);
        if loan.is_some() {
            Self::extend_persistent_ttl(env, &key);
        }
        loan
    }

    pub fn set_loan(env: &Env, loan: &Loan) {
        let key = DataKey::Loan(loan.id);
        env.storage().persistent().set(&key, loan);
        Self::extend_persistent_ttl(env, &key);
    }

    pub fn user_loan_ids(env: &Env, user: &Address) -> Vec<u64> {
        env.storage()
            .persistent()
            .get(&DataKey::UserLoans(user.clone()))
            .unwrap_or_else(|| Vec::new(env))
    }

    pub fn push_user_loan(env: &Env, user: &Address, loan_id: u64) {
        let key = DataKey::UserLoans(user.clone());
        let mut ids = Self::user_loan_ids(env, user);
        ids.push_back(loan_id);
        env.storage().persistent().set(&key, &ids);
        Self::extend_persistent_ttl(env, &key);
    }

    // ========== Transaction Log ==========

    /// Assign the next id to `record`, persist it and index it under its
    /// user. The caller saves the mutated instance state.
    pub fn append_tx(env: &Env, state: &mut EngineStorage, record: &TxRecord) -> u64 {
        let id = state.next_tx_id;
        state.next_tx_id += 1;

        let mut record = record.clone();
        record.id = id;
        let key = DataKey::Tx(id);
        env.storage().persistent().set(&key, &record);
        Self::extend_persistent_ttl(env, &key);

        let user_key = DataKey::UserTxs(record.user.clone());
        let mut ids: Vec<u64> = env
            .storage()
            .persistent()
            .get(&user_key)
            .unwrap_or_else(|| Vec::new(env));
        ids.push_back(id);
        env.storage().persistent().set(&user_key, &ids);
        Self::extend_persistent_ttl(env, &user_key);
        id
    }

    pub fn get_tx(env: &Env, tx_id: u64) -> Option<TxRecord> {
        env.storage().persistent().get(&DataKey::Tx(tx_id))
    }

    pub fn user_tx_ids(env: &Env, user: &Address) -> Vec<u64> {
        env.storage()
            .persistent()
            .get(&DataKey::UserTxs(user.clone()))
            .unwrap_or_else(|| Vec::new(env))
    }

    // ========== Risk Logs ==========

    pub fn margin_call_log(env: &Env) -> Vec<MarginCallEntry> {
        env.storage()
            .persistent()
            .get(&DataKey::MarginCalls)
            .unwrap_or_else(|| Vec::new(env))
    }

    pub fn append_margin_call(env: &Env, entry: &MarginCallEntry) {
        let mut log = Self::margin_call_log(env);
        log.push_back(entry.clone());
        env.storage().persistent().set(&DataKey::MarginCalls, &log);
        Self::extend_persistent_ttl(env, &DataKey::MarginCalls);
    }

    pub fn liquidation_log(env: &Env) -> Vec<LiquidationReceipt> {
        env.storage()
            .persistent()
            .get(&DataKey::Liquidations)
            .unwrap_or_else(|| Vec::new(env))
    }

    pub fn append_liquidation(env: &Env, receipt: &LiquidationReceipt) {
        let mut log = Self::liquidation_log(env);
        log.push_back(receipt.clone());
        env.storage().persistent().set(&DataKey::Liquidations, &log);
        Self::extend_persistent_ttl(env, &DataKey::Liquidations);
    }
}
