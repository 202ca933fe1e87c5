use soroban_sdk::{Address, Env, String, Vec};

use crate::admin::Admin;
use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::Storage;
use crate::common::types::{TxKind, TxRecord, TxStatus, UserProfile, WalletKind};
use price_oracle::Asset;

/// User accounts, balances and observed deposits/withdrawals
pub struct Accounts;

impl Accounts {
    /// Upsert a profile for the caller and link a chain address to it.
    /// Address uniqueness is global: a linked address can never move to
    /// another profile.
    pub fn register(
        env: &Env,
        user: &Address,
        wallet: &WalletKind,
        chain_address: &String,
    ) -> Result<UserProfile, Error> {
        user.require_auth();

        let mut profile = match Storage::get_user(env, user) {
            Some(profile) => profile,
            None => {
                let mut storage = Storage::get(env);
                storage.user_count += 1;
                Storage::set(env, &storage);
                UserProfile::new(env.ledger().timestamp())
            }
        };

        Self::claim_address(env, user, wallet, chain_address)?;
        match wallet {
            WalletKind::Ecash => profile.ecash_address = Some(chain_address.clone()),
            WalletKind::Solana => profile.solana_address = Some(chain_address.clone()),
        }
        Storage::set_user(env, user, &profile);
        Ok(profile)
    }

    /// Link an additional chain address to an existing profile.
    pub fn link_wallet(
        env: &Env,
        user: &Address,
        wallet: &WalletKind,
        chain_address: &String,
    ) -> Result<UserProfile, Error> {
        user.require_auth();

        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        Self::claim_address(env, user, wallet, chain_address)?;
        match wallet {
            WalletKind::Ecash => profile.ecash_address = Some(chain_address.clone()),
            WalletKind::Solana => profile.solana_address = Some(chain_address.clone()),
        }
        Storage::set_user(env, user, &profile);
        Ok(profile)
    }

    pub fn get_user(env: &Env, user: &Address) -> Result<UserProfile, Error> {
        Storage::get_user(env, user).ok_or(Error::UserNotFound)
    }

    /// Credit a deposit observed by the platform indexer. Operator-only:
    /// the funds were confirmed on an external chain, the engine records
    /// the ledger entry.
    pub fn deposit(
        env: &Env,
        user: &Address,
        asset: &Asset,
        amount: i128,
        kind: TxKind,
        chain_tx: Option<String>,
    ) -> Result<(), Error> {
        Admin::require_admin(env);
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        profile.credit(asset, amount)?;
        Storage::set_user(env, user, &profile);

        // FIRMA-denominated entries are USD 1:1 by construction
        let value_usd = match asset {
            Asset::Firma => Some(amount),
            _ => None,
        };

        let mut storage = Storage::get(env);
        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: user.clone(),
                loan_id: None,
                kind: kind.clone(),
                asset: asset.clone(),
                amount,
                value_usd,
                chain_tx,
                status: TxStatus::Confirmed,
                timestamp: env.ledger().timestamp(),
            },
        );
        Storage::set(env, &storage);

        Events::deposit(env, user, asset, amount, kind);
        Events::balance_update(env, user, asset, profile.balance(asset));
        Ok(())
    }

    /// Debit a withdrawal request. The external broadcast happens off the
    /// engine; the entry stays pending until the indexer confirms it.
    pub fn withdraw(env: &Env, user: &Address, asset: &Asset, amount: i128) -> Result<(), Error> {
        user.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let kind = match asset {
            Asset::Xec => TxKind::WithdrawXec,
            Asset::Firma => TxKind::WithdrawFirma,
            Asset::Xecx => return Err(Error::UnsupportedAsset),
        };

        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        profile.debit(asset, amount)?;
        Storage::set_user(env, user, &profile);

        let mut storage = Storage::get(env);
        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: user.clone(),
                loan_id: None,
                kind,
                asset: asset.clone(),
                amount,
                value_usd: None,
                chain_tx: None,
                status: TxStatus::Pending,
                timestamp: env.ledger().timestamp(),
            },
        );
        Storage::set(env, &storage);

        Events::withdrawal(env, user, asset, amount);
        Events::balance_update(env, user, asset, profile.balance(asset));
        Ok(())
    }

    /// The user's transaction history, newest first, capped at `limit`.
    pub fn user_transactions(env: &Env, user: &Address, limit: u32) -> Vec<TxRecord> {
        let ids = Storage::user_tx_ids(env, user);
        let mut out = Vec::new(env);
        for id in ids.iter().rev().take(limit as usize) {
            if let Some(record) = Storage::get_tx(env, id) {
                out.push_back(record);
            }
        }
        out
    }

    fn claim_address(
        env: &Env,
        user: &Address,
        wallet: &WalletKind,
        chain_address: &String,
    ) -> Result<(), Error> {
        let owner = match wallet {
            WalletKind::Ecash => Storage::ecash_owner(env, chain_address),
            WalletKind::Solana => Storage::solana_owner(env, chain_address),
        };
        if let Some(owner) = owner {
            if owner != *user {
                return Err(Error::AddressInUse);
            }
            return Ok(());
        }
        match wallet {
            WalletKind::Ecash => Storage::set_ecash_owner(env, chain_address, user),
            WalletKind::Solana => Storage::set_solana_owner(env, chain_address, user),
        }
        Ok(())
    }
}
