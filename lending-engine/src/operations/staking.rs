use soroban_sdk::{Address, Env, Map};

use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::Storage;
use crate::common::types::{
    DistributionSummary, StakingPool, TxKind, TxRecord, TxStatus, SCALAR_7, SECONDS_PER_DAY,
};
use crate::operations::oracles::Oracles;
use price_oracle::Asset;

/// Staking pool bookkeeping and the daily proportional yield paid to
/// XEC-collateralised borrowers.
pub struct Staking;

impl Staking {
    /// XEC collateral entering an open loan joins the pool.
    pub fn collateral_added(pool: &mut StakingPool, amount: i128) -> Result<(), Error> {
        pool.user_contributed = pool
            .user_contributed
            .checked_add(amount)
            .ok_or(Error::ArithmeticError)?;
        pool.total = pool
            .platform_base
            .checked_add(pool.user_contributed)
            .ok_or(Error::ArithmeticError)?;
        Ok(())
    }

    /// Inverse on removal (full repay or liquidation), clamped so
    /// `user_contributed >= 0` and `total = platform_base + user_contributed`
    /// hold unconditionally.
    pub fn collateral_removed(pool: &mut StakingPool, amount: i128) {
        pool.user_contributed = (pool.user_contributed - amount).max(0);
        pool.total = pool.platform_base + pool.user_contributed;
    }

    /// Daily tick: split `total × daily_yield_rate` across open
    /// XEC-collateralised loans, proportional to collateral. One run per
    /// UTC day; a same-day re-invocation distributes nothing. Rewards are
    /// paid as XECX (the staking-wrapped coin) in one atomic invocation.
    pub fn distribute(env: &Env) -> Result<DistributionSummary, Error> {
        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);
        let now = env.ledger().timestamp();

        let last = storage.staking_pool.last_reward_distribution;
        if last != 0 && last / SECONDS_PER_DAY == now / SECONDS_PER_DAY {
            return Ok(DistributionSummary {
                distributed: 0,
                recipients: 0,
            });
        }

        let daily_reward = storage
            .staking_pool
            .total
            .checked_mul(storage.config.daily_yield_rate)
            .ok_or(Error::ArithmeticError)?
            / SCALAR_7;

        let mut collateral_sum = 0i128;
        for id in storage.open_loans.iter() {
            let Some(loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.collateral_asset == Asset::Xec && !loan.status.is_terminal() {
                collateral_sum = collateral_sum
                    .checked_add(loan.collateral_amount)
                    .ok_or(Error::ArithmeticError)?;
            }
        }
        if collateral_sum == 0 || daily_reward == 0 {
            return Ok(DistributionSummary {
                distributed: 0,
                recipients: 0,
            });
        }

        let mut per_user: Map<Address, i128> = Map::new(env);
        let mut distributed = 0i128;
        for id in storage.open_loans.iter() {
            let Some(mut loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.collateral_asset != Asset::Xec || loan.status.is_terminal() {
                continue;
            }
            let reward = daily_reward
                .checked_mul(loan.collateral_amount)
                .ok_or(Error::ArithmeticError)?
                / collateral_sum;
            if reward == 0 {
                continue;
            }
            loan.staking_yield_earned = loan
                .staking_yield_earned
                .checked_add(reward)
                .ok_or(Error::ArithmeticError)?;
            loan.updated_at = now;
            Storage::set_loan(env, &loan);

            let so_far = per_user.get(loan.borrower.clone()).unwrap_or(0);
            per_user.set(loan.borrower.clone(), so_far + reward);
            distributed += reward;
        }

        let mut recipients = 0u32;
        for (user, amount) in per_user.iter() {
            let mut profile = Storage::get_user(env, &user).ok_or(Error::UserNotFound)?;
            profile.credit(&Asset::Xecx, amount)?;
            profile.staking_rewards_earned = profile
                .staking_rewards_earned
                .checked_add(amount)
                .ok_or(Error::ArithmeticError)?;
            Storage::set_user(env, &user, &profile);

            let value_usd = snapshot.to_usd(&Asset::Xecx, amount)?;
            Storage::append_tx(
                env,
                &mut storage,
                &TxRecord {
                    id: 0,
                    user: user.clone(),
                    loan_id: None,
                    kind: TxKind::StakingReward,
                    asset: Asset::Xecx,
                    amount,
                    value_usd: Some(value_usd),
                    chain_tx: None,
                    status: TxStatus::Confirmed,
                    timestamp: now,
                },
            );
            Events::staking_reward(env, &user, amount, profile.staking_rewards_earned);
            Events::balance_update(env, &user, &Asset::Xecx, profile.xecx);
            recipients += 1;
        }

        storage.staking_pool.last_reward_distribution = now;
        storage.staking_pool.total_rewards_distributed = storage
            .staking_pool
            .total_rewards_distributed
            .checked_add(distributed)
            .ok_or(Error::ArithmeticError)?;
        Storage::set(env, &storage);

        Ok(DistributionSummary {
            distributed,
            recipients,
        })
    }

    /// The user's share of the pool as a 7-decimal fraction: their open XEC
    /// collateral over pool total.
    pub fn user_share(env: &Env, user: &Address) -> i128 {
        let storage = Storage::get(env);
        if storage.staking_pool.total == 0 {
            return 0;
        }
        let mut sum = 0i128;
        for id in Storage::user_loan_ids(env, user).iter() {
            let Some(loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.collateral_asset == Asset::Xec && !loan.status.is_terminal() {
                sum += loan.collateral_amount;
            }
        }
        sum * SCALAR_7 / storage.staking_pool.total
    }

    /// Net hourly borrow cost once staking yield is netted off.
    pub fn effective_rate(env: &Env) -> i128 {
        let storage = Storage::get(env);
        let hourly_yield = storage.config.daily_yield_rate / 24;
        (storage.config.hourly_interest_rate - hourly_yield).max(0)
    }
}
