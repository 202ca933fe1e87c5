use soroban_sdk::{contractevent, Address, Env, Symbol};

use crate::common::types::{AlertLevel, LiquidationReceipt, LoanStatus, TxKind};
use price_oracle::Asset;

/// Events emitted by the lending engine. Per-user events carry the user
/// address; broadcast events carry none. Emission happens only when the
/// invocation commits.
#[contractevent]
pub struct BalanceUpdateEvent {
    pub user: Address,
    pub asset: Asset,
    pub balance: i128,
}

#[contractevent]
pub struct DepositEvent {
    pub user: Address,
    pub asset: Asset,
    pub amount: i128,
    pub kind: TxKind,
}

#[contractevent]
pub struct WithdrawalEvent {
    pub user: Address,
    pub asset: Asset,
    pub amount: i128,
}

#[contractevent]
pub struct LoanCreatedEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub collateral_asset: Asset,
    pub collateral_amount: i128,
    pub borrow_asset: Asset,
    pub borrow_amount: i128,
    pub ltv: i128,
}

#[contractevent]
pub struct LtvUpdateEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub ltv: i128,
    pub status: LoanStatus,
}

#[contractevent]
pub struct MarginCallEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub ltv: i128,
    pub alert: AlertLevel,
}

#[contractevent]
pub struct LiquidationEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub sold: i128,
    pub debt_covered_usd: i128,
    pub fee_usd: i128,
    pub returned: i128,
}

#[contractevent]
pub struct RepaymentEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub amount: i128,
    pub remaining_debt: i128,
    pub fully_repaid: bool,
}

#[contractevent]
pub struct CollateralAddedEvent {
    pub loan_id: u64,
    pub borrower: Address,
    pub amount: i128,
    pub ltv: i128,
}

#[contractevent]
pub struct StakingRewardEvent {
    pub user: Address,
    pub amount: i128,
    pub total_earned: i128,
}

#[contractevent]
pub struct EscrowSyncEvent {
    pub chain: Symbol,
    pub asset: Asset,
    pub balance: i128,
}

/// Helper struct for publishing events
pub struct Events;

impl Events {
    pub fn balance_update(env: &Env, user: &Address, asset: &Asset, balance: i128) {
        BalanceUpdateEvent {
            user: user.clone(),
            asset: asset.clone(),
            balance,
        }
        .publish(env);
    }

    pub fn deposit(env: &Env, user: &Address, asset: &Asset, amount: i128, kind: TxKind) {
        DepositEvent {
            user: user.clone(),
            asset: asset.clone(),
            amount,
            kind,
        }
        .publish(env);
    }

    pub fn withdrawal(env: &Env, user: &Address, asset: &Asset, amount: i128) {
        WithdrawalEvent {
            user: user.clone(),
            asset: asset.clone(),
            amount,
        }
        .publish(env);
    }

    pub fn loan_created(
        env: &Env,
        loan_id: u64,
        borrower: &Address,
        collateral_asset: &Asset,
        collateral_amount: i128,
        borrow_asset: &Asset,
        borrow_amount: i128,
        ltv: i128,
    ) {
        LoanCreatedEvent {
            loan_id,
            borrower: borrower.clone(),
            collateral_asset: collateral_asset.clone(),
            collateral_amount,
            borrow_asset: borrow_asset.clone(),
            borrow_amount,
            ltv,
        }
        .publish(env);
    }

    pub fn ltv_update(env: &Env, loan_id: u64, borrower: &Address, ltv: i128, status: &LoanStatus) {
        LtvUpdateEvent {
            loan_id,
            borrower: borrower.clone(),
            ltv,
            status: status.clone(),
        }
        .publish(env);
    }

    pub fn margin_call(env: &Env, loan_id: u64, borrower: &Address, ltv: i128, alert: &AlertLevel) {
        MarginCallEvent {
            loan_id,
            borrower: borrower.clone(),
            ltv,
            alert: alert.clone(),
        }
        .publish(env);
    }

    pub fn liquidation(env: &Env, receipt: &LiquidationReceipt) {
        LiquidationEvent {
            loan_id: receipt.loan_id,
            borrower: receipt.borrower.clone(),
            sold: receipt.sold,
            debt_covered_usd: receipt.debt_covered_usd,
            fee_usd: receipt.fee_usd,
            returned: receipt.returned,
        }
        .publish(env);
    }

    pub fn repayment(
        env: &Env,
        loan_id: u64,
        borrower: &Address,
        amount: i128,
        remaining_debt: i128,
        fully_repaid: bool,
    ) {
        RepaymentEvent {
            loan_id,
            borrower: borrower.clone(),
            amount,
            remaining_debt,
            fully_repaid,
        }
        .publish(env);
    }

    pub fn collateral_added(env: &Env, loan_id: u64, borrower: &Address, amount: i128, ltv: i128) {
        CollateralAddedEvent {
            loan_id,
            borrower: borrower.clone(),
            amount,
            ltv,
        }
        .publish(env);
    }

    pub fn staking_reward(env: &Env, user: &Address, amount: i128, total_earned: i128) {
        StakingRewardEvent {
            user: user.clone(),
            amount,
            total_earned,
        }
        .publish(env);
    }

    pub fn escrow_sync(env: &Env, chain: &Symbol, asset: &Asset, balance: i128) {
        EscrowSyncEvent {
            chain: chain.clone(),
            asset: asset.clone(),
            balance,
        }
        .publish(env);
    }
}
