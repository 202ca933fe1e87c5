use soroban_sdk::{Env, Vec};

use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::{EngineStorage, Storage};
use crate::common::types::{
    AlertLevel, LiquidationReceipt, Loan, LoanStatus, MarginCallEntry, PriceSnapshot, TxKind,
    TxRecord, TxStatus, CRITICAL_ALERT_LTV, SCALAR_7,
};
use crate::operations::loans::Loans;
use crate::operations::oracles::Oracles;
use crate::operations::staking::Staking;
use price_oracle::Asset;

/// Margin-call detection and automated liquidation
pub struct Risk;

impl Risk {
    /// Log the band crossing, flag the loan and notify the borrower.
    pub fn trigger_margin_call(env: &Env, loan: &mut Loan, ltv: i128) {
        let alert = if ltv >= CRITICAL_ALERT_LTV {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };
        let entry = MarginCallEntry {
            loan_id: loan.id,
            borrower: loan.borrower.clone(),
            ltv,
            alert: alert.clone(),
            timestamp: env.ledger().timestamp(),
        };
        Storage::append_margin_call(env, &entry);
        loan.status = LoanStatus::MarginCall;
        Events::margin_call(env, loan.id, &loan.borrower, ltv, &alert);
    }

    /// Minute tick: recompute every open loan's LTV at one price snapshot
    /// and move statuses across the margin band. Loans at or past the
    /// liquidation threshold keep their status; the liquidation sweep owns
    /// that transition. Returns the number of loans touched.
    pub fn update_all_ltvs(env: &Env) -> Result<u32, Error> {
        let snapshot = Oracles::snapshot(env);
        let storage = Storage::get(env);
        let now = env.ledger().timestamp();
        let mut updated = 0u32;

        for id in storage.open_loans.iter() {
            let Some(mut loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.status.is_terminal() {
                continue;
            }
            let ltv = Loans::loan_ltv(
                &snapshot,
                &loan.borrow_asset,
                loan.principal,
                loan.accrued_interest,
                &loan.collateral_asset,
                loan.collateral_amount,
            )?;
            loan.current_ltv = ltv;

            if ltv >= storage.config.liquidation_ltv {
                // swept by scan_and_liquidate; no auto-repair
            } else if ltv >= storage.config.margin_call_ltv {
                if loan.status == LoanStatus::Active {
                    Self::trigger_margin_call(env, &mut loan, ltv);
                }
            } else if loan.status == LoanStatus::MarginCall {
                loan.status = LoanStatus::Active;
            }

            loan.updated_at = now;
            Storage::set_loan(env, &loan);
            Events::ltv_update(env, loan.id, &loan.borrower, ltv, &loan.status);
            updated += 1;
        }
        Ok(updated)
    }

    /// Minute tick: liquidate every open loan at or past the threshold.
    /// All-or-nothing per loan; a partially underwater loan is closed with
    /// the residual bad debt discarded.
    pub fn scan_and_liquidate(env: &Env) -> Result<Vec<LiquidationReceipt>, Error> {
        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);
        let ids = storage.open_loans.clone();
        let mut receipts = Vec::new(env);

        for id in ids.iter() {
            let Some(mut loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.status.is_terminal() {
                continue;
            }
            let ltv = Loans::loan_ltv(
                &snapshot,
                &loan.borrow_asset,
                loan.principal,
                loan.accrued_interest,
                &loan.collateral_asset,
                loan.collateral_amount,
            )?;
            if ltv < storage.config.liquidation_ltv {
                continue;
            }
            loan.current_ltv = ltv;
            let receipt = Self::liquidate(env, &mut storage, &snapshot, &mut loan)?;
            receipts.push_back(receipt);
        }

        Storage::set(env, &storage);
        Ok(receipts)
    }

    /// Open loans inside or past the margin band, worst first.
    pub fn loans_at_risk(env: &Env) -> Vec<Loan> {
        let storage = Storage::get(env);
        let mut out: Vec<Loan> = Vec::new(env);
        for id in storage.open_loans.iter() {
            let Some(loan) = Storage::get_loan(env, id) else {
                continue;
            };
            if loan.status.is_terminal() || loan.current_ltv < storage.config.margin_call_ltv {
                continue;
            }
            let mut index = 0u32;
            while index < out.len() && out.get_unchecked(index).current_ltv >= loan.current_ltv {
                index += 1;
            }
            out.insert(index, loan);
        }
        out
    }

    /// Close one underwater loan: sell just enough collateral to cover debt
    /// plus the liquidation fee, return the rest to the borrower.
    fn liquidate(
        env: &Env,
        storage: &mut EngineStorage,
        snapshot: &PriceSnapshot,
        loan: &mut Loan,
    ) -> Result<LiquidationReceipt, Error> {
        let fee = storage.config.liquidation_fee;
        let total_debt = loan.total_debt()?;
        let debt_usd = snapshot.to_usd(&loan.borrow_asset, total_debt)?;
        let fee_usd = debt_usd.checked_mul(fee).ok_or(Error::ArithmeticError)? / SCALAR_7;
        let recover_usd = debt_usd.checked_add(fee_usd).ok_or(Error::ArithmeticError)?;

        let collateral = loan.collateral_amount;
        let collateral_asset = loan.collateral_asset.clone();
        // A worthless collateral cannot cover anything; everything is sold.
        let sold = if snapshot.price(&collateral_asset) == 0 {
            collateral
        } else {
            snapshot.from_usd(&collateral_asset, recover_usd)?.min(collateral)
        };
        let returned = collateral - sold;
        let fee_collateral = sold.checked_mul(fee).ok_or(Error::ArithmeticError)?
            / (SCALAR_7 + fee);

        let now = env.ledger().timestamp();
        let borrower = loan.borrower.clone();

        if collateral_asset == Asset::Xec {
            Staking::collateral_removed(&mut storage.staking_pool, collateral);
        }
        Loans::close(loan, LoanStatus::Liquidated, now);
        Loans::remove_open_loan(storage, loan.id);

        let mut profile = Storage::get_user(env, &borrower).ok_or(Error::UserNotFound)?;
        if returned > 0 {
            profile.credit(&collateral_asset, returned)?;
        }
        Storage::set_user(env, &borrower, &profile);
        Storage::set_loan(env, loan);

        Storage::append_tx(
            env,
            storage,
            &TxRecord {
                id: 0,
                user: borrower.clone(),
                loan_id: Some(loan.id),
                kind: TxKind::Liquidation,
                asset: collateral_asset.clone(),
                amount: sold,
                value_usd: Some(recover_usd),
                chain_tx: None,
                status: TxStatus::Confirmed,
                timestamp: now,
            },
        );

        let receipt = LiquidationReceipt {
            loan_id: loan.id,
            borrower: borrower.clone(),
            collateral_asset: collateral_asset.clone(),
            sold,
            debt_covered_usd: debt_usd,
            fee_usd,
            fee_collateral,
            returned,
            timestamp: now,
        };
        Storage::append_liquidation(env, &receipt);

        Events::liquidation(env, &receipt);
        if returned > 0 {
            Events::balance_update(
                env,
                &borrower,
                &collateral_asset,
                profile.balance(&collateral_asset),
            );
        }
        Ok(receipt)
    }
}
