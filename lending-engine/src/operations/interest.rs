use soroban_sdk::Env;

use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::Storage;
use crate::common::types::{LoanStatus, TxKind, TxRecord, TxStatus, SCALAR_7, SECONDS_PER_HOUR};
use crate::operations::loans::Loans;
use crate::operations::oracles::Oracles;
use crate::operations::risk::Risk;

/// Simple interest, charged per whole elapsed hour at the rate fixed when
/// the loan was opened.
pub struct Interest;

impl Interest {
    /// Charge `⌊hours since last accrual⌋` of interest onto the loan's
    /// debt. A second call inside the same hour is a no-op, so the hourly
    /// tick is idempotent. Returns whether anything was charged.
    pub fn accrue(env: &Env, loan_id: u64) -> Result<bool, Error> {
        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);
        let mut loan = Storage::get_loan(env, loan_id).ok_or(Error::LoanNotFound)?;
        if loan.status.is_terminal() {
            return Ok(false);
        }

        let now = env.ledger().timestamp();
        let hours = now.saturating_sub(loan.last_interest_update) / SECONDS_PER_HOUR;
        if hours < 1 {
            return Ok(false);
        }

        let charge = loan
            .principal
            .checked_mul(loan.interest_rate)
            .ok_or(Error::ArithmeticError)?
            .checked_mul(hours as i128)
            .ok_or(Error::ArithmeticError)?
            / SCALAR_7;

        loan.accrued_interest = loan
            .accrued_interest
            .checked_add(charge)
            .ok_or(Error::ArithmeticError)?;
        loan.last_interest_update = now;
        loan.updated_at = now;

        loan.current_ltv = Loans::loan_ltv(
            &snapshot,
            &loan.borrow_asset,
            loan.principal,
            loan.accrued_interest,
            &loan.collateral_asset,
            loan.collateral_amount,
        )?;

        // Band entry caused by the charge raises a margin call; anything at
        // or past the liquidation threshold is left for the risk sweep.
        if loan.current_ltv < storage.config.liquidation_ltv
            && loan.current_ltv >= storage.config.margin_call_ltv
            && loan.status == LoanStatus::Active
        {
            let current_ltv = loan.current_ltv;
            Risk::trigger_margin_call(env, &mut loan, current_ltv);
        }

        let value_usd = snapshot.to_usd(&loan.borrow_asset, charge)?;
        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: loan.borrower.clone(),
                loan_id: Some(loan_id),
                kind: TxKind::InterestPayment,
                asset: loan.borrow_asset.clone(),
                amount: charge,
                value_usd: Some(value_usd),
                chain_tx: None,
                status: TxStatus::Confirmed,
                timestamp: now,
            },
        );

        Storage::set_loan(env, &loan);
        Storage::set(env, &storage);

        Events::ltv_update(env, loan.id, &loan.borrower, loan.current_ltv, &loan.status);
        Ok(true)
    }

    /// Hourly tick: accrue every open loan.
    pub fn accrue_all(env: &Env) -> Result<u32, Error> {
        let ids = Storage::get(env).open_loans;
        let mut accrued = 0u32;
        for id in ids.iter() {
            if Self::accrue(env, id)? {
                accrued += 1;
            }
        }
        Ok(accrued)
    }
}
