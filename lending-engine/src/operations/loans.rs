use soroban_sdk::{Address, Env, Vec};

use crate::common::error::Error;
use crate::common::events::Events;
use crate::common::storage::{EngineStorage, Storage};
use crate::common::types::{
    Loan, LoanConfig, LoanStatus, PriceSnapshot, RepayOutcome, TxKind, TxRecord, TxStatus,
    LTV_CEILING, SCALAR_7,
};
use crate::operations::oracles::Oracles;
use crate::operations::staking::Staking;
use price_oracle::Asset;

/// Loan lifecycle: creation, repayment, collateral additions and the LTV
/// arithmetic behind them.
pub struct Loans;

impl Loans {
    // ==================== Valuation ====================

    /// Largest borrow the collateral supports at the creation cap.
    /// Returns 0 when the borrow asset is worthless.
    pub fn max_borrow(
        snapshot: &PriceSnapshot,
        config: &LoanConfig,
        collateral_asset: &Asset,
        collateral_amount: i128,
        borrow_asset: &Asset,
    ) -> Result<i128, Error> {
        let collateral_usd = snapshot.to_usd(collateral_asset, collateral_amount)?;
        let max_usd = collateral_usd
            .checked_mul(config.initial_ltv)
            .ok_or(Error::ArithmeticError)?
            / SCALAR_7;
        snapshot.from_usd(borrow_asset, max_usd)
    }

    /// Loan-to-value as a 7-decimal fraction of 1.0, capped at 100%.
    /// A zero-valued collateral reads as fully underwater.
    pub fn loan_ltv(
        snapshot: &PriceSnapshot,
        borrow_asset: &Asset,
        principal: i128,
        accrued_interest: i128,
        collateral_asset: &Asset,
        collateral_amount: i128,
    ) -> Result<i128, Error> {
        let debt = principal
            .checked_add(accrued_interest)
            .ok_or(Error::ArithmeticError)?;
        let debt_usd = snapshot.to_usd(borrow_asset, debt)?;
        let collateral_usd = snapshot.to_usd(collateral_asset, collateral_amount)?;
        if collateral_usd == 0 {
            return Ok(LTV_CEILING);
        }
        let ltv = debt_usd
            .checked_mul(SCALAR_7)
            .ok_or(Error::ArithmeticError)?
            / collateral_usd;
        Ok(ltv.min(LTV_CEILING))
    }

    // ==================== Lifecycle ====================

    pub fn create_loan(
        env: &Env,
        user: &Address,
        collateral_asset: &Asset,
        collateral_amount: i128,
        borrow_asset: &Asset,
        borrow_amount: i128,
    ) -> Result<Loan, Error> {
        user.require_auth();
        Self::require_loanable(collateral_asset)?;
        Self::require_loanable(borrow_asset)?;
        if collateral_amount <= 0 || borrow_amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);

        let ltv = Self::loan_ltv(
            &snapshot,
            borrow_asset,
            borrow_amount,
            0,
            collateral_asset,
            collateral_amount,
        )?;
        if ltv > storage.config.initial_ltv {
            return Err(Error::LtvExceeded);
        }

        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        profile.debit(collateral_asset, collateral_amount)?;
        profile.credit(borrow_asset, borrow_amount)?;

        let now = env.ledger().timestamp();
        let borrow_value_usd = snapshot.to_usd(borrow_asset, borrow_amount)?;
        let loan = Loan {
            id: storage.next_loan_id,
            borrower: user.clone(),
            status: LoanStatus::Active,
            collateral_asset: collateral_asset.clone(),
            collateral_amount,
            collateral_value_usd_at_open: snapshot.to_usd(collateral_asset, collateral_amount)?,
            borrow_asset: borrow_asset.clone(),
            principal: borrow_amount,
            borrow_value_usd_at_open: borrow_value_usd,
            interest_rate: storage.config.hourly_interest_rate,
            accrued_interest: 0,
            initial_ltv: ltv,
            current_ltv: ltv,
            staking_yield_earned: 0,
            created_at: now,
            updated_at: now,
            last_interest_update: now,
            closed_at: None,
        };
        storage.next_loan_id += 1;
        storage.open_loans.push_back(loan.id);

        // XEC collateral joins the staking pool
        if *collateral_asset == Asset::Xec {
            Staking::collateral_added(&mut storage.staking_pool, collateral_amount)?;
        }

        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: user.clone(),
                loan_id: Some(loan.id),
                kind: TxKind::Borrow,
                asset: borrow_asset.clone(),
                amount: borrow_amount,
                value_usd: Some(borrow_value_usd),
                chain_tx: None,
                status: TxStatus::Confirmed,
                timestamp: now,
            },
        );

        Storage::set_user(env, user, &profile);
        Storage::set_loan(env, &loan);
        Storage::push_user_loan(env, user, loan.id);
        Storage::set(env, &storage);

        Events::loan_created(
            env,
            loan.id,
            user,
            collateral_asset,
            collateral_amount,
            borrow_asset,
            borrow_amount,
            ltv,
        );
        Events::balance_update(env, user, collateral_asset, profile.balance(collateral_asset));
        Events::balance_update(env, user, borrow_asset, profile.balance(borrow_asset));
        Ok(loan)
    }

    pub fn repay_loan(
        env: &Env,
        loan_id: u64,
        user: &Address,
        amount: i128,
    ) -> Result<RepayOutcome, Error> {
        user.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);
        let mut loan = Storage::get_loan(env, loan_id).ok_or(Error::LoanNotFound)?;
        if loan.borrower != *user {
            return Err(Error::Unauthorized);
        }
        if loan.status.is_terminal() {
            return Err(Error::TerminalLoan);
        }

        let total_debt = loan.total_debt()?;
        let actual = amount.min(total_debt);

        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        profile.debit(&loan.borrow_asset, actual)?;

        let now = env.ledger().timestamp();
        let fully_repaid = actual >= total_debt;
        let collateral_asset = loan.collateral_asset.clone();

        if fully_repaid {
            // The whole collateral flows back to the borrower's balance
            let collateral = loan.collateral_amount;
            profile.credit(&collateral_asset, collateral)?;
            if collateral_asset == Asset::Xec {
                Staking::collateral_removed(&mut storage.staking_pool, collateral);
            }
            Self::close(&mut loan, LoanStatus::Repaid, now);
            Self::remove_open_loan(&mut storage, loan_id);
        } else {
            // Interest-first: surplus past accrued interest reduces principal
            if actual <= loan.accrued_interest {
                loan.accrued_interest -= actual;
            } else {
                loan.principal -= actual - loan.accrued_interest;
                loan.accrued_interest = 0;
            }
            loan.current_ltv = Self::loan_ltv(
                &snapshot,
                &loan.borrow_asset,
                loan.principal,
                loan.accrued_interest,
                &collateral_asset,
                loan.collateral_amount,
            )?;
            if loan.status == LoanStatus::MarginCall
                && loan.current_ltv < storage.config.margin_call_ltv
            {
                loan.status = LoanStatus::Active;
            }
            loan.updated_at = now;
        }

        let remaining_debt = loan.total_debt()?;
        let value_usd = snapshot.to_usd(&loan.borrow_asset, actual)?;
        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: user.clone(),
                loan_id: Some(loan_id),
                kind: TxKind::Repay,
                asset: loan.borrow_asset.clone(),
                amount: actual,
                value_usd: Some(value_usd),
                chain_tx: None,
                status: TxStatus::Confirmed,
                timestamp: now,
            },
        );

        Storage::set_user(env, user, &profile);
        Storage::set_loan(env, &loan);
        Storage::set(env, &storage);

        Events::repayment(env, loan_id, user, actual, remaining_debt, fully_repaid);
        Events::balance_update(env, user, &loan.borrow_asset, profile.balance(&loan.borrow_asset));
        if fully_repaid {
            Events::balance_update(env, user, &collateral_asset, profile.balance(&collateral_asset));
        }
        Ok(RepayOutcome {
            remaining_debt,
            fully_repaid,
        })
    }

    pub fn add_collateral(
        env: &Env,
        loan_id: u64,
        user: &Address,
        amount: i128,
    ) -> Result<Loan, Error> {
        user.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let snapshot = Oracles::snapshot(env);
        let mut storage = Storage::get(env);
        let mut loan = Storage::get_loan(env, loan_id).ok_or(Error::LoanNotFound)?;
        if loan.borrower != *user {
            return Err(Error::Unauthorized);
        }
        if loan.status.is_terminal() {
            return Err(Error::TerminalLoan);
        }

        let collateral_asset = loan.collateral_asset.clone();
        let mut profile = Storage::get_user(env, user).ok_or(Error::UserNotFound)?;
        profile.debit(&collateral_asset, amount)?;

        let now = env.ledger().timestamp();
        loan.collateral_amount = loan
            .collateral_amount
            .checked_add(amount)
            .ok_or(Error::ArithmeticError)?;
        loan.current_ltv = Self::loan_ltv(
            &snapshot,
            &loan.borrow_asset,
            loan.principal,
            loan.accrued_interest,
            &collateral_asset,
            loan.collateral_amount,
        )?;
        if loan.status == LoanStatus::MarginCall && loan.current_ltv < storage.config.margin_call_ltv
        {
            loan.status = LoanStatus::Active;
        }
        loan.updated_at = now;

        if collateral_asset == Asset::Xec {
            Staking::collateral_added(&mut storage.staking_pool, amount)?;
        }

        let value_usd = snapshot.to_usd(&collateral_asset, amount)?;
        Storage::append_tx(
            env,
            &mut storage,
            &TxRecord {
                id: 0,
                user: user.clone(),
                loan_id: Some(loan_id),
                kind: TxKind::AddCollateral,
                asset: collateral_asset.clone(),
                amount,
                value_usd: Some(value_usd),
                chain_tx: None,
                status: TxStatus::Confirmed,
                timestamp: now,
            },
        );

        Storage::set_user(env, user, &profile);
        Storage::set_loan(env, &loan);
        Storage::set(env, &storage);

        Events::collateral_added(env, loan_id, user, amount, loan.current_ltv);
        Events::ltv_update(env, loan_id, user, loan.current_ltv, &loan.status);
        Events::balance_update(env, user, &collateral_asset, profile.balance(&collateral_asset));
        Ok(loan)
    }

    // ==================== Views ====================

    pub fn get_loan(env: &Env, loan_id: u64) -> Result<Loan, Error> {
        Storage::get_loan(env, loan_id).ok_or(Error::LoanNotFound)
    }

    pub fn user_loans(env: &Env, user: &Address) -> Vec<Loan> {
        let mut out = Vec::new(env);
        for id in Storage::user_loan_ids(env, user).iter() {
            if let Some(loan) = Storage::get_loan(env, id) {
                out.push_back(loan);
            }
        }
        out
    }

    // ==================== Internal Helpers ====================

    /// XECX never sits on either side of a loan.
    fn require_loanable(asset: &Asset) -> Result<(), Error> {
        match asset {
            Asset::Xec | Asset::Firma => Ok(()),
            Asset::Xecx => Err(Error::UnsupportedAsset),
        }
    }

    /// Terminal loans hold no money and carry a close timestamp.
    pub fn close(loan: &mut Loan, status: LoanStatus, now: u64) {
        loan.status = status;
        loan.collateral_amount = 0;
        loan.principal = 0;
        loan.accrued_interest = 0;
        loan.updated_at = now;
        loan.closed_at = Some(now);
    }

    pub fn remove_open_loan(state: &mut EngineStorage, loan_id: u64) {
        if let Some(index) = state.open_loans.first_index_of(loan_id) {
            state.open_loans.remove(index);
        }
    }
}
