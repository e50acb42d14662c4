//! Option book: locked-liquidity records and the pool-wide lock counter.

use bytemuck::Zeroable;
use solana_program::{msg, pubkey::Pubkey};

use crate::arena::{Arena, ArenaMark};
use crate::error::PoolError;
use crate::math::{self, PremiumSplit};
use crate::state::{LockedLiquidity, OptionState, PoolState, MAX_OPTION_PERIOD, MIN_OPTION_PERIOD};

/// Terms of a sale once strike and quote are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sale {
    pub holder: Pubkey,
    pub period: u64,
    pub amount: u128,
    pub strike: u128,
    pub premium: u128,
}

pub fn check_period(period: u64) -> Result<(), PoolError> {
    if period < MIN_OPTION_PERIOD {
        return Err(PoolError::PeriodTooShort);
    }
    if period > MAX_OPTION_PERIOD {
        return Err(PoolError::PeriodTooLong);
    }
    Ok(())
}

/// Arena of sold options keyed by sequential id.
#[derive(Debug, Clone, Default)]
pub struct OptionBook {
    options: Arena<LockedLiquidity>,
}

impl OptionBook {
    pub fn get(&self, id: u64) -> Result<&LockedLiquidity, PoolError> {
        self.options.get(id)
    }

    pub fn next_id(&self) -> u64 {
        self.options.next_id()
    }

    pub fn records(&self) -> &[LockedLiquidity] {
        self.options.records()
    }

    pub fn mark(&self) -> ArenaMark {
        self.options.mark()
    }

    pub fn rollback(&mut self, mark: ArenaMark) {
        self.options.rollback(mark)
    }

    pub fn commit(&mut self) {
        self.options.commit()
    }

    /// Sum of locked_amount over Active options.
    pub fn active_locked(&self) -> u128 {
        self.records()
            .iter()
            .filter(|o| o.state() == OptionState::Active)
            .fold(0u128, |acc, o| acc.saturating_add(o.locked_amount))
    }

    /// Check a lock against the utilization cap and split its premium.
    ///
    /// Fails with `AmountTooLarge` when the lock would push utilization past
    /// `max_utilization_rate`.
    pub fn quote_lock(
        state: &PoolState,
        premium: u128,
        locked_amount: u128,
    ) -> Result<PremiumSplit, PoolError> {
        let total_balance = state.total_balance()?;
        let fits = math::within_utilization(
            state.locked_amount,
            locked_amount,
            total_balance,
            state.max_utilization_rate,
        )
        .ok_or(PoolError::Overflow)?;
        if !fits {
            msg!(
                "OptionBook: lock {} over utilization ({} of {} locked)",
                locked_amount,
                state.locked_amount,
                total_balance
            );
            return Err(PoolError::AmountTooLarge);
        }
        math::split_premium(premium, state.hedged_balance, total_balance, state.hedge_fee_rate)
            .ok_or(PoolError::Overflow)
    }

    /// Record a quoted sale as Active and grow the pool lock.
    ///
    /// Premiums are held on the record and credited to the classes when the
    /// option leaves Active.
    pub fn lock(
        &mut self,
        state: &mut PoolState,
        sale: &Sale,
        locked_amount: u128,
        split: &PremiumSplit,
        now: i64,
    ) -> Result<u64, PoolError> {
        let new_locked = state
            .locked_amount
            .checked_add(locked_amount)
            .ok_or(PoolError::Overflow)?;
        let expiration = now
            .checked_add(sale.period as i64)
            .ok_or(PoolError::Overflow)?;
        let mut record = LockedLiquidity::zeroed();
        record.amount = sale.amount;
        record.locked_amount = locked_amount;
        record.premium = sale.premium;
        record.hedge_premium = split.hedge_premium;
        record.unhedge_premium = split.unhedge_premium;
        record.strike = sale.strike;
        record.holder = sale.holder.to_bytes();
        record.created_at = now;
        record.expiration = expiration;
        record.state = OptionState::Active as u8;

        state.locked_amount = new_locked;
        Ok(self.options.push(record))
    }

    /// Move an Active option to a terminal state.
    ///
    /// Decrements the pool lock by exactly the option's locked_amount and
    /// credits its retained premiums to the two classes.
    pub fn release(
        &mut self,
        state: &mut PoolState,
        id: u64,
        to: OptionState,
    ) -> Result<LockedLiquidity, PoolError> {
        let record = *self.get(id)?;
        if record.state() != OptionState::Active {
            return Err(PoolError::OptionNotActive);
        }
        let locked_amount = state
            .locked_amount
            .checked_sub(record.locked_amount)
            .ok_or(PoolError::Overflow)?;
        let hedged_balance = state
            .hedged_balance
            .checked_add(record.hedge_premium)
            .ok_or(PoolError::Overflow)?;
        let unhedged_balance = state
            .unhedged_balance
            .checked_add(record.unhedge_premium)
            .ok_or(PoolError::Overflow)?;
        self.options.get_mut(id)?.state = to as u8;
        state.locked_amount = locked_amount;
        state.hedged_balance = hedged_balance;
        state.unhedged_balance = unhedged_balance;
        Ok(record)
    }

    pub fn set_holder(&mut self, id: u64, to: &Pubkey) -> Result<(), PoolError> {
        let record = self.options.get_mut(id)?;
        if record.state() != OptionState::Active {
            return Err(PoolError::OptionNotActive);
        }
        record.holder = to.to_bytes();
        Ok(())
    }
}
