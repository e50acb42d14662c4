//! Tranche ledger: deposit records and the per-class share accounting.
//!
//! Each operation is split into a read-only quote, which performs every
//! check, and a commit, which only mutates. Callers move tokens in between.

use alloy_primitives::U256;
use bytemuck::Zeroable;
use solana_program::{msg, pubkey::Pubkey};

use crate::arena::{Arena, ArenaMark};
use crate::error::PoolError;
use crate::math;
use crate::state::{PoolState, Tranche, TrancheState};

/// Arena of tranches keyed by sequential id.
#[derive(Debug, Clone, Default)]
pub struct TrancheLedger {
    tranches: Arena<Tranche>,
}

impl TrancheLedger {
    pub fn get(&self, id: u64) -> Result<&Tranche, PoolError> {
        self.tranches.get(id)
    }

    pub fn next_id(&self) -> u64 {
        self.tranches.next_id()
    }

    pub fn records(&self) -> &[Tranche] {
        self.tranches.records()
    }

    pub fn mark(&self) -> ArenaMark {
        self.tranches.mark()
    }

    pub fn rollback(&mut self, mark: ArenaMark) {
        self.tranches.rollback(mark)
    }

    pub fn commit(&mut self) {
        self.tranches.commit()
    }

    /// Sum of share over Open tranches of one class.
    pub fn open_share(&self, hedged: bool) -> U256 {
        self.tranches
            .records()
            .iter()
            .filter(|t| t.state() == TrancheState::Open && t.is_hedged() == hedged)
            .fold(U256::ZERO, |acc, t| acc.saturating_add(t.share()))
    }

    /// Price a deposit.
    ///
    /// Checks, in order: slippage guard, zero share, class cap.
    pub fn quote_deposit(
        state: &PoolState,
        amount: u128,
        hedged: bool,
        min_share: U256,
    ) -> Result<U256, PoolError> {
        let (class_share, class_balance) = state.class(hedged);
        let share = math::calc_share_for_deposit(class_share, class_balance, amount)
            .ok_or(PoolError::Overflow)?;

        if share < min_share {
            msg!("Tranche: share {} below expected {}", share, min_share);
            return Err(PoolError::MintLimitTooLarge);
        }
        if share.is_zero() {
            return Err(PoolError::AmountTooSmall);
        }
        let limit = math::deposit_limit(
            hedged,
            state.max_deposit_amount,
            state.max_hedged_deposit_amount,
            state.hedged_balance,
            state.unhedged_balance,
        );
        if amount > limit {
            msg!("Tranche: deposit {} over limit {}", amount, limit);
            return Err(PoolError::DepositNotAvailable);
        }
        Ok(share)
    }

    /// Record a quoted deposit and grow the class aggregates.
    pub fn mint(
        &mut self,
        state: &mut PoolState,
        owner: &Pubkey,
        amount: u128,
        hedged: bool,
        share: U256,
        now: i64,
    ) -> Result<u64, PoolError> {
        let (class_share, class_balance) = state.class(hedged);
        let new_share = class_share.checked_add(share).ok_or(PoolError::Overflow)?;
        let new_balance = class_balance.checked_add(amount).ok_or(PoolError::Overflow)?;
        let mut tranche = Tranche::zeroed();
        tranche.amount = amount;
        tranche.set_share(share);
        tranche.owner = owner.to_bytes();
        tranche.creation_time = now;
        tranche.state = TrancheState::Open as u8;
        tranche.hedged = hedged as u8;

        state.set_class(hedged, new_share, new_balance);
        Ok(self.tranches.push(tranche))
    }

    /// Value an Open tranche whose lockup has elapsed.
    ///
    /// Payout is `share * class_balance / class_share`, floored, and may not
    /// dip into collateral locked by Active options.
    pub fn quote_redeem(&self, state: &PoolState, id: u64, now: i64) -> Result<u128, PoolError> {
        let tranche = self.get(id)?;
        if tranche.state() != TrancheState::Open {
            return Err(PoolError::TrancheClosed);
        }
        let hedged = tranche.is_hedged();
        let unlocks_at = tranche
            .creation_time
            .checked_add(state.lockup_for(hedged) as i64)
            .ok_or(PoolError::Overflow)?;
        if now < unlocks_at {
            msg!("Tranche {}: locked until {}", id, unlocks_at);
            return Err(PoolError::WithdrawalLocked);
        }

        let (class_share, class_balance) = state.class(hedged);
        let payout = math::calc_redemption(tranche.share(), class_balance, class_share)
            .ok_or(PoolError::Overflow)?;
        if payout > state.available_balance()? {
            msg!("Tranche {}: payout {} exceeds unlocked collateral", id, payout);
            return Err(PoolError::NotEnoughFunds);
        }
        Ok(payout)
    }

    /// Close a quoted tranche: shrink the class aggregates and zero the record.
    pub fn close(&mut self, state: &mut PoolState, id: u64, payout: u128) -> Result<(), PoolError> {
        let tranche = *self.get(id)?;
        let hedged = tranche.is_hedged();
        let (class_share, class_balance) = state.class(hedged);
        let new_share = class_share
            .checked_sub(tranche.share())
            .ok_or(PoolError::Overflow)?;
        let new_balance = class_balance.checked_sub(payout).ok_or(PoolError::Overflow)?;
        state.set_class(hedged, new_share, new_balance);

        let record = self.tranches.get_mut(id)?;
        record.set_share(U256::ZERO);
        record.amount = 0;
        record.state = TrancheState::Closed as u8;
        Ok(())
    }

    /// Reassign an Open tranche.
    pub fn set_owner(&mut self, id: u64, to: &Pubkey) -> Result<(), PoolError> {
        let record = self.tranches.get_mut(id)?;
        if record.state() != TrancheState::Open {
            return Err(PoolError::TrancheClosed);
        }
        record.owner = to.to_bytes();
        Ok(())
    }
}
