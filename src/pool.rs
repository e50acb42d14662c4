//! Liquidity pool: deposits, option sales and settlement, withdrawals, policy.
//!
//! Composes the tranche ledger and the option book over one `PoolState`.
//! Every operation validates before it mutates and mutates before it pays out.

use std::collections::BTreeSet;

use alloy_primitives::U256;
use bytemuck::Zeroable;
use solana_program::{msg, pubkey::Pubkey};

use crate::access::{Permissions, Role};
use crate::arena::ArenaMark;
use crate::error::PoolError;
use crate::event::Event;
use crate::external::{PriceCalculator, PriceOracle};
use crate::math;
use crate::option_book::{self, OptionBook, Sale};
use crate::state::{
    LockedLiquidity, OptionKind, OptionState, PoolState, Tranche, DAY, MAX_LOCKUP_PERIOD,
};
use crate::token::TokenLedger;
use crate::tranche::TrancheLedger;

/// Initial policy of a pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub kind: OptionKind,
    /// Token account holding the pool's collateral
    pub address: Pubkey,
    pub hedge_pool: Pubkey,
    pub settlement_fee_recipient: Pubkey,
    pub price_feed: Pubkey,
    pub price_calculator: Pubkey,
    pub lockup_hedged: u64,
    pub lockup_unhedged: u64,
    pub collateralization_ratio: u64,
    pub max_utilization_rate: u64,
    pub hedge_fee_rate: u64,
    pub max_deposit_amount: u128,
    pub max_hedged_deposit_amount: u128,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            kind: OptionKind::Call,
            address: Pubkey::default(),
            hedge_pool: Pubkey::default(),
            settlement_fee_recipient: Pubkey::default(),
            price_feed: Pubkey::default(),
            price_calculator: Pubkey::default(),
            lockup_hedged: 60 * DAY,
            lockup_unhedged: 30 * DAY,
            collateralization_ratio: 50,
            max_utilization_rate: 80,
            hedge_fee_rate: 80,
            max_deposit_amount: u128::MAX,
            max_hedged_deposit_amount: u128::MAX,
        }
    }
}

/// Option sale as requested by a buyer. `strike == 0` means "at the oracle price".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionRequest {
    pub holder: Pubkey,
    pub period: u64,
    pub amount: u128,
    pub strike: u128,
}

// ── Policy bounds ──

fn check_lockups(hedged: u64, unhedged: u64) -> Result<(), PoolError> {
    if hedged > MAX_LOCKUP_PERIOD {
        return Err(PoolError::HedgedLockupTooLong);
    }
    if unhedged > MAX_LOCKUP_PERIOD {
        return Err(PoolError::UnhedgedLockupTooLong);
    }
    Ok(())
}

fn check_utilization_rate(value: u64) -> Result<(), PoolError> {
    if (50..=100).contains(&value) {
        Ok(())
    } else {
        Err(PoolError::WrongUtilizationRate)
    }
}

fn check_collateralization_ratio(value: u64) -> Result<(), PoolError> {
    if (30..=100).contains(&value) {
        Ok(())
    } else {
        Err(PoolError::WrongCollateralizationRatio)
    }
}

fn check_hedge_fee_rate(value: u64) -> Result<(), PoolError> {
    if value <= 100 {
        Ok(())
    } else {
        Err(PoolError::WrongHedgeFeeRate)
    }
}

fn check_address(key: &Pubkey) -> Result<(), PoolError> {
    if *key == Pubkey::default() {
        Err(PoolError::ZeroAddress)
    } else {
        Ok(())
    }
}

/// What a failed call needs to put the pool back.
///
/// The record arenas are rolled back from their journals; only the aggregate
/// and the small approval and permission tables are copied.
#[derive(Debug, Clone)]
pub struct PoolCheckpoint {
    state: PoolState,
    tranches: ArenaMark,
    options: ArenaMark,
    operators: BTreeSet<(Pubkey, Pubkey)>,
    permissions: Permissions,
    events: usize,
}

#[derive(Debug, Clone)]
pub struct LiquidityPool {
    state: PoolState,
    tranches: TrancheLedger,
    options: OptionBook,
    /// (owner, operator) pairs
    operators: BTreeSet<(Pubkey, Pubkey)>,
    permissions: Permissions,
    events: Vec<Event>,
}

impl LiquidityPool {
    /// Create a pool administered by `admin`.
    pub fn new(admin: &Pubkey, config: PoolConfig) -> Result<Self, PoolError> {
        check_lockups(config.lockup_hedged, config.lockup_unhedged)?;
        check_utilization_rate(config.max_utilization_rate)?;
        check_collateralization_ratio(config.collateralization_ratio)?;
        check_hedge_fee_rate(config.hedge_fee_rate)?;
        check_address(&config.address)?;
        check_address(&config.hedge_pool)?;
        check_address(&config.settlement_fee_recipient)?;

        let mut state = PoolState::zeroed();
        state.address = config.address.to_bytes();
        state.hedge_pool = config.hedge_pool.to_bytes();
        state.settlement_fee_recipient = config.settlement_fee_recipient.to_bytes();
        state.price_feed = config.price_feed.to_bytes();
        state.price_calculator = config.price_calculator.to_bytes();
        state.lockup_hedged = config.lockup_hedged;
        state.lockup_unhedged = config.lockup_unhedged;
        state.collateralization_ratio = config.collateralization_ratio;
        state.max_utilization_rate = config.max_utilization_rate;
        state.hedge_fee_rate = config.hedge_fee_rate;
        state.max_deposit_amount = config.max_deposit_amount;
        state.max_hedged_deposit_amount = config.max_hedged_deposit_amount;
        state.kind = config.kind.tag();
        if let OptionKind::Put { token_decimals, spot_decimals } = config.kind {
            state.token_decimals = token_decimals;
            state.spot_decimals = spot_decimals;
        }
        state.is_initialized = 1;

        Ok(Self {
            state,
            tranches: TrancheLedger::default(),
            options: OptionBook::default(),
            operators: BTreeSet::new(),
            permissions: Permissions::with(admin, &[Role::Admin]),
            events: Vec::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Views
    // ═══════════════════════════════════════════════════════════════

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn address(&self) -> Pubkey {
        self.state.address_pubkey()
    }

    pub fn tranches(&self) -> &TrancheLedger {
        &self.tranches
    }

    pub fn options(&self) -> &OptionBook {
        &self.options
    }

    pub fn tranche(&self, id: u64) -> Result<&Tranche, PoolError> {
        self.tranches.get(id)
    }

    pub fn option(&self, id: u64) -> Result<&LockedLiquidity, PoolError> {
        self.options.get(id)
    }

    pub fn total_balance(&self) -> Result<u128, PoolError> {
        self.state.total_balance()
    }

    pub fn available_balance(&self) -> Result<u128, PoolError> {
        self.state.available_balance()
    }

    /// Collateral a tranche would redeem right now, ignoring lockup.
    pub fn tranche_value(&self, id: u64) -> Result<u128, PoolError> {
        let t = self.tranches.get(id)?;
        let (class_share, class_balance) = self.state.class(t.is_hedged());
        if class_share.is_zero() {
            return Ok(0);
        }
        math::calc_redemption(t.share(), class_balance, class_share).ok_or(PoolError::Overflow)
    }

    /// Current exercise value of an option, capped by its locked collateral.
    pub fn profit_of(&self, oracle: &dyn PriceOracle, id: u64) -> Result<u128, PoolError> {
        let o = self.options.get(id)?;
        let profit = self
            .state
            .option_kind()
            .profit(o.amount, o.strike, oracle.latest_price())
            .ok_or(PoolError::Overflow)?;
        Ok(profit.min(o.locked_amount))
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn is_approved_for_all(&self, owner: &Pubkey, operator: &Pubkey) -> bool {
        self.operators.contains(&(*owner, *operator))
    }

    fn is_owner_or_operator(&self, owner: &Pubkey, caller: &Pubkey) -> bool {
        owner == caller || self.is_approved_for_all(owner, caller)
    }

    /// Whether `caller` may act on the option's behalf.
    pub fn can_act_for_option(&self, id: u64, caller: &Pubkey) -> Result<bool, PoolError> {
        let holder = self.options.get(id)?.holder_pubkey();
        Ok(self.is_owner_or_operator(&holder, caller))
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Call boundary ──

    pub fn checkpoint(&self) -> PoolCheckpoint {
        PoolCheckpoint {
            state: self.state,
            tranches: self.tranches.mark(),
            options: self.options.mark(),
            operators: self.operators.clone(),
            permissions: self.permissions.clone(),
            events: self.events.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: PoolCheckpoint) {
        self.state = checkpoint.state;
        self.tranches.rollback(checkpoint.tranches);
        self.options.rollback(checkpoint.options);
        self.operators = checkpoint.operators;
        self.permissions = checkpoint.permissions;
        self.events.truncate(checkpoint.events);
    }

    /// Drop the undo journals of a committed call.
    pub fn commit(&mut self) {
        self.tranches.commit();
        self.options.commit();
    }

    /// Raw bytes of the aggregate and every record, in id order.
    pub fn record_bytes(&self) -> Vec<u8> {
        let mut out = bytemuck::bytes_of(&self.state).to_vec();
        out.extend_from_slice(bytemuck::cast_slice(self.tranches.records()));
        out.extend_from_slice(bytemuck::cast_slice(self.options.records()));
        out
    }

    // ═══════════════════════════════════════════════════════════════
    // Approvals and transfers
    // ═══════════════════════════════════════════════════════════════

    pub fn set_approval_for_all(&mut self, owner: &Pubkey, operator: &Pubkey, approved: bool) {
        if approved {
            self.operators.insert((*owner, *operator));
        } else {
            self.operators.remove(&(*owner, *operator));
        }
        msg!("Pool: operator {} for {} set to {}", operator, owner, approved);
    }

    pub fn transfer_tranche(&mut self, caller: &Pubkey, id: u64, to: &Pubkey) -> Result<(), PoolError> {
        check_address(to)?;
        let owner = self.tranches.get(id)?.owner_pubkey();
        if !self.is_owner_or_operator(&owner, caller) {
            return Err(PoolError::NotTrancheOwner);
        }
        self.tranches.set_owner(id, to)?;
        msg!("Pool: tranche {} moved {} -> {}", id, owner, to);
        Ok(())
    }

    pub fn transfer_option(&mut self, caller: &Pubkey, id: u64, to: &Pubkey) -> Result<(), PoolError> {
        check_address(to)?;
        if !self.can_act_for_option(id, caller)? {
            return Err(PoolError::NotEligible);
        }
        self.options.set_holder(id, to)?;
        msg!("Pool: option {} moved to {}", id, to);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Liquidity
    // ═══════════════════════════════════════════════════════════════

    /// Deposit `amount` from `depositor`, minting a tranche owned by `account`.
    pub fn provide(
        &mut self,
        token: &mut dyn TokenLedger,
        now: i64,
        depositor: &Pubkey,
        account: &Pubkey,
        amount: u128,
        hedged: bool,
        min_share: U256,
    ) -> Result<u64, PoolError> {
        let address = self.address();
        let share = TrancheLedger::quote_deposit(&self.state, amount, hedged, min_share)?;
        token.transfer_from(&address, depositor, &address, amount)?;
        let id = self
            .tranches
            .mint(&mut self.state, account, amount, hedged, share, now)?;

        msg!(
            "Provide: tranche={} account={} amount={} hedged={} share={}",
            id,
            account,
            amount,
            hedged,
            share
        );
        self.events.push(Event::Provided {
            tranche_id: id,
            account: *account,
            amount,
            share,
            hedged,
        });
        Ok(id)
    }

    fn quote_withdrawal(&self, now: i64, caller: &Pubkey, id: u64) -> Result<(Tranche, u128), PoolError> {
        let tranche = *self.tranches.get(id)?;
        if !self.is_owner_or_operator(&tranche.owner_pubkey(), caller) {
            msg!("Withdraw: {} cannot act for tranche {}", caller, id);
            return Err(PoolError::NotTrancheOwner);
        }
        let payout = self.tranches.quote_redeem(&self.state, id, now)?;
        Ok((tranche, payout))
    }

    /// Redeem a tranche. A hedged tranche worth less than it deposited is
    /// topped up from the hedge pool, which must have approved the pool.
    pub fn withdraw(
        &mut self,
        token: &mut dyn TokenLedger,
        now: i64,
        caller: &Pubkey,
        id: u64,
    ) -> Result<u128, PoolError> {
        let (tranche, payout) = self.quote_withdrawal(now, caller, id)?;
        let owner = tranche.owner_pubkey();
        let address = self.address();

        let mut amount = payout;
        if tranche.is_hedged() && payout < tranche.amount {
            let shortfall = tranche.amount - payout;
            token.transfer_from(&address, &self.state.hedge_pool_pubkey(), &owner, shortfall)?;
            amount = tranche.amount;
            msg!("Withdraw: hedge pool covered {} for tranche {}", shortfall, id);
        }
        self.tranches.close(&mut self.state, id, payout)?;
        token.transfer(&address, &owner, payout)?;

        msg!("Withdraw: tranche={} owner={} amount={}", id, owner, amount);
        self.events.push(Event::Withdrawn {
            account: owner,
            tranche_id: id,
            amount,
        });
        Ok(amount)
    }

    /// Redeem a tranche at its pool value only, never drawing on the hedge pool.
    pub fn withdraw_without_hedge(
        &mut self,
        token: &mut dyn TokenLedger,
        now: i64,
        caller: &Pubkey,
        id: u64,
    ) -> Result<u128, PoolError> {
        let (tranche, payout) = self.quote_withdrawal(now, caller, id)?;
        let owner = tranche.owner_pubkey();
        self.tranches.close(&mut self.state, id, payout)?;
        token.transfer(&self.address(), &owner, payout)?;

        msg!("WithdrawWithoutHedge: tranche={} owner={} amount={}", id, owner, payout);
        self.events.push(Event::Withdrawn {
            account: owner,
            tranche_id: id,
            amount: payout,
        });
        Ok(payout)
    }

    // ═══════════════════════════════════════════════════════════════
    // Options
    // ═══════════════════════════════════════════════════════════════

    /// Sell an option to `buyer`, who pays premium plus settlement fee.
    pub fn sell_option(
        &mut self,
        token: &mut dyn TokenLedger,
        oracle: &dyn PriceOracle,
        pricer: &dyn PriceCalculator,
        now: i64,
        buyer: &Pubkey,
        request: &OptionRequest,
    ) -> Result<u64, PoolError> {
        option_book::check_period(request.period)?;
        let strike = if request.strike == 0 {
            oracle.latest_price()
        } else {
            request.strike
        };
        let locked_amount = self
            .state
            .option_kind()
            .locked_amount(request.amount, strike, self.state.collateralization_ratio)
            .ok_or(PoolError::Overflow)?;
        let (settlement_fee, premium) =
            pricer.calculate_total_premium(request.period, request.amount, strike)?;

        let sale = Sale {
            holder: request.holder,
            period: request.period,
            amount: request.amount,
            strike,
            premium,
        };
        let split = OptionBook::quote_lock(&self.state, premium, locked_amount)?;

        let address = self.address();
        let total = premium.checked_add(settlement_fee).ok_or(PoolError::Overflow)?;
        token.transfer_from(&address, buyer, &address, total)?;
        let id = self
            .options
            .lock(&mut self.state, &sale, locked_amount, &split, now)?;

        if settlement_fee > 0 {
            token.transfer(&address, &self.state.settlement_fee_recipient_pubkey(), settlement_fee)?;
        }
        if split.hedge_fee > 0 {
            token.transfer(&address, &self.state.hedge_pool_pubkey(), split.hedge_fee)?;
        }

        msg!(
            "SellOption: id={} holder={} amount={} strike={} locked={} premium={} fee={} hedge_fee={}",
            id,
            request.holder,
            request.amount,
            strike,
            locked_amount,
            premium,
            settlement_fee,
            split.hedge_fee
        );
        self.events.push(Event::Acquired {
            option_id: id,
            settlement_fee,
            premium,
        });
        Ok(id)
    }

    /// Exercise an Active option before expiration; pays `min(profit, locked)` to the holder.
    pub fn exercise(
        &mut self,
        token: &mut dyn TokenLedger,
        oracle: &dyn PriceOracle,
        now: i64,
        caller: &Pubkey,
        id: u64,
    ) -> Result<u128, PoolError> {
        let record = *self.options.get(id)?;
        let holder = record.holder_pubkey();
        if !self.is_owner_or_operator(&holder, caller) {
            return Err(PoolError::NotEligible);
        }
        if now >= record.expiration {
            return Err(PoolError::OptionExpired);
        }
        if record.state() != OptionState::Active {
            return Err(PoolError::OptionNotActive);
        }

        let profit = self.profit_of(oracle, id)?;

        // Loss is split over balances that already include this option's premium.
        let hedged = self
            .state
            .hedged_balance
            .checked_add(record.hedge_premium)
            .ok_or(PoolError::Overflow)?;
        let unhedged = self
            .state
            .unhedged_balance
            .checked_add(record.unhedge_premium)
            .ok_or(PoolError::Overflow)?;
        let total_balance = hedged.checked_add(unhedged).ok_or(PoolError::Overflow)?;
        let (hedged_loss, unhedged_loss) =
            math::split_loss(profit, hedged, total_balance).ok_or(PoolError::Overflow)?;
        let hedged = hedged.checked_sub(hedged_loss).ok_or(PoolError::Overflow)?;
        let unhedged = unhedged.checked_sub(unhedged_loss).ok_or(PoolError::Overflow)?;

        self.options.release(&mut self.state, id, OptionState::Exercised)?;
        self.state.hedged_balance = hedged;
        self.state.unhedged_balance = unhedged;

        if profit > 0 {
            token.transfer(&self.address(), &holder, profit)?;
        }

        msg!("Exercise: id={} holder={} profit={}", id, holder, profit);
        self.events.push(Event::Exercised { option_id: id, profit });
        Ok(profit)
    }

    /// Release the collateral of an expired option. Anyone may call.
    pub fn unlock(&mut self, now: i64, id: u64) -> Result<(), PoolError> {
        let record = self.options.get(id)?;
        if now <= record.expiration {
            return Err(PoolError::OptionNotExpired);
        }
        let record = self.options.release(&mut self.state, id, OptionState::Expired)?;

        msg!("Unlock: id={} released={}", id, record.locked_amount);
        self.events.push(Event::Expired { option_id: id });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Policy (Admin role)
    // ═══════════════════════════════════════════════════════════════

    pub fn grant_admin(&mut self, caller: &Pubkey, who: &Pubkey) -> Result<(), PoolError> {
        self.permissions.grant(caller, who, Role::Admin)
    }

    pub fn revoke_admin(&mut self, caller: &Pubkey, who: &Pubkey) -> Result<(), PoolError> {
        self.permissions.revoke(caller, who, Role::Admin)
    }

    pub fn set_lockup_period(&mut self, caller: &Pubkey, hedged: u64, unhedged: u64) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_lockups(hedged, unhedged)?;
        self.state.lockup_hedged = hedged;
        self.state.lockup_unhedged = unhedged;
        msg!("Pool: lockup hedged={} unhedged={}", hedged, unhedged);
        Ok(())
    }

    pub fn set_max_deposit_amount(&mut self, caller: &Pubkey, total: u128, hedged: u128) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        self.state.max_deposit_amount = total;
        self.state.max_hedged_deposit_amount = hedged;
        msg!("Pool: max deposit total={} hedged={}", total, hedged);
        Ok(())
    }

    pub fn set_max_utilization_rate(&mut self, caller: &Pubkey, value: u64) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_utilization_rate(value)?;
        self.state.max_utilization_rate = value;
        msg!("Pool: max utilization rate={}", value);
        Ok(())
    }

    pub fn set_collateralization_ratio(&mut self, caller: &Pubkey, value: u64) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_collateralization_ratio(value)?;
        self.state.collateralization_ratio = value;
        msg!("Pool: collateralization ratio={}", value);
        Ok(())
    }

    pub fn set_hedge_fee_rate(&mut self, caller: &Pubkey, value: u64) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_hedge_fee_rate(value)?;
        self.state.hedge_fee_rate = value;
        msg!("Pool: hedge fee rate={}", value);
        Ok(())
    }

    pub fn set_hedge_pool(&mut self, caller: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_address(value)?;
        self.state.hedge_pool = value.to_bytes();
        msg!("Pool: hedge pool={}", value);
        Ok(())
    }

    pub fn set_settlement_fee_recipient(&mut self, caller: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_address(value)?;
        self.state.settlement_fee_recipient = value.to_bytes();
        msg!("Pool: settlement fee recipient={}", value);
        Ok(())
    }

    pub fn set_price_calculator(&mut self, caller: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Admin)?;
        check_address(value)?;
        self.state.price_calculator = value.to_bytes();
        msg!("Pool: price calculator={}", value);
        Ok(())
    }
}
