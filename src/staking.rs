//! Staking ledger: whole lots and micro-lots of the governance token share
//! the settlement-fee profit that lands on the staking address.
//!
//! Profit is pulled, not pushed. Each distribution advances a scaled
//! per-unit accumulator for each class; a holder's claim is the accumulator
//! delta since its last settlement times its units, plus what was already
//! settled.
//!
//! Distribution only happens on an explicit call. Buys, sells, transfers and
//! claims settle against the accumulators as they stand, so profit that
//! arrived since the last distribution goes to whoever holds units when it
//! is finally distributed.

use std::collections::BTreeMap;

use bytemuck::Zeroable;
use solana_program::{msg, pubkey::Pubkey};

use crate::access::{Permissions, Role};
use crate::error::PoolError;
use crate::event::Event;
use crate::math;
use crate::state::{write_u256, StakingAccount, StakingState, DAY, MAX_LOCKUP_PERIOD};
use crate::token::TokenLedger;

/// Governance-token decimals the default lot price assumes.
pub const GOVERNANCE_DECIMALS: u32 = 18;

/// 888 000 governance tokens per lot.
pub const STAKING_LOT_PRICE: u128 = 888_000 * 10u128.pow(GOVERNANCE_DECIMALS);

pub const MAX_SUPPLY: u64 = 1_500;

#[derive(Debug, Clone, Copy)]
pub struct StakingConfig {
    /// Token account holding staked governance tokens and undistributed profit
    pub address: Pubkey,
    pub lot_price: u128,
    pub max_supply: u64,
    pub classic_lockup: u64,
    pub micro_lockup: u64,
}

impl StakingConfig {
    pub fn new(address: Pubkey) -> Self {
        Self {
            address,
            lot_price: STAKING_LOT_PRICE,
            max_supply: MAX_SUPPLY,
            classic_lockup: DAY,
            micro_lockup: DAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StakingLedger {
    state: StakingState,
    accounts: BTreeMap<Pubkey, StakingAccount>,
    permissions: Permissions,
    events: Vec<Event>,
}

impl StakingLedger {
    pub fn new(owner: &Pubkey, config: StakingConfig) -> Result<Self, PoolError> {
        if config.classic_lockup > MAX_LOCKUP_PERIOD || config.micro_lockup > MAX_LOCKUP_PERIOD {
            return Err(PoolError::StakingLockupTooLong);
        }
        let mut state = StakingState::zeroed();
        state.address = config.address.to_bytes();
        state.lot_price = config.lot_price;
        state.max_supply = config.max_supply;
        state.classic_lockup = config.classic_lockup;
        state.micro_lockup = config.micro_lockup;
        Ok(Self {
            state,
            accounts: BTreeMap::new(),
            permissions: Permissions::with(owner, &[Role::Owner]),
            events: Vec::new(),
        })
    }

    // ── Views ──

    pub fn state(&self) -> &StakingState {
        &self.state
    }

    pub fn address(&self) -> Pubkey {
        self.state.address_pubkey()
    }

    pub fn account(&self, holder: &Pubkey) -> StakingAccount {
        self.accounts.get(holder).copied().unwrap_or_else(StakingAccount::zeroed)
    }

    pub fn lots_of(&self, holder: &Pubkey) -> u64 {
        self.account(holder).lots
    }

    pub fn micro_lots_of(&self, holder: &Pubkey) -> u128 {
        self.account(holder).micro_amount
    }

    /// Settled plus not-yet-settled profit of `holder`, as of the last distribution.
    pub fn profit_of(&self, holder: &Pubkey) -> Result<u128, PoolError> {
        let acc = self.account(holder);
        let lots = math::accrued_profit(
            acc.lots as u128,
            self.state.total_profit(),
            acc.profit_snapshot(),
        )
        .ok_or(PoolError::Overflow)?;
        let micro = math::accrued_profit(
            acc.micro_amount,
            self.state.micro_profit_per_unit(),
            acc.micro_snapshot(),
        )
        .ok_or(PoolError::Overflow)?;
        acc.unclaimed
            .checked_add(lots)
            .and_then(|v| v.checked_add(micro))
            .ok_or(PoolError::Overflow)
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Raw bytes of the aggregate and every non-empty account, in key order.
    pub fn record_bytes(&self) -> Vec<u8> {
        let mut out = bytemuck::bytes_of(&self.state).to_vec();
        for (key, acc) in &self.accounts {
            out.extend_from_slice(key.as_ref());
            out.extend_from_slice(bytemuck::bytes_of(acc));
        }
        out
    }

    // ═══════════════════════════════════════════════════════════════
    // Distribution
    // ═══════════════════════════════════════════════════════════════

    /// Attribute profit that arrived since the last distribution.
    ///
    /// No-op (no event, no accumulator change) when nothing arrived or when
    /// neither lots nor micro-lots exist. The part of a step that does not
    /// divide evenly over the supply is carried, scaled, into the next step,
    /// so the accumulators never lose a fraction of what was accounted.
    ///
    /// # Returns
    /// The amount distributed.
    pub fn distribute_unrealized_rewards(&mut self, profit_token: &dyn TokenLedger) -> Result<u128, PoolError> {
        let balance = profit_token.balance_of(&self.address());
        let undistributed = balance.saturating_sub(self.state.accounted_balance);
        if undistributed == 0 {
            return Ok(0);
        }
        let Some((lot_share, micro_share)) = math::split_staking_profit(
            undistributed,
            self.state.total_lots,
            self.state.total_micro_supply,
        ) else {
            msg!("Staking: {} undistributed, no stakers", undistributed);
            return Ok(0);
        };

        let mut total_profit = self.state.total_profit();
        let mut lot_carry = self.state.lot_carry;
        if lot_share > 0 {
            let (inc, carry) = math::accumulator_step(lot_share, lot_carry, self.state.total_lots as u128)
                .ok_or(PoolError::Overflow)?;
            total_profit = total_profit.checked_add(inc).ok_or(PoolError::Overflow)?;
            lot_carry = carry;
        }
        let mut micro_per_unit = self.state.micro_profit_per_unit();
        let mut micro_carry = self.state.micro_carry;
        if micro_share > 0 {
            let (inc, carry) = math::accumulator_step(micro_share, micro_carry, self.state.total_micro_supply)
                .ok_or(PoolError::Overflow)?;
            micro_per_unit = micro_per_unit.checked_add(inc).ok_or(PoolError::Overflow)?;
            micro_carry = carry;
        }
        let micro_lots_profits = self
            .state
            .micro_lots_profits
            .checked_add(micro_share)
            .ok_or(PoolError::Overflow)?;

        self.state.total_profit = write_u256(total_profit);
        self.state.micro_profit_per_unit = write_u256(micro_per_unit);
        self.state.lot_carry = lot_carry;
        self.state.micro_carry = micro_carry;
        self.state.micro_lots_profits = micro_lots_profits;
        self.state.accounted_balance = balance;

        msg!(
            "Staking: distributed {} (lots {}, micro {})",
            undistributed,
            lot_share,
            micro_share
        );
        self.events.push(Event::Profit { amount: undistributed });
        Ok(undistributed)
    }

    /// Fold accrued profit into `unclaimed` and move the snapshots forward.
    fn settle(&self, holder: &Pubkey) -> Result<StakingAccount, PoolError> {
        let profit = self.profit_of(holder)?;
        let mut acc = self.account(holder);
        acc.unclaimed = profit;
        acc.profit_snapshot = self.state.total_profit;
        acc.micro_snapshot = self.state.micro_profit_per_unit;
        Ok(acc)
    }

    fn store(&mut self, holder: &Pubkey, acc: StakingAccount) {
        if acc.is_empty() {
            self.accounts.remove(holder);
        } else {
            self.accounts.insert(*holder, acc);
        }
    }

    fn check_lockup(last_bought: i64, lockup: u64, now: i64) -> Result<(), PoolError> {
        let unlocks_at = last_bought
            .checked_add(lockup as i64)
            .ok_or(PoolError::Overflow)?;
        if now < unlocks_at {
            msg!("Staking: locked until {}", unlocks_at);
            return Err(PoolError::StakingLocked);
        }
        Ok(())
    }

    fn lots_cost(&self, count: u64) -> Result<u128, PoolError> {
        self.state
            .lot_price
            .checked_mul(count as u128)
            .ok_or(PoolError::Overflow)
    }

    // ═══════════════════════════════════════════════════════════════
    // Lots
    // ═══════════════════════════════════════════════════════════════

    pub fn buy_staking_lot(
        &mut self,
        governance: &mut dyn TokenLedger,
        now: i64,
        buyer: &Pubkey,
        count: u64,
    ) -> Result<(), PoolError> {
        if count == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let total_lots = self
            .state
            .total_lots
            .checked_add(count)
            .ok_or(PoolError::Overflow)?;
        if total_lots > self.state.max_supply {
            return Err(PoolError::MaxSupplyExceeded);
        }
        let cost = self.lots_cost(count)?;
        let address = self.address();
        governance.transfer_from(&address, buyer, &address, cost)?;

        let mut acc = self.settle(buyer)?;
        acc.lots = acc.lots.checked_add(count).ok_or(PoolError::Overflow)?;
        acc.last_bought = now;
        self.store(buyer, acc);
        self.state.total_lots = total_lots;

        msg!("Staking: {} bought {} lots", buyer, count);
        Ok(())
    }

    pub fn sell_staking_lot(
        &mut self,
        governance: &mut dyn TokenLedger,
        now: i64,
        seller: &Pubkey,
        count: u64,
    ) -> Result<(), PoolError> {
        if count == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let current = self.account(seller);
        if current.lots < count {
            return Err(PoolError::InsufficientStake);
        }
        Self::check_lockup(current.last_bought, self.state.classic_lockup, now)?;
        let refund = self.lots_cost(count)?;

        let mut acc = self.settle(seller)?;
        acc.lots -= count;
        self.store(seller, acc);
        self.state.total_lots -= count;
        governance.transfer(&self.address(), seller, refund)?;

        msg!("Staking: {} sold {} lots", seller, count);
        Ok(())
    }

    /// Move whole lots between holders. Both sides are settled against the
    /// last distribution so profit accrued so far stays with its earner.
    pub fn transfer_lots(
        &mut self,
        now: i64,
        from: &Pubkey,
        to: &Pubkey,
        count: u64,
    ) -> Result<(), PoolError> {
        if count == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if *to == Pubkey::default() {
            return Err(PoolError::ZeroAddress);
        }
        let current = self.account(from);
        if current.lots < count {
            return Err(PoolError::InsufficientStake);
        }
        Self::check_lockup(current.last_bought, self.state.classic_lockup, now)?;

        let mut sender = self.settle(from)?;
        sender.lots -= count;
        self.store(from, sender);
        let mut receiver = self.settle(to)?;
        receiver.lots = receiver.lots.checked_add(count).ok_or(PoolError::Overflow)?;
        self.store(to, receiver);

        msg!("Staking: {} lots {} -> {}", count, from, to);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Micro-lots
    // ═══════════════════════════════════════════════════════════════

    pub fn buy_micro_lot(
        &mut self,
        governance: &mut dyn TokenLedger,
        now: i64,
        buyer: &Pubkey,
        amount: u128,
    ) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let supply = self
            .state
            .total_micro_supply
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        let address = self.address();
        governance.transfer_from(&address, buyer, &address, amount)?;

        let mut acc = self.settle(buyer)?;
        acc.micro_amount = acc.micro_amount.checked_add(amount).ok_or(PoolError::Overflow)?;
        acc.micro_last_bought = now;
        self.store(buyer, acc);
        self.state.total_micro_supply = supply;

        msg!("Staking: {} bought {} micro", buyer, amount);
        Ok(())
    }

    pub fn sell_micro_lot(
        &mut self,
        governance: &mut dyn TokenLedger,
        now: i64,
        seller: &Pubkey,
        amount: u128,
    ) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let current = self.account(seller);
        if current.micro_amount < amount {
            return Err(PoolError::InsufficientStake);
        }
        Self::check_lockup(current.micro_last_bought, self.state.micro_lockup, now)?;

        let mut acc = self.settle(seller)?;
        acc.micro_amount -= amount;
        self.store(seller, acc);
        self.state.total_micro_supply -= amount;
        governance.transfer(&self.address(), seller, amount)?;

        msg!("Staking: {} sold {} micro", seller, amount);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // Claims
    // ═══════════════════════════════════════════════════════════════

    /// Pay out everything `account` has accrued up to the last distribution.
    /// Anyone may trigger it; profit that arrived since is not included.
    pub fn claim_profits(&mut self, profit_token: &mut dyn TokenLedger, account: &Pubkey) -> Result<u128, PoolError> {
        let mut acc = self.settle(account)?;
        let profit = acc.unclaimed;
        if profit == 0 {
            return Err(PoolError::ZeroProfit);
        }
        let accounted = self
            .state
            .accounted_balance
            .checked_sub(profit)
            .ok_or(PoolError::Overflow)?;
        acc.unclaimed = 0;
        self.store(account, acc);
        self.state.accounted_balance = accounted;
        profit_token.transfer(&self.address(), account, profit)?;

        msg!("Staking: {} claimed {}", account, profit);
        self.events.push(Event::Claim { account: *account, amount: profit });
        Ok(profit)
    }

    // ── Owner knobs ──

    pub fn set_lockup_periods(&mut self, caller: &Pubkey, classic: u64, micro: u64) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Owner)?;
        if classic > MAX_LOCKUP_PERIOD || micro > MAX_LOCKUP_PERIOD {
            return Err(PoolError::StakingLockupTooLong);
        }
        self.state.classic_lockup = classic;
        self.state.micro_lockup = micro;
        msg!("Staking: lockup classic={} micro={}", classic, micro);
        Ok(())
    }
}
