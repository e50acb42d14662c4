//! Governance-token rewards for option buyers.

use std::collections::BTreeSet;

use solana_program::{msg, pubkey::Pubkey};

use crate::access::{Permissions, Role};
use crate::error::PoolError;
use crate::event::Event;
use crate::math;
use crate::pool::LiquidityPool;
use crate::state::{OptionState, DAY};
use crate::token::TokenLedger;

pub const MIN_REWARDS_RATE: u128 = 1_000_000_000; // 1e9
pub const MAX_REWARDS_RATE: u128 = math::REWARDS_RATE_SCALE; // 1e24

/// Governance tokens paid out per rolling day, 18 decimals.
pub const MAX_DAILY_REWARD: u128 = 165_000 * 10u128.pow(18);

#[derive(Debug, Clone, Copy)]
pub struct RewardsConfig {
    /// Token account funding the rewards
    pub address: Pubkey,
    pub rewards_rate: u128,
    pub daily_limit: u128,
}

impl RewardsConfig {
    pub fn new(address: Pubkey) -> Self {
        Self {
            address,
            rewards_rate: MAX_REWARDS_RATE,
            daily_limit: MAX_DAILY_REWARD,
        }
    }
}

/// Rollback point of the rewards ledger.
#[derive(Debug, Clone)]
pub struct RewardsCheckpoint {
    rewards_rate: u128,
    day_start: i64,
    paid_today: u128,
    permissions: Permissions,
    journal: usize,
    events: usize,
}

#[derive(Debug, Clone)]
pub struct RewardsLedger {
    address: Pubkey,
    rewards_rate: u128,
    daily_limit: u128,
    day_start: i64,
    paid_today: u128,
    rewarded: BTreeSet<u64>,
    /// option ids marked rewarded since the last commit
    journal: Vec<u64>,
    permissions: Permissions,
    events: Vec<Event>,
}

fn check_rate(rate: u128) -> Result<(), PoolError> {
    if (MIN_REWARDS_RATE..=MAX_REWARDS_RATE).contains(&rate) {
        Ok(())
    } else {
        Err(PoolError::WrongRewardsRate)
    }
}

impl RewardsLedger {
    pub fn new(owner: &Pubkey, config: RewardsConfig) -> Result<Self, PoolError> {
        check_rate(config.rewards_rate)?;
        Ok(Self {
            address: config.address,
            rewards_rate: config.rewards_rate,
            daily_limit: config.daily_limit,
            day_start: 0,
            paid_today: 0,
            rewarded: BTreeSet::new(),
            journal: Vec::new(),
            permissions: Permissions::with(owner, &[Role::Owner]),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn rewards_rate(&self) -> u128 {
        self.rewards_rate
    }

    pub fn is_rewarded(&self, option_id: u64) -> bool {
        self.rewarded.contains(&option_id)
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn checkpoint(&self) -> RewardsCheckpoint {
        RewardsCheckpoint {
            rewards_rate: self.rewards_rate,
            day_start: self.day_start,
            paid_today: self.paid_today,
            permissions: self.permissions.clone(),
            journal: self.journal.len(),
            events: self.events.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: RewardsCheckpoint) {
        for option_id in self.journal.drain(checkpoint.journal..) {
            self.rewarded.remove(&option_id);
        }
        self.rewards_rate = checkpoint.rewards_rate;
        self.day_start = checkpoint.day_start;
        self.paid_today = checkpoint.paid_today;
        self.permissions = checkpoint.permissions;
        self.events.truncate(checkpoint.events);
    }

    pub fn commit(&mut self) {
        self.journal.clear();
    }

    pub fn set_rewards_rate(&mut self, caller: &Pubkey, rate: u128) -> Result<(), PoolError> {
        self.permissions.require(caller, Role::Owner)?;
        check_rate(rate)?;
        self.rewards_rate = rate;
        msg!("Rewards: rate={}", rate);
        Ok(())
    }

    /// Pay the option holder `amount * rate / 1e24` governance tokens, once per
    /// option. Anyone may trigger the payout; it always goes to the current holder.
    pub fn claim_reward(
        &mut self,
        governance: &mut dyn TokenLedger,
        pool: &LiquidityPool,
        now: i64,
        caller: &Pubkey,
        option_id: u64,
    ) -> Result<u128, PoolError> {
        let option = pool.option(option_id)?;
        if option.state() == OptionState::Invalid {
            return Err(PoolError::UnknownId);
        }
        if self.rewarded.contains(&option_id) {
            return Err(PoolError::RewardAlreadyClaimed);
        }
        let reward = math::reward_for(option.amount, self.rewards_rate).ok_or(PoolError::Overflow)?;

        let (day_start, paid) = if now >= self.day_start.saturating_add(DAY as i64) {
            (now, 0)
        } else {
            (self.day_start, self.paid_today)
        };
        let paid = paid.checked_add(reward).ok_or(PoolError::Overflow)?;
        if paid > self.daily_limit {
            msg!("Rewards: {} would exceed the daily limit", reward);
            return Err(PoolError::DailyLimitReached);
        }

        self.rewarded.insert(option_id);
        self.journal.push(option_id);
        self.day_start = day_start;
        self.paid_today = paid;
        let holder = option.holder_pubkey();
        governance.transfer(&self.address, &holder, reward)?;

        msg!("Rewards: option={} holder={} reward={} by {}", option_id, holder, reward, caller);
        self.events.push(Event::Rewarded { option_id, amount: reward });
        Ok(reward)
    }
}
