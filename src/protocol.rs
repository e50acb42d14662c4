//! One options market: liquidity pool, staking, rewards and the two token
//! ledgers they move.
//!
//! Every public operation runs through `transact`, which checkpoints all
//! ledger state and restores it when any step fails, token transfers
//! included. Events are published only for committed operations.
//!
//! Tranche and option records are rolled back from undo journals, so a
//! checkpoint does not grow with the number of records ever written. The
//! token balances and staking accounts are copied, which costs one entry
//! per participant.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::U256;
use solana_program::{clock::Clock, msg, pubkey::Pubkey};

use crate::access::Role;
use crate::error::PoolError;
use crate::event::Event;
use crate::external::{PriceCalculator, PriceOracle};
use crate::pool::{LiquidityPool, OptionRequest, PoolCheckpoint, PoolConfig};
use crate::rewards::{RewardsCheckpoint, RewardsConfig, RewardsLedger};
use crate::staking::{GOVERNANCE_DECIMALS, StakingConfig, StakingLedger};
use crate::state::OptionKind;
use crate::token::TokenBank;

pub type SharedOracle = Arc<dyn PriceOracle + Send + Sync>;
pub type SharedCalculator = Arc<dyn PriceCalculator + Send + Sync>;

/// Derive the pool's collateral account for a market.
pub fn derive_pool_address(program_id: &Pubkey, market: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"option_pool", market.as_ref()], program_id)
}

/// Derive the staking ledger's account for a market.
pub fn derive_staking_address(program_id: &Pubkey, market: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"staking", market.as_ref()], program_id)
}

/// Derive the rewards ledger's account for a market.
pub fn derive_rewards_address(program_id: &Pubkey, market: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"rewards", market.as_ref()], program_id)
}

/// Deployment parameters of a market.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    pub program_id: Pubkey,
    /// Identifies the market; seeds every derived account
    pub market: Pubkey,
    pub kind: OptionKind,
    pub collateral_decimals: u8,
    /// Registry key of the spot oracle
    pub price_feed: Pubkey,
    /// Registry key of the pricing service
    pub price_calculator: Pubkey,
}

/// Optional pool policy changes applied together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolConfigUpdate {
    pub lockup_hedged: Option<u64>,
    pub lockup_unhedged: Option<u64>,
    pub max_deposit_amount: Option<u128>,
    pub max_hedged_deposit_amount: Option<u128>,
    pub max_utilization_rate: Option<u64>,
    pub collateralization_ratio: Option<u64>,
    pub hedge_fee_rate: Option<u64>,
}

#[derive(Clone)]
struct Checkpoint {
    collateral: TokenBank,
    governance: TokenBank,
    pool: PoolCheckpoint,
    staking: StakingLedger,
    rewards: RewardsCheckpoint,
}

pub struct Protocol {
    collateral: TokenBank,
    governance: TokenBank,
    pool: LiquidityPool,
    staking: StakingLedger,
    rewards: RewardsLedger,
    price_feeds: BTreeMap<Pubkey, SharedOracle>,
    price_calculators: BTreeMap<Pubkey, SharedCalculator>,
    events: Vec<Event>,
}

impl Protocol {
    /// Deploy a market. `deployer` administers the pool, owns staking and
    /// rewards, and acts as the initial hedge pool.
    pub fn new(
        deployer: &Pubkey,
        config: MarketConfig,
        oracle: SharedOracle,
        calculator: SharedCalculator,
    ) -> Result<Self, PoolError> {
        let (pool_address, _) = derive_pool_address(&config.program_id, &config.market);
        let (staking_address, _) = derive_staking_address(&config.program_id, &config.market);
        let (rewards_address, _) = derive_rewards_address(&config.program_id, &config.market);

        let pool = LiquidityPool::new(
            deployer,
            PoolConfig {
                kind: config.kind,
                address: pool_address,
                hedge_pool: *deployer,
                settlement_fee_recipient: staking_address,
                price_feed: config.price_feed,
                price_calculator: config.price_calculator,
                ..PoolConfig::default()
            },
        )?;
        let staking = StakingLedger::new(deployer, StakingConfig::new(staking_address))?;
        let rewards = RewardsLedger::new(deployer, RewardsConfig::new(rewards_address))?;

        let mut price_feeds = BTreeMap::new();
        price_feeds.insert(config.price_feed, oracle);
        let mut price_calculators = BTreeMap::new();
        price_calculators.insert(config.price_calculator, calculator);

        msg!(
            "Protocol: market {} pool={} staking={} rewards={}",
            config.market,
            pool_address,
            staking_address,
            rewards_address
        );
        Ok(Self {
            collateral: TokenBank::new(config.collateral_decimals),
            governance: TokenBank::new(GOVERNANCE_DECIMALS as u8),
            pool,
            staking,
            rewards,
            price_feeds,
            price_calculators,
            events: Vec::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Atomic call boundary
    // ═══════════════════════════════════════════════════════════════

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            collateral: self.collateral.clone(),
            governance: self.governance.clone(),
            pool: self.pool.checkpoint(),
            staking: self.staking.clone(),
            rewards: self.rewards.checkpoint(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.collateral = checkpoint.collateral;
        self.governance = checkpoint.governance;
        self.pool.rollback(checkpoint.pool);
        self.staking = checkpoint.staking;
        self.rewards.rollback(checkpoint.rewards);
    }

    /// Run `f` all-or-nothing.
    ///
    /// On success the undo journals are dropped and buffered events are
    /// published. On failure every ledger is put back as it was.
    pub fn transact<R>(
        &mut self,
        op: &str,
        f: impl FnOnce(&mut Self) -> Result<R, PoolError>,
    ) -> Result<R, PoolError> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(r) => {
                self.pool.commit();
                self.rewards.commit();
                self.events.extend(self.pool.take_events());
                self.events.extend(self.staking.take_events());
                self.events.extend(self.rewards.take_events());
                Ok(r)
            }
            Err(e) => {
                msg!("{} failed: {}", op, e);
                self.restore(checkpoint);
                Err(e)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Views
    // ═══════════════════════════════════════════════════════════════

    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    pub fn staking(&self) -> &StakingLedger {
        &self.staking
    }

    pub fn rewards(&self) -> &RewardsLedger {
        &self.rewards
    }

    pub fn collateral(&self) -> &TokenBank {
        &self.collateral
    }

    pub fn governance(&self) -> &TokenBank {
        &self.governance
    }

    /// Direct ledger access for funding accounts and setting allowances.
    pub fn collateral_mut(&mut self) -> &mut TokenBank {
        &mut self.collateral
    }

    pub fn governance_mut(&mut self) -> &mut TokenBank {
        &mut self.governance
    }

    /// Events of committed operations since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// blake3 digest over every ledger record and token balance.
    pub fn state_hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.pool.record_bytes());
        hasher.update(&self.staking.record_bytes());
        for bank in [&self.collateral, &self.governance] {
            for (key, balance) in bank.holders() {
                hasher.update(key.as_ref());
                hasher.update(&balance.to_le_bytes());
            }
        }
        *hasher.finalize().as_bytes()
    }

    fn oracle(&self) -> Result<SharedOracle, PoolError> {
        self.price_feeds
            .get(&self.pool.state().price_feed_pubkey())
            .cloned()
            .ok_or(PoolError::UnknownService)
    }

    fn calculator(&self) -> Result<SharedCalculator, PoolError> {
        self.price_calculators
            .get(&self.pool.state().price_calculator_pubkey())
            .cloned()
            .ok_or(PoolError::UnknownService)
    }

    /// Exercise value of an option at the current oracle price.
    pub fn option_profit(&self, option_id: u64) -> Result<u128, PoolError> {
        let oracle = self.oracle()?;
        self.pool.profit_of(oracle.as_ref(), option_id)
    }

    // ═══════════════════════════════════════════════════════════════
    // Liquidity
    // ═══════════════════════════════════════════════════════════════

    pub fn provide(
        &mut self,
        clock: &Clock,
        signer: &Pubkey,
        account: &Pubkey,
        amount: u128,
        hedged: bool,
        min_share: U256,
    ) -> Result<u64, PoolError> {
        self.transact("Provide", |p| {
            p.pool.provide(
                &mut p.collateral,
                clock.unix_timestamp,
                signer,
                account,
                amount,
                hedged,
                min_share,
            )
        })
    }

    pub fn withdraw(&mut self, clock: &Clock, signer: &Pubkey, tranche_id: u64) -> Result<u128, PoolError> {
        self.transact("Withdraw", |p| {
            p.pool
                .withdraw(&mut p.collateral, clock.unix_timestamp, signer, tranche_id)
        })
    }

    pub fn withdraw_without_hedge(
        &mut self,
        clock: &Clock,
        signer: &Pubkey,
        tranche_id: u64,
    ) -> Result<u128, PoolError> {
        self.transact("WithdrawWithoutHedge", |p| {
            p.pool
                .withdraw_without_hedge(&mut p.collateral, clock.unix_timestamp, signer, tranche_id)
        })
    }

    pub fn set_approval_for_all(&mut self, signer: &Pubkey, operator: &Pubkey, approved: bool) -> Result<(), PoolError> {
        self.transact("SetApprovalForAll", |p| {
            p.pool.set_approval_for_all(signer, operator, approved);
            Ok(())
        })
    }

    pub fn transfer_tranche(&mut self, signer: &Pubkey, tranche_id: u64, to: &Pubkey) -> Result<(), PoolError> {
        self.transact("TransferTranche", |p| p.pool.transfer_tranche(signer, tranche_id, to))
    }

    // ═══════════════════════════════════════════════════════════════
    // Options
    // ═══════════════════════════════════════════════════════════════

    pub fn sell_option(&mut self, clock: &Clock, signer: &Pubkey, request: &OptionRequest) -> Result<u64, PoolError> {
        self.transact("SellOption", |p| {
            let oracle = p.oracle()?;
            let calculator = p.calculator()?;
            p.pool.sell_option(
                &mut p.collateral,
                oracle.as_ref(),
                calculator.as_ref(),
                clock.unix_timestamp,
                signer,
                request,
            )
        })
    }

    pub fn exercise(&mut self, clock: &Clock, signer: &Pubkey, option_id: u64) -> Result<u128, PoolError> {
        self.transact("Exercise", |p| {
            let oracle = p.oracle()?;
            p.pool.exercise(
                &mut p.collateral,
                oracle.as_ref(),
                clock.unix_timestamp,
                signer,
                option_id,
            )
        })
    }

    pub fn unlock(&mut self, clock: &Clock, option_id: u64) -> Result<(), PoolError> {
        self.transact("Unlock", |p| p.pool.unlock(clock.unix_timestamp, option_id))
    }

    pub fn transfer_option(&mut self, signer: &Pubkey, option_id: u64, to: &Pubkey) -> Result<(), PoolError> {
        self.transact("TransferOption", |p| p.pool.transfer_option(signer, option_id, to))
    }

    pub fn claim_reward(&mut self, clock: &Clock, signer: &Pubkey, option_id: u64) -> Result<u128, PoolError> {
        self.transact("ClaimReward", |p| {
            p.rewards.claim_reward(
                &mut p.governance,
                &p.pool,
                clock.unix_timestamp,
                signer,
                option_id,
            )
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Staking
    // ═══════════════════════════════════════════════════════════════

    pub fn buy_staking_lot(&mut self, clock: &Clock, signer: &Pubkey, count: u64) -> Result<(), PoolError> {
        self.transact("BuyStakingLot", |p| {
            p.staking
                .buy_staking_lot(&mut p.governance, clock.unix_timestamp, signer, count)
        })
    }

    pub fn sell_staking_lot(&mut self, clock: &Clock, signer: &Pubkey, count: u64) -> Result<(), PoolError> {
        self.transact("SellStakingLot", |p| {
            p.staking
                .sell_staking_lot(&mut p.governance, clock.unix_timestamp, signer, count)
        })
    }

    pub fn buy_micro_lot(&mut self, clock: &Clock, signer: &Pubkey, amount: u128) -> Result<(), PoolError> {
        self.transact("BuyMicroLot", |p| {
            p.staking
                .buy_micro_lot(&mut p.governance, clock.unix_timestamp, signer, amount)
        })
    }

    pub fn sell_micro_lot(&mut self, clock: &Clock, signer: &Pubkey, amount: u128) -> Result<(), PoolError> {
        self.transact("SellMicroLot", |p| {
            p.staking
                .sell_micro_lot(&mut p.governance, clock.unix_timestamp, signer, amount)
        })
    }

    pub fn transfer_lots(&mut self, clock: &Clock, signer: &Pubkey, to: &Pubkey, count: u64) -> Result<(), PoolError> {
        self.transact("TransferLots", |p| {
            p.staking
                .transfer_lots(clock.unix_timestamp, signer, to, count)
        })
    }

    pub fn distribute_unrealized_rewards(&mut self) -> Result<u128, PoolError> {
        self.transact("DistributeUnrealizedRewards", |p| {
            p.staking.distribute_unrealized_rewards(&p.collateral)
        })
    }

    pub fn claim_profits(&mut self, account: &Pubkey) -> Result<u128, PoolError> {
        self.transact("ClaimProfits", |p| p.staking.claim_profits(&mut p.collateral, account))
    }

    // ═══════════════════════════════════════════════════════════════
    // Administration
    // ═══════════════════════════════════════════════════════════════

    pub fn update_pool_config(&mut self, signer: &Pubkey, update: &PoolConfigUpdate) -> Result<(), PoolError> {
        self.transact("UpdatePoolConfig", |p| {
            let current = *p.pool.state();
            if update.lockup_hedged.is_some() || update.lockup_unhedged.is_some() {
                p.pool.set_lockup_period(
                    signer,
                    update.lockup_hedged.unwrap_or(current.lockup_hedged),
                    update.lockup_unhedged.unwrap_or(current.lockup_unhedged),
                )?;
            }
            if update.max_deposit_amount.is_some() || update.max_hedged_deposit_amount.is_some() {
                p.pool.set_max_deposit_amount(
                    signer,
                    update.max_deposit_amount.unwrap_or(current.max_deposit_amount),
                    update
                        .max_hedged_deposit_amount
                        .unwrap_or(current.max_hedged_deposit_amount),
                )?;
            }
            if let Some(v) = update.max_utilization_rate {
                p.pool.set_max_utilization_rate(signer, v)?;
            }
            if let Some(v) = update.collateralization_ratio {
                p.pool.set_collateralization_ratio(signer, v)?;
            }
            if let Some(v) = update.hedge_fee_rate {
                p.pool.set_hedge_fee_rate(signer, v)?;
            }
            Ok(())
        })
    }

    pub fn set_hedge_pool(&mut self, signer: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.transact("SetHedgePool", |p| p.pool.set_hedge_pool(signer, value))
    }

    pub fn set_settlement_fee_recipient(&mut self, signer: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.transact("SetSettlementFeeRecipient", |p| {
            p.pool.set_settlement_fee_recipient(signer, value)
        })
    }

    /// Point the pool at a registered pricing service.
    pub fn set_price_calculator(&mut self, signer: &Pubkey, value: &Pubkey) -> Result<(), PoolError> {
        self.transact("SetPriceCalculator", |p| {
            if !p.price_calculators.contains_key(value) {
                return Err(PoolError::UnknownService);
            }
            p.pool.set_price_calculator(signer, value)
        })
    }

    pub fn register_price_calculator(
        &mut self,
        signer: &Pubkey,
        key: &Pubkey,
        calculator: SharedCalculator,
    ) -> Result<(), PoolError> {
        self.pool.permissions().require(signer, Role::Admin)?;
        self.price_calculators.insert(*key, calculator);
        msg!("Protocol: price calculator {} registered", key);
        Ok(())
    }

    pub fn set_staking_lockup_periods(&mut self, signer: &Pubkey, classic: u64, micro: u64) -> Result<(), PoolError> {
        self.transact("SetStakingLockup", |p| {
            p.staking.set_lockup_periods(signer, classic, micro)
        })
    }

    pub fn set_rewards_rate(&mut self, signer: &Pubkey, rate: u128) -> Result<(), PoolError> {
        self.transact("SetRewardsRate", |p| p.rewards.set_rewards_rate(signer, rate))
    }

    pub fn grant_pool_admin(&mut self, signer: &Pubkey, who: &Pubkey) -> Result<(), PoolError> {
        self.transact("GrantAdmin", |p| p.pool.grant_admin(signer, who))
    }

    pub fn revoke_pool_admin(&mut self, signer: &Pubkey, who: &Pubkey) -> Result<(), PoolError> {
        self.transact("RevokeAdmin", |p| p.pool.revoke_admin(signer, who))
    }
}
