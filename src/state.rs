use alloy_primitives::U256;
use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::error::PoolError;
use crate::math;

/// Seconds per day.
pub const DAY: u64 = 86_400;

/// Upper bound for every lockup period (60 days).
pub const MAX_LOCKUP_PERIOD: u64 = 60 * DAY;

/// Shortest option period.
pub const MIN_OPTION_PERIOD: u64 = DAY;

/// Longest option period (12 weeks).
pub const MAX_OPTION_PERIOD: u64 = 12 * 7 * DAY;

pub(crate) fn read_u256(bytes: &[u8; 32]) -> U256 {
    U256::from_le_bytes(*bytes)
}

pub(crate) fn write_u256(value: U256) -> [u8; 32] {
    value.to_le_bytes::<32>()
}

// ═══════════════════════════════════════════════════════════════
// Discriminants
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrancheState {
    Invalid = 0,
    Open = 1,
    Closed = 2,
}

impl TrancheState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Open,
            2 => Self::Closed,
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OptionState {
    Invalid = 0,
    Active = 1,
    Exercised = 2,
    Expired = 3,
}

impl OptionState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Active,
            2 => Self::Exercised,
            3 => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// Which side of the market a pool writes.
///
/// Calls are collateralized in the underlying; puts in a quote asset, so the
/// strike converts notional into collateral units through both decimal scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put { token_decimals: u8, spot_decimals: u8 },
}

impl OptionKind {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Call => 0,
            Self::Put { .. } => 1,
        }
    }

    /// Collateral reserved for a sale.
    pub fn locked_amount(&self, amount: u128, strike: u128, collateralization_ratio: u64) -> Option<u128> {
        match *self {
            Self::Call => math::call_locked_amount(amount, collateralization_ratio),
            Self::Put { token_decimals, spot_decimals } => math::put_locked_amount(
                amount,
                strike,
                collateralization_ratio,
                token_decimals,
                spot_decimals,
            ),
        }
    }

    /// Exercise value at `price`; zero when out of the money.
    pub fn profit(&self, amount: u128, strike: u128, price: u128) -> Option<u128> {
        match *self {
            Self::Call => math::call_profit(amount, strike, price),
            Self::Put { token_decimals, spot_decimals } => {
                math::put_profit(amount, strike, price, token_decimals, spot_decimals)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Tranche
// ═══════════════════════════════════════════════════════════════

/// One liquidity provider deposit.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct Tranche {
    /// Collateral deposited
    pub amount: u128,

    /// Share units, little-endian U256
    pub share: [u8; 32],

    /// Current owner
    pub owner: [u8; 32],

    /// Unix timestamp of the deposit; lockup runs from here
    pub creation_time: i64,

    /// TrancheState discriminant
    pub state: u8,

    /// 1 = hedged class, 0 = unhedged class
    pub hedged: u8,

    pub _padding: [u8; 6],
}

/// Size of Tranche in bytes
pub const TRANCHE_SIZE: usize = core::mem::size_of::<Tranche>();

impl Tranche {
    pub fn owner_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.owner)
    }

    pub fn share(&self) -> U256 {
        read_u256(&self.share)
    }

    pub fn set_share(&mut self, share: U256) {
        self.share = write_u256(share);
    }

    pub fn state(&self) -> TrancheState {
        TrancheState::from_u8(self.state)
    }

    pub fn is_hedged(&self) -> bool {
        self.hedged != 0
    }
}

// ═══════════════════════════════════════════════════════════════
// Locked liquidity (one sold option)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct LockedLiquidity {
    /// Notional
    pub amount: u128,

    /// Collateral reserved while Active
    pub locked_amount: u128,

    /// Premium paid by the buyer
    pub premium: u128,

    /// Premium credited to the hedged class on release
    pub hedge_premium: u128,

    /// Premium credited to the unhedged class on release
    pub unhedge_premium: u128,

    /// Strike, 8 decimals
    pub strike: u128,

    pub holder: [u8; 32],

    pub expiration: i64,

    pub created_at: i64,

    /// OptionState discriminant
    pub state: u8,

    pub _padding: [u8; 15],
}

/// Size of LockedLiquidity in bytes
pub const LOCKED_LIQUIDITY_SIZE: usize = core::mem::size_of::<LockedLiquidity>();

impl LockedLiquidity {
    pub fn holder_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.holder)
    }

    pub fn state(&self) -> OptionState {
        OptionState::from_u8(self.state)
    }
}

// ═══════════════════════════════════════════════════════════════
// Pool aggregate
// ═══════════════════════════════════════════════════════════════

/// Aggregate balances and policy of one liquidity pool.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct PoolState {
    /// Collateral attributed to hedged tranches
    pub hedged_balance: u128,

    /// Collateral attributed to unhedged tranches
    pub unhedged_balance: u128,

    /// Sum of locked_amount over Active options
    pub locked_amount: u128,

    /// Cap on hedged + unhedged balance for unhedged deposits
    pub max_deposit_amount: u128,

    /// Cap on hedged balance for hedged deposits
    pub max_hedged_deposit_amount: u128,

    /// Hedged share supply, little-endian U256
    pub hedged_share: [u8; 32],

    /// Unhedged share supply, little-endian U256
    pub unhedged_share: [u8; 32],

    /// Receives the hedge fee; tops up hedged withdrawals
    pub hedge_pool: [u8; 32],

    /// Receives settlement fees (the staking ledger)
    pub settlement_fee_recipient: [u8; 32],

    /// Registry key of the pricing service
    pub price_calculator: [u8; 32],

    /// Registry key of the spot price oracle
    pub price_feed: [u8; 32],

    /// Token account holding the pool's collateral
    pub address: [u8; 32],

    pub lockup_hedged: u64,

    pub lockup_unhedged: u64,

    /// Percent of notional locked per option
    pub collateralization_ratio: u64,

    /// Percent of total balance that may be locked
    pub max_utilization_rate: u64,

    /// Percent of the hedged premium forwarded to the hedge pool
    pub hedge_fee_rate: u64,

    /// 0 = call, 1 = put
    pub kind: u8,

    pub token_decimals: u8,

    pub spot_decimals: u8,

    /// Whether the pool is initialized (1 = yes, 0 = no)
    pub is_initialized: u8,

    pub _padding: [u8; 4],
}

/// Size of PoolState in bytes
pub const POOL_STATE_SIZE: usize = core::mem::size_of::<PoolState>();

impl PoolState {
    pub fn hedged_share(&self) -> U256 {
        read_u256(&self.hedged_share)
    }

    pub fn unhedged_share(&self) -> U256 {
        read_u256(&self.unhedged_share)
    }

    pub fn set_hedged_share(&mut self, share: U256) {
        self.hedged_share = write_u256(share);
    }

    pub fn set_unhedged_share(&mut self, share: U256) {
        self.unhedged_share = write_u256(share);
    }

    pub fn hedge_pool_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.hedge_pool)
    }

    pub fn settlement_fee_recipient_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.settlement_fee_recipient)
    }

    pub fn price_calculator_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.price_calculator)
    }

    pub fn price_feed_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.price_feed)
    }

    pub fn address_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.address)
    }

    pub fn option_kind(&self) -> OptionKind {
        if self.kind == 1 {
            OptionKind::Put {
                token_decimals: self.token_decimals,
                spot_decimals: self.spot_decimals,
            }
        } else {
            OptionKind::Call
        }
    }

    /// hedged_balance + unhedged_balance.
    pub fn total_balance(&self) -> Result<u128, PoolError> {
        self.hedged_balance
            .checked_add(self.unhedged_balance)
            .ok_or(PoolError::Overflow)
    }

    /// Collateral not reserved by Active options.
    pub fn available_balance(&self) -> Result<u128, PoolError> {
        Ok(self.total_balance()?.saturating_sub(self.locked_amount))
    }

    pub fn lockup_for(&self, hedged: bool) -> u64 {
        if hedged {
            self.lockup_hedged
        } else {
            self.lockup_unhedged
        }
    }

    /// (share supply, balance) of one class.
    pub fn class(&self, hedged: bool) -> (U256, u128) {
        if hedged {
            (self.hedged_share(), self.hedged_balance)
        } else {
            (self.unhedged_share(), self.unhedged_balance)
        }
    }

    pub fn set_class(&mut self, hedged: bool, share: U256, balance: u128) {
        if hedged {
            self.set_hedged_share(share);
            self.hedged_balance = balance;
        } else {
            self.set_unhedged_share(share);
            self.unhedged_balance = balance;
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Staking
// ═══════════════════════════════════════════════════════════════

/// Per-holder staking position.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct StakingAccount {
    /// Settled, not yet claimed profit
    pub unclaimed: u128,

    /// Micro-lot units held
    pub micro_amount: u128,

    /// total_profit at the last settlement, little-endian U256
    pub profit_snapshot: [u8; 32],

    /// micro_profit_per_unit at the last settlement, little-endian U256
    pub micro_snapshot: [u8; 32],

    /// Whole lots held
    pub lots: u64,

    pub last_bought: i64,

    pub micro_last_bought: i64,

    pub _padding: [u8; 8],
}

/// Size of StakingAccount in bytes
pub const STAKING_ACCOUNT_SIZE: usize = core::mem::size_of::<StakingAccount>();

impl StakingAccount {
    pub fn profit_snapshot(&self) -> U256 {
        read_u256(&self.profit_snapshot)
    }

    pub fn micro_snapshot(&self) -> U256 {
        read_u256(&self.micro_snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.lots == 0 && self.micro_amount == 0 && self.unclaimed == 0
    }
}

/// Aggregate state of the staking ledger.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct StakingState {
    /// Profit-token balance already attributed by distributions, net of claims
    pub accounted_balance: u128,

    /// Running total of profit credited to the micro-lot class
    pub micro_lots_profits: u128,

    pub total_micro_supply: u128,

    /// Governance tokens per whole lot
    pub lot_price: u128,

    /// Scaled (1e30) distribution remainder not yet in `total_profit`
    pub lot_carry: u128,

    /// Scaled (1e30) distribution remainder not yet in `micro_profit_per_unit`
    pub micro_carry: u128,

    /// Profit per lot ever distributed, scaled 1e30, little-endian U256
    pub total_profit: [u8; 32],

    /// Profit per micro unit ever distributed, scaled 1e30, little-endian U256
    pub micro_profit_per_unit: [u8; 32],

    /// Token account holding lots and profit
    pub address: [u8; 32],

    pub total_lots: u64,

    pub max_supply: u64,

    pub classic_lockup: u64,

    pub micro_lockup: u64,
}

/// Size of StakingState in bytes
pub const STAKING_STATE_SIZE: usize = core::mem::size_of::<StakingState>();

impl StakingState {
    pub fn total_profit(&self) -> U256 {
        read_u256(&self.total_profit)
    }

    pub fn micro_profit_per_unit(&self) -> U256 {
        read_u256(&self.micro_profit_per_unit)
    }

    pub fn address_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.address)
    }
}
