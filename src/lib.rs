//! Options Liquidity Protocol
//!
//! Accounting engine for a pooled options market. Liquidity providers deposit
//! collateral into a hedged or an unhedged class and receive tranches. The
//! pool sells collateralized call or put options against that liquidity,
//! splits premiums between the classes, settles exercise and expiry, and
//! routes settlement fees to a staking ledger whose lot holders share them.
//! Option buyers can additionally claim governance-token rewards.
//!
//! Architecture:
//! - `tranche` and `option_book` own the records; `pool` composes them over
//!   one `PoolState` aggregate; both keep records in a journaled `arena`
//! - `staking` distributes fee income through scaled per-unit accumulators
//! - `rewards` pays governance tokens per sold option under a daily cap
//! - `protocol` wires the ledgers to two token ledgers plus the oracle and
//!   pricing registries, and makes every operation all-or-nothing
//! - `processor` decodes `instruction` bytes and dispatches into `protocol`
//!
//! Instructions:
//!   0 - Provide:                 Deposit collateral, mint a tranche
//!   1 - Withdraw:                Redeem a tranche (hedge pool tops up losses)
//!   2 - WithdrawWithoutHedge:    Redeem a tranche at pool value
//!   3 - SellOption:              Lock collateral, collect premium and fee
//!   4 - Exercise:                Pay an in-the-money option before expiry
//!   5 - Unlock:                  Release an expired option (permissionless)
//!   6 - SetApprovalForAll:       Approve an operator for tranches and options
//!   7 - TransferTranche
//!   8 - TransferOption
//!   9 - UpdatePoolConfig:        Admin updates lockups, caps and rates
//!  10 - SetHedgePool
//!  11 - SetSettlementFeeRecipient
//!  12 - SetPriceCalculator
//!  13 - BuyStakingLot
//!  14 - SellStakingLot
//!  15 - BuyMicroLot
//!  16 - SellMicroLot
//!  17 - TransferLots
//!  18 - DistributeUnrealizedRewards (permissionless)
//!  19 - ClaimProfits                (permissionless)
//!  20 - ClaimReward:             Governance reward to an option holder (permissionless)
//!  21 - SetRewardsRate
//!  22 - SetStakingLockup

pub mod access;
pub mod arena;
pub mod error;
pub mod event;
pub mod external;
pub mod instruction;
pub mod math;
pub mod option_book;
pub mod pool;
pub mod processor;
pub mod protocol;
pub mod rewards;
pub mod staking;
pub mod state;
pub mod token;
pub mod tranche;
