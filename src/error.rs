use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(u32)]
pub enum PoolError {
    /// Computed share rounds to zero
    #[error("Pool Error: The amount is too small")]
    AmountTooSmall = 0,
    /// Slippage guard: caller expected more share than the deposit mints
    #[error("Pool Error: The mint limit is too large")]
    MintLimitTooLarge = 1,
    /// Per-class deposit cap would be exceeded
    #[error("Pool Error: Depositing into the pool is not available")]
    DepositNotAvailable = 2,
    /// Tranche lockup has not elapsed
    #[error("Pool Error: The withdrawal is locked up")]
    WithdrawalLocked = 3,
    /// Caller is neither owner nor approved operator of the tranche
    #[error("Pool Error: caller can't withdraw this tranche")]
    NotTrancheOwner = 4,
    /// Tranche is not Open
    #[error("Pool Error: The tranche has already been closed")]
    TrancheClosed = 5,
    /// No record with that id
    #[error("Pool Error: Unknown id")]
    UnknownId = 6,
    /// Option period under one day
    #[error("Pool Error: The period is too short")]
    PeriodTooShort = 7,
    /// Option period over twelve weeks
    #[error("Pool Error: The period is too long")]
    PeriodTooLong = 8,
    /// Utilization cap would be exceeded
    #[error("Pool Error: The amount is too large")]
    AmountTooLarge = 9,
    /// Caller is neither holder nor approved operator of the option
    #[error("Pool Error: caller can't exercise this option")]
    NotEligible = 10,
    /// Exercise attempted at or after expiration
    #[error("Pool Error: The option has already expired")]
    OptionExpired = 11,
    /// Option is not Active
    #[error("Pool Error: The option with such an ID has already been exercised or expired")]
    OptionNotActive = 12,
    /// Unlock attempted at or before expiration
    #[error("Pool Error: The option has not expired yet")]
    OptionNotExpired = 13,
    /// Hedged lockup over sixty days
    #[error("Pool Error: The lockup period for hedged tranches is too long")]
    HedgedLockupTooLong = 14,
    /// Unhedged lockup over sixty days
    #[error("Pool Error: The lockup period for unhedged tranches is too long")]
    UnhedgedLockupTooLong = 15,
    /// Utilization rate outside [50, 100]
    #[error("Pool Error: Wrong utilization rate limitation value")]
    WrongUtilizationRate = 16,
    /// Collateralization ratio outside [30, 100]
    #[error("Pool Error: Wrong collateralization ratio value")]
    WrongCollateralizationRatio = 17,
    /// Hedge fee rate above 100
    #[error("Pool Error: Wrong hedge fee rate value")]
    WrongHedgeFeeRate = 18,
    /// Zero identity where a transfer destination is required
    #[error("Pool Error: Zero address")]
    ZeroAddress = 19,
    /// Caller lacks the role for an administrative operation
    #[error("caller is not the owner")]
    Unauthorized = 20,
    /// Zero lot count or micro amount
    #[error("Amount is zero")]
    ZeroAmount = 21,
    /// Lot supply would exceed MAX_SUPPLY
    #[error("Staking: Max supply exceeded")]
    MaxSupplyExceeded = 22,
    /// Staking lockup has not elapsed
    #[error("The action is suspended due to the lockup")]
    StakingLocked = 23,
    /// Holder owns fewer lots or micro units than requested
    #[error("Staking: Insufficient balance")]
    InsufficientStake = 24,
    /// Nothing to claim
    #[error("Zero profit")]
    ZeroProfit = 25,
    /// Rewards rate outside [MIN_REWARDS_RATE, MAX_REWARDS_RATE]
    #[error("Rewards: Wrong rewards rate")]
    WrongRewardsRate = 26,
    /// Reward already claimed for the option
    #[error("Rewards: The reward has already been claimed")]
    RewardAlreadyClaimed = 27,
    /// Daily reward budget exhausted
    #[error("Rewards: Daily limit is reached")]
    DailyLimitReached = 28,
    /// Token balance below the transfer amount
    #[error("Token: transfer amount exceeds balance")]
    InsufficientFunds = 29,
    /// Allowance below the transfer amount
    #[error("Token: transfer amount exceeds allowance")]
    InsufficientAllowance = 30,
    /// Pricing service rejected the request
    #[error("PriceCalculator: Period is out of range")]
    PricingFailed = 31,
    /// No price feed or calculator registered under the configured address
    #[error("Pool Error: Unknown external service")]
    UnknownService = 32,
    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow = 33,
    /// Staking lockup over sixty days
    #[error("Staking: The lockup period is too long")]
    StakingLockupTooLong = 34,
    /// Withdrawal would leave less collateral than is locked
    #[error("Pool Error: Not enough free funds in the pool")]
    NotEnoughFunds = 35,
}

impl From<PoolError> for ProgramError {
    fn from(e: PoolError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
