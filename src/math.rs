//! Pure pool and staking math.
//!
//! No identities, no clocks, no ledgers. Just arithmetic.
//! Every function returns `None` on overflow or an undefined quotient;
//! callers map that to `PoolError::Overflow`. All divisions floor, which
//! always rounds in favour of the pool.

use alloy_primitives::U256;

/// Share units minted per collateral unit for the first deposit of a class.
pub const INITIAL_RATE: u128 = 100_000_000_000_000_000_000; // 1e20

/// Fixed-point scale of the staking profit accumulators.
pub const ACCUMULATOR_SCALE: u128 = 1_000_000_000_000_000_000_000_000_000_000; // 1e30

/// Oracle prices carry eight decimals.
pub const PRICE_DECIMALS: u32 = 8;

/// Denominator of the rewards rate.
pub const REWARDS_RATE_SCALE: u128 = 1_000_000_000_000_000_000_000_000; // 1e24

/// Percentage of each distribution credited to micro-lot holders.
pub const MICRO_LOTS_PERCENT: u128 = 20;

// ═══════════════════════════════════════════════════════════════
// Tranche share math
// ═══════════════════════════════════════════════════════════════

/// Calculate share units for a deposit into one class.
///
/// # Arguments
/// * `class_share` - Outstanding share supply of the class
/// * `class_balance` - Collateral attributed to the class
/// * `amount` - Collateral being deposited
///
/// # Returns
/// * `Some(share)` - Share to mint (rounds DOWN, pool-favoring)
/// * `None` - Arithmetic overflow
///
/// # Invariant
/// Empty class (either side zero): `share = amount * INITIAL_RATE`.
/// Otherwise: `share = amount * class_share / class_balance`.
pub fn calc_share_for_deposit(class_share: U256, class_balance: u128, amount: u128) -> Option<U256> {
    let amount = U256::from(amount);
    if class_share.is_zero() || class_balance == 0 {
        amount.checked_mul(U256::from(INITIAL_RATE))
    } else {
        amount
            .checked_mul(class_share)?
            .checked_div(U256::from(class_balance))
    }
}

/// Calculate collateral redeemed by a share of one class.
///
/// # Returns
/// * `Some(amount)` - `share * class_balance / class_share` (rounds DOWN)
/// * `None` - Zero supply or overflow
///
/// # Invariant
/// Redeeming the whole supply returns exactly `class_balance`.
pub fn calc_redemption(share: U256, class_balance: u128, class_share: U256) -> Option<u128> {
    if class_share.is_zero() {
        return None;
    }
    let value = share
        .checked_mul(U256::from(class_balance))?
        .checked_div(class_share)?;
    u128::try_from(value).ok()
}

/// Remaining deposit headroom of a class.
///
/// Hedged deposits are capped by `max_hedged_deposit - hedged_balance`; unhedged
/// deposits by `max_deposit - hedged_balance - unhedged_balance`. Saturates at zero.
pub fn deposit_limit(
    hedged: bool,
    max_deposit: u128,
    max_hedged_deposit: u128,
    hedged_balance: u128,
    unhedged_balance: u128,
) -> u128 {
    if hedged {
        max_hedged_deposit.saturating_sub(hedged_balance)
    } else {
        max_deposit
            .saturating_sub(hedged_balance)
            .saturating_sub(unhedged_balance)
    }
}

// ═══════════════════════════════════════════════════════════════
// Option collateral math
// ═══════════════════════════════════════════════════════════════

fn pow10(exp: u8) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Collateral locked by a call: `amount * ratio / 100`.
pub fn call_locked_amount(amount: u128, collateralization_ratio: u64) -> Option<u128> {
    amount
        .checked_mul(collateralization_ratio as u128)?
        .checked_div(100)
}

/// Collateral locked by a put.
///
/// The notional is converted into the collateral asset through the strike:
/// `amount * ratio * strike * 10^token_decimals / 10^spot_decimals / 1e8 / 100`.
pub fn put_locked_amount(
    amount: u128,
    strike: u128,
    collateralization_ratio: u64,
    token_decimals: u8,
    spot_decimals: u8,
) -> Option<u128> {
    let value = U256::from(amount)
        .checked_mul(U256::from(collateralization_ratio))?
        .checked_mul(U256::from(strike))?
        .checked_mul(pow10(token_decimals)?)?
        .checked_div(pow10(spot_decimals)?)?
        .checked_div(pow10(PRICE_DECIMALS as u8)?)?
        .checked_div(U256::from(100u8))?;
    u128::try_from(value).ok()
}

/// Utilization gate for a new lock.
///
/// # Returns
/// * `Some(true)` if `(locked + to_lock) * 100 <= total_balance * max_utilization_rate`
/// * `None` on overflow
pub fn within_utilization(
    locked_amount: u128,
    to_lock: u128,
    total_balance: u128,
    max_utilization_rate: u64,
) -> Option<bool> {
    let lhs = U256::from(locked_amount)
        .checked_add(U256::from(to_lock))?
        .checked_mul(U256::from(100u8))?;
    let rhs = U256::from(total_balance).checked_mul(U256::from(max_utilization_rate))?;
    Some(lhs <= rhs)
}

/// Premium split between the hedge pool, hedged holders and unhedged holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PremiumSplit {
    /// Slice forwarded to the hedge pool
    pub hedge_fee: u128,
    /// Retained for hedged tranches
    pub hedge_premium: u128,
    /// Retained for unhedged tranches
    pub unhedge_premium: u128,
}

/// Split a premium across classes.
///
/// # Invariant
/// `hedge_fee + hedge_premium + unhedge_premium == premium`.
/// An empty pool attributes the whole premium to the unhedged class.
pub fn split_premium(
    premium: u128,
    hedged_balance: u128,
    total_balance: u128,
    hedge_fee_rate: u64,
) -> Option<PremiumSplit> {
    let hedged_total = if total_balance == 0 {
        0
    } else {
        let v = U256::from(premium)
            .checked_mul(U256::from(hedged_balance))?
            .checked_div(U256::from(total_balance))?;
        u128::try_from(v).ok()?
    };
    let hedge_fee = U256::from(hedged_total)
        .checked_mul(U256::from(hedge_fee_rate))?
        .checked_div(U256::from(100u8))?;
    let hedge_fee = u128::try_from(hedge_fee).ok()?;
    Some(PremiumSplit {
        hedge_fee,
        hedge_premium: hedged_total.checked_sub(hedge_fee)?,
        unhedge_premium: premium.checked_sub(hedged_total)?,
    })
}

/// Exercise value of a call: `(price - strike) * amount / price`, zero out of the money.
pub fn call_profit(amount: u128, strike: u128, price: u128) -> Option<u128> {
    if price <= strike {
        return Some(0);
    }
    let v = U256::from(price - strike)
        .checked_mul(U256::from(amount))?
        .checked_div(U256::from(price))?;
    u128::try_from(v).ok()
}

/// Exercise value of a put:
/// `(strike - price) * amount * 10^token_decimals / 10^spot_decimals / 1e8`,
/// zero out of the money.
pub fn put_profit(
    amount: u128,
    strike: u128,
    price: u128,
    token_decimals: u8,
    spot_decimals: u8,
) -> Option<u128> {
    if price >= strike {
        return Some(0);
    }
    let v = U256::from(strike - price)
        .checked_mul(U256::from(amount))?
        .checked_mul(pow10(token_decimals)?)?
        .checked_div(pow10(spot_decimals)?)?
        .checked_div(pow10(PRICE_DECIMALS as u8)?)?;
    u128::try_from(v).ok()
}

/// Split an exercise payout between classes pro rata to balances.
///
/// # Returns
/// (hedged_loss, unhedged_loss), summing to `payout`.
pub fn split_loss(payout: u128, hedged_balance: u128, total_balance: u128) -> Option<(u128, u128)> {
    if total_balance == 0 {
        return if payout == 0 { Some((0, 0)) } else { None };
    }
    let hedged = U256::from(payout)
        .checked_mul(U256::from(hedged_balance))?
        .checked_div(U256::from(total_balance))?;
    let hedged = u128::try_from(hedged).ok()?;
    Some((hedged, payout.checked_sub(hedged)?))
}

// ═══════════════════════════════════════════════════════════════
// Staking distribution math
// ═══════════════════════════════════════════════════════════════

/// Split an undistributed amount between lots and micro-lots.
///
/// # Returns
/// * `Some((lots, micro))` - 80/20 split; a class with no supply folds into the other
/// * `None` - neither class has supply, nothing may be accounted
pub fn split_staking_profit(undistributed: u128, lot_supply: u64, micro_supply: u128) -> Option<(u128, u128)> {
    match (lot_supply == 0, micro_supply == 0) {
        (true, true) => None,
        (true, false) => Some((0, undistributed)),
        (false, true) => Some((undistributed, 0)),
        (false, false) => {
            let micro = undistributed / 100 * MICRO_LOTS_PERCENT
                + undistributed % 100 * MICRO_LOTS_PERCENT / 100;
            Some((undistributed - micro, micro))
        }
    }
}

/// Accumulator step for distributing `amount` over `supply` units.
///
/// # Arguments
/// * `amount` - Profit to distribute, in token units
/// * `carry` - Scaled (1e30) remainder left by earlier steps of this accumulator
/// * `supply` - Units sharing the profit
///
/// # Returns
/// * `Some((increment, carry))` - per-unit increment and the new scaled remainder
/// * `None` - zero supply, or the remainder does not fit
///
/// # Invariant
/// `increment * supply + new_carry == amount * 1e30 + carry`, and `new_carry < supply`.
pub fn accumulator_step(amount: u128, carry: u128, supply: u128) -> Option<(U256, u128)> {
    if supply == 0 {
        return None;
    }
    let scaled = U256::from(amount)
        .checked_mul(U256::from(ACCUMULATOR_SCALE))?
        .checked_add(U256::from(carry))?;
    let supply = U256::from(supply);
    let increment = scaled.checked_div(supply)?;
    let remainder = scaled.checked_rem(supply)?;
    Some((increment, u128::try_from(remainder).ok()?))
}

/// Profit accrued by `units` since `snapshot`: `units * (current - snapshot) / 1e30`.
pub fn accrued_profit(units: u128, current: U256, snapshot: U256) -> Option<u128> {
    let delta = current.checked_sub(snapshot)?;
    let v = delta
        .checked_mul(U256::from(units))?
        .checked_div(U256::from(ACCUMULATOR_SCALE))?;
    u128::try_from(v).ok()
}

/// Buyer reward: `amount * rewards_rate / 1e24`.
pub fn reward_for(amount: u128, rewards_rate: u128) -> Option<u128> {
    let v = U256::from(amount)
        .checked_mul(U256::from(rewards_rate))?
        .checked_div(U256::from(REWARDS_RATE_SCALE))?;
    u128::try_from(v).ok()
}


// ═══════════════════════════════════════════════════════════════
// Kani Formal Verification
// ═══════════════════════════════════════════════════════════════
//
// 256-bit intermediates are out of reach for CBMC. Narrow-type mirrors of
// the share, premium and staking math live in kani-proofs/.
