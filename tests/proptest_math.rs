//! Property-based tests (proptest) for pool and staking math. Complements
//! the Kani proofs, which cover the same properties on narrow types.
//!
//! These run against the production functions across production-scale
//! ranges (18-decimal collateral, 1e20 share rate, 1e30 accumulators).

use alloy_primitives::U256;
use option_liquidity::math::{
    accrued_profit, accumulator_step, calc_redemption, calc_share_for_deposit, call_locked_amount,
    call_profit, deposit_limit, put_profit, reward_for, split_loss, split_premium, split_staking_profit,
    within_utilization, ACCUMULATOR_SCALE, INITIAL_RATE, REWARDS_RATE_SCALE,
};
use proptest::prelude::*;

const MAX_AMOUNT: u128 = 1_000_000_000 * 1_000_000_000_000_000_000; // 1e9 tokens, 18 decimals

proptest! {
    // ── Conservation ──

    #[test]
    fn prop_deposit_withdraw_no_inflation(
        class_balance in 1u128..MAX_AMOUNT,
        share_factor in 1u128..1_000_000u128,
        amount in 1u128..MAX_AMOUNT,
    ) {
        let class_share = U256::from(class_balance) * U256::from(share_factor);
        let minted = calc_share_for_deposit(class_share, class_balance, amount).unwrap();
        prop_assume!(!minted.is_zero());
        let back = calc_redemption(minted, class_balance + amount, class_share + minted).unwrap();
        prop_assert!(back <= amount, "Got back {} > deposited {}", back, amount);
    }

    #[test]
    fn prop_first_depositor_exact(amount in 1u128..MAX_AMOUNT) {
        let share = calc_share_for_deposit(U256::ZERO, 0, amount).unwrap();
        prop_assert_eq!(share, U256::from(amount) * U256::from(INITIAL_RATE));
        let back = calc_redemption(share, amount, share).unwrap();
        prop_assert_eq!(back, amount);
    }

    #[test]
    fn prop_full_supply_redeems_full_balance(
        balance in 0u128..MAX_AMOUNT,
        supply in 1u128..u128::MAX,
    ) {
        let supply = U256::from(supply);
        prop_assert_eq!(calc_redemption(supply, balance, supply), Some(balance));
    }

    #[test]
    fn prop_redemptions_never_exceed_balance(
        balance in 0u128..MAX_AMOUNT,
        a in 1u128..1_000_000_000_000u128,
        b in 1u128..1_000_000_000_000u128,
    ) {
        let supply = U256::from(a + b);
        let ra = calc_redemption(U256::from(a), balance, supply).unwrap();
        let rb = calc_redemption(U256::from(b), balance, supply).unwrap();
        prop_assert!(ra + rb <= balance);
    }

    // ── Fairness ──

    #[test]
    fn prop_larger_deposit_more_share(
        class_balance in 1u128..MAX_AMOUNT,
        small in 1u128..MAX_AMOUNT / 2,
        extra in 1u128..MAX_AMOUNT / 2,
    ) {
        let class_share = U256::from(class_balance) * U256::from(INITIAL_RATE);
        let s1 = calc_share_for_deposit(class_share, class_balance, small).unwrap();
        let s2 = calc_share_for_deposit(class_share, class_balance, small + extra).unwrap();
        prop_assert!(s2 >= s1);
    }

    #[test]
    fn prop_deposit_limit_bounded_by_caps(
        hedged in any::<bool>(),
        max in 0u128..MAX_AMOUNT,
        max_hedged in 0u128..MAX_AMOUNT,
        hb in 0u128..MAX_AMOUNT,
        ub in 0u128..MAX_AMOUNT,
    ) {
        let limit = deposit_limit(hedged, max, max_hedged, hb, ub);
        if hedged {
            prop_assert!(limit <= max_hedged);
            prop_assert!(hb + limit <= max_hedged.max(hb));
        } else {
            prop_assert!(limit <= max);
            prop_assert!(hb + ub + limit <= max.max(hb + ub));
        }
    }

    // ── Option collateral ──

    #[test]
    fn prop_call_lock_never_exceeds_notional(amount in 0u128..MAX_AMOUNT, ratio in 50u64..=100) {
        let locked = call_locked_amount(amount, ratio).unwrap();
        prop_assert!(locked <= amount);
        prop_assert!(locked * 2 + 1 >= amount);
    }

    #[test]
    fn prop_utilization_gate_is_monotone(
        locked in 0u128..MAX_AMOUNT,
        to_lock in 0u128..MAX_AMOUNT,
        total in 0u128..MAX_AMOUNT,
        rate in 50u64..=100,
    ) {
        let ok = within_utilization(locked, to_lock, total, rate).unwrap();
        if ok {
            // a smaller lock always passes where a larger one did
            prop_assert!(within_utilization(locked, to_lock / 2, total, rate).unwrap());
        }
    }

    #[test]
    fn prop_premium_split_sums(
        premium in 0u128..MAX_AMOUNT,
        hedged_balance in 0u128..MAX_AMOUNT,
        unhedged_balance in 0u128..MAX_AMOUNT,
        fee_rate in 0u64..=100,
    ) {
        let total = hedged_balance + unhedged_balance;
        let s = split_premium(premium, hedged_balance, total, fee_rate).unwrap();
        prop_assert_eq!(s.hedge_fee + s.hedge_premium + s.unhedge_premium, premium);
        if hedged_balance == 0 {
            prop_assert_eq!(s.unhedge_premium, premium);
        }
    }

    // ── Exercise ──

    #[test]
    fn prop_call_profit_bounded_by_amount(
        amount in 0u128..MAX_AMOUNT,
        strike in 1u128..1_000_000_000_000_000u128,
        price in 1u128..1_000_000_000_000_000u128,
    ) {
        let profit = call_profit(amount, strike, price).unwrap();
        prop_assert!(profit <= amount);
        if price <= strike {
            prop_assert_eq!(profit, 0);
        }
    }

    #[test]
    fn prop_put_out_of_money_is_zero(
        amount in 0u128..MAX_AMOUNT,
        strike in 1u128..1_000_000_000_000u128,
        above in 0u128..1_000_000_000_000u128,
    ) {
        prop_assert_eq!(put_profit(amount, strike, strike + above, 6, 18), Some(0));
    }

    #[test]
    fn prop_loss_split_sums(
        payout in 0u128..MAX_AMOUNT,
        hedged_balance in 0u128..MAX_AMOUNT,
        unhedged_balance in 1u128..MAX_AMOUNT,
    ) {
        let total = hedged_balance + unhedged_balance;
        let (h, u) = split_loss(payout, hedged_balance, total).unwrap();
        prop_assert_eq!(h + u, payout);
        prop_assert!(h <= payout);
    }

    // ── Staking ──

    #[test]
    fn prop_staking_split_conserves(
        amount in 0u128..MAX_AMOUNT,
        lots in 0u64..1_500,
        micro in 0u128..MAX_AMOUNT,
    ) {
        match split_staking_profit(amount, lots, micro) {
            None => prop_assert!(lots == 0 && micro == 0),
            Some((l, m)) => {
                prop_assert_eq!(l + m, amount);
                if lots > 0 && micro > 0 {
                    // micro-lots receive 20%, floored
                    prop_assert_eq!(m, amount * 20 / 100);
                }
            }
        }
    }

    #[test]
    fn prop_accumulator_never_overpays(
        amount in 0u128..MAX_AMOUNT,
        supply in 1u128..MAX_AMOUNT,
        units in 0u128..MAX_AMOUNT,
    ) {
        prop_assume!(units <= supply);
        let (inc, _) = accumulator_step(amount, 0, supply).unwrap();
        let paid = accrued_profit(units, inc, U256::ZERO).unwrap();
        // units * floor(amount * S / supply) / S <= units * amount / supply
        prop_assert!(U256::from(paid) * U256::from(supply) <= U256::from(units) * U256::from(amount));
        let everyone = accrued_profit(supply, inc, U256::ZERO).unwrap();
        prop_assert!(everyone <= amount);
    }

    #[test]
    fn prop_accumulator_carry_is_exact(
        first in 0u128..MAX_AMOUNT,
        second in 0u128..MAX_AMOUNT,
        supply in 1u128..MAX_AMOUNT,
    ) {
        let (a, carry) = accumulator_step(first, 0, supply).unwrap();
        let (b, carry) = accumulator_step(second, carry, supply).unwrap();
        prop_assert!(carry < supply);
        let scale = U256::from(ACCUMULATOR_SCALE);
        let total = U256::from(first) + U256::from(second);
        prop_assert_eq!((a + b) * U256::from(supply) + U256::from(carry), total * scale);

        // all holders together fall short by less than one unit
        let everyone = accrued_profit(supply, a + b, U256::ZERO).unwrap();
        prop_assert!(U256::from(everyone) <= total);
        prop_assert!(U256::from(everyone) + U256::from(1u8) >= total);
    }

    #[test]
    fn prop_accrual_ignores_settled_part(
        units in 0u128..MAX_AMOUNT,
        snapshot in 0u128..u128::MAX / 2,
        delta in 0u128..ACCUMULATOR_SCALE,
    ) {
        let snap = U256::from(snapshot);
        let now = snap + U256::from(delta);
        let full = accrued_profit(units, now, U256::ZERO).unwrap_or(u128::MAX);
        let partial = accrued_profit(units, now, snap).unwrap();
        prop_assert!(partial <= full);
    }

    // ── Rewards ──

    #[test]
    fn prop_reward_monotone_in_rate(
        amount in 0u128..MAX_AMOUNT,
        r1 in 1_000_000_000u128..REWARDS_RATE_SCALE,
        r2 in 1_000_000_000u128..REWARDS_RATE_SCALE,
    ) {
        let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
        let a = reward_for(amount, lo).unwrap();
        let b = reward_for(amount, hi).unwrap();
        prop_assert!(a <= b);
        prop_assert!(b <= amount);
    }
}
