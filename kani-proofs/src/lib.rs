//! Kani formal verification for option-liquidity pool math.
//!
//! ZERO dependencies. Pure Rust. CBMC-friendly.
//!
//! KEY DESIGN DECISION: Functions use u32 inputs / u64 intermediates.
//! The production code uses u128/U256, but the arithmetic properties
//! (conservation, monotonicity, bounds) are scale-invariant.
//! u32 keeps SAT formulas tractable for CBMC (<60s per proof).
//! The 1e20 initial share rate is scaled down to 100 for the same reason.
//!
//! Run all:   cargo kani --lib
//! Run one:   cargo kani --harness proof_first_depositor_exact

// ═══════════════════════════════════════════════════════════════
// Pool Math (u32/u64 mirror of option-liquidity/src/math.rs)
// ═══════════════════════════════════════════════════════════════

pub const INITIAL_RATE: u64 = 100;
pub const MICRO_LOTS_PERCENT: u32 = 20;

/// Share for a deposit. Empty class: `amount * INITIAL_RATE`. Otherwise pro-rata (floor).
pub fn calc_share_for_deposit(class_share: u64, class_balance: u32, amount: u32) -> Option<u64> {
    if class_share == 0 || class_balance == 0 {
        (amount as u64).checked_mul(INITIAL_RATE)
    } else {
        (amount as u64)
            .checked_mul(class_share)?
            .checked_div(class_balance as u64)
    }
}

/// Collateral for a share. floor(share * class_balance / class_share).
pub fn calc_redemption(share: u64, class_balance: u32, class_share: u64) -> Option<u32> {
    if class_share == 0 { return None; }
    let v = (share as u128)
        .checked_mul(class_balance as u128)?
        .checked_div(class_share as u128)?;
    u32::try_from(v).ok()
}

/// Premium split: (hedge_fee, hedge_premium, unhedge_premium).
pub fn split_premium(premium: u32, hedged_balance: u32, total_balance: u32, fee_rate: u32) -> Option<(u32, u32, u32)> {
    let hedged_total = if total_balance == 0 {
        0
    } else {
        ((premium as u64) * (hedged_balance as u64) / (total_balance as u64)) as u32
    };
    let fee = ((hedged_total as u64) * (fee_rate as u64) / 100) as u32;
    Some((fee, hedged_total.checked_sub(fee)?, premium.checked_sub(hedged_total)?))
}

/// Exercise loss split: (hedged, unhedged).
pub fn split_loss(payout: u32, hedged_balance: u32, total_balance: u32) -> Option<(u32, u32)> {
    if total_balance == 0 {
        return if payout == 0 { Some((0, 0)) } else { None };
    }
    let hedged = ((payout as u64) * (hedged_balance as u64) / (total_balance as u64)) as u32;
    Some((hedged, payout.checked_sub(hedged)?))
}

/// Call exercise value: floor((price - strike) * amount / price).
pub fn call_profit(amount: u32, strike: u32, price: u32) -> Option<u32> {
    if price <= strike { return Some(0); }
    let v = ((price - strike) as u64)
        .checked_mul(amount as u64)?
        .checked_div(price as u64)?;
    u32::try_from(v).ok()
}

/// 80/20 staking split: (lots, micro). None when nobody stakes.
pub fn split_staking_profit(amount: u32, lots: u32, micro: u32) -> Option<(u32, u32)> {
    match (lots == 0, micro == 0) {
        (true, true) => None,
        (true, false) => Some((0, amount)),
        (false, true) => Some((amount, 0)),
        (false, false) => {
            let m = amount / 100 * MICRO_LOTS_PERCENT + amount % 100 * MICRO_LOTS_PERCENT / 100;
            Some((amount - m, m))
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// KANI PROOFS
// ═══════════════════════════════════════════════════════════════

#[cfg(kani)]
mod proofs {
    use super::*;

    // ── 1. Conservation ──

    /// Deposit→redeem roundtrip: can't get back more than deposited.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_deposit_withdraw_no_inflation() {
        let share: u64 = kani::any();
        let balance: u32 = kani::any();
        let amount: u32 = kani::any();
        kani::assume(share > 0 && share < 2_000);
        kani::assume(balance > 0 && balance < 20);
        kani::assume(amount > 0 && amount < 20);

        let minted = match calc_share_for_deposit(share, balance, amount) {
            Some(s) if s > 0 => s,
            _ => return,
        };
        let back = match calc_redemption(minted, balance + amount, share + minted) {
            Some(v) => v, None => return,
        };
        assert!(back <= amount);
    }

    /// First depositor: exact roundtrip.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_first_depositor_exact() {
        let amount: u32 = kani::any();
        kani::assume(amount > 0 && amount < 100);

        let share = calc_share_for_deposit(0, 0, amount).unwrap();
        assert_eq!(share, amount as u64 * INITIAL_RATE);
        assert_eq!(calc_redemption(share, amount, share), Some(amount));
    }

    /// Two depositors of one class both withdraw: total_out ≤ total_in.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_two_depositors_conservation() {
        let a: u32 = kani::any();
        let b: u32 = kani::any();
        kani::assume(a > 0 && a < 100);
        kani::assume(b > 0 && b < 100);

        let a_share = calc_share_for_deposit(0, 0, a).unwrap();
        let b_share = match calc_share_for_deposit(a_share, a, b) {
            Some(s) if s > 0 => s, _ => return,
        };
        let supply = a_share + b_share;
        let balance = a + b;

        let a_back = match calc_redemption(a_share, balance, supply) {
            Some(v) => v, None => return,
        };
        let b_back = match calc_redemption(b_share, balance - a_back, supply - a_share) {
            Some(v) => v, None => return,
        };
        assert!((a_back as u64) + (b_back as u64) <= (a as u64) + (b as u64));
    }

    // ── 2. Arithmetic Safety ──

    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_redemption_no_panic() {
        let _ = calc_redemption(kani::any(), kani::any(), kani::any());
    }

    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_call_profit_no_panic() {
        let _ = call_profit(kani::any(), kani::any(), kani::any());
    }

    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_staking_split_no_panic() {
        let _ = split_staking_profit(kani::any(), kani::any(), kani::any());
    }

    // ── 3. Splits ──

    /// Premium split accounts for every unit.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_premium_split_sums() {
        let p: u32 = kani::any();
        let h: u32 = kani::any();
        let u: u32 = kani::any();
        let r: u32 = kani::any();
        kani::assume(p < 1_000 && h < 100 && u < 100 && r <= 100);

        let (fee, hp, up) = split_premium(p, h, h + u, r).unwrap();
        assert_eq!(fee + hp + up, p);
    }

    /// Loss split accounts for every unit.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_loss_split_sums() {
        let payout: u32 = kani::any();
        let h: u32 = kani::any();
        let u: u32 = kani::any();
        kani::assume(payout < 1_000 && h < 100 && u > 0 && u < 100);

        let (hl, ul) = split_loss(payout, h, h + u).unwrap();
        assert_eq!(hl + ul, payout);
    }

    /// Staking split conserves the amount; micro-lots never exceed 20%.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_staking_split_sums() {
        let amount: u32 = kani::any();
        let lots: u32 = kani::any();
        let micro: u32 = kani::any();
        kani::assume(amount < 10_000);

        match split_staking_profit(amount, lots, micro) {
            None => assert!(lots == 0 && micro == 0),
            Some((l, m)) => {
                assert_eq!(l + m, amount);
                if lots > 0 && micro > 0 {
                    assert!(m * 5 <= amount);
                }
            }
        }
    }

    // ── 4. Exercise Bounds ──

    /// Call payout ≤ notional.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_call_profit_bounded() {
        let amount: u32 = kani::any();
        let strike: u32 = kani::any();
        let price: u32 = kani::any();
        kani::assume(amount < 1_000 && strike < 1_000 && price < 1_000);

        if let Some(p) = call_profit(amount, strike, price) {
            assert!(p <= amount);
        }
    }

    /// Out of the money pays nothing.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_call_otm_zero() {
        let amount: u32 = kani::any();
        let strike: u32 = kani::any();
        let price: u32 = kani::any();
        kani::assume(price <= strike);
        assert_eq!(call_profit(amount, strike, price), Some(0));
    }

    // ── 5. Monotonicity ──

    /// Larger deposit → ≥ share.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_larger_deposit_more_share() {
        let s: u64 = kani::any();
        let b: u32 = kani::any();
        let sm: u32 = kani::any();
        let lg: u32 = kani::any();
        kani::assume(s > 0 && s < 100);
        kani::assume(b > 0 && b < 100);
        kani::assume(sm > 0 && sm < 50);
        kani::assume(lg > sm && lg < 100);

        match (calc_share_for_deposit(s, b, sm), calc_share_for_deposit(s, b, lg)) {
            (Some(a), Some(c)) => assert!(c >= a),
            _ => {}
        }
    }

    /// Full supply redeems exactly the class balance.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_full_redemption_exact() {
        let s: u64 = kani::any();
        let b: u32 = kani::any();
        kani::assume(s > 0 && s < 1_000);
        kani::assume(b < 1_000);
        assert_eq!(calc_redemption(s, b, s), Some(b));
    }

    // ── 6. Zero-input Boundaries ──

    /// Zero share redeems nothing.
    #[kani::proof]
    #[kani::unwind(33)]
    fn proof_zero_share_zero_collateral() {
        let s: u64 = kani::any();
        let b: u32 = kani::any();
        kani::assume(s > 0 && s < 100);
        kani::assume(b < 100);
        assert_eq!(calc_redemption(0, b, s), Some(0));
    }
}
