//! Staking ledger scenarios: lots, micro-lots, distribution and claims.

mod common;

use alloy_primitives::U256;
use common::*;
use option_liquidity::error::PoolError;
use option_liquidity::event::Event;
use option_liquidity::pool::OptionRequest;
use option_liquidity::staking::{MAX_SUPPLY, STAKING_LOT_PRICE};

const LOT: u128 = STAKING_LOT_PRICE;

/// Profit of 10000 units at 8 decimals.
const TEN_K: u128 = 10_000 * 100_000_000;

fn staking_address(m: &Market) -> solana_program::pubkey::Pubkey {
    m.protocol.staking().address()
}

/// Simulate settlement fees landing on the staking account.
fn land_profit(m: &mut Market, amount: u128) {
    let staking = staking_address(m);
    m.protocol.collateral_mut().mint_to(&staking, amount).unwrap();
}

// ═══════════════════════════════════════════════════════════════
// Distribution
// ═══════════════════════════════════════════════════════════════

#[test]
fn test_micro_lot_and_lot_share_profit_eighty_twenty() {
    let mut m = call_market();
    m.fund_governance(&alice(), 1_000);
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_micro_lot(&at(START), &alice(), 1_000).unwrap();
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();

    land_profit(&mut m, 100_000);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(100_000));

    let staking = m.protocol.staking();
    assert_eq!(staking.profit_of(&alice()), Ok(20_000));
    assert_eq!(staking.profit_of(&bob()), Ok(80_000));
    assert_eq!(staking.state().accounted_balance, 100_000);
    assert_eq!(staking.state().micro_lots_profits, 20_000);
    assert_eq!(m.protocol.take_events(), vec![Event::Profit { amount: 100_000 }]);

    assert_eq!(m.protocol.claim_profits(&alice()), Ok(20_000));
    assert_eq!(m.protocol.claim_profits(&bob()), Ok(80_000));
    assert_eq!(m.collateral_of(&alice()), 20_000);
    assert_eq!(m.collateral_of(&bob()), 80_000);
    assert_eq!(m.protocol.staking().state().accounted_balance, 0);
}

#[test]
fn test_two_lot_holders_split_evenly() {
    let mut m = call_market();
    m.fund_governance(&alice(), LOT);
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &alice(), 1).unwrap();
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    assert_eq!(m.governance_of(&staking_address(&m)), 2 * LOT);

    land_profit(&mut m, TEN_K);
    m.protocol.distribute_unrealized_rewards().unwrap();
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(TEN_K / 2));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(TEN_K / 2));
}

#[test]
fn test_distribute_twice_is_a_no_op() {
    let mut m = call_market();
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    land_profit(&mut m, 1_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    let accumulator = m.protocol.staking().state().total_profit();
    m.protocol.take_events();

    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(0));
    assert_eq!(m.protocol.staking().state().total_profit(), accumulator);
    assert!(m.protocol.take_events().is_empty());
}

#[test]
fn test_distribute_without_stakers_keeps_profit_for_later() {
    let mut m = call_market();
    land_profit(&mut m, 5_000);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(0));
    let state = m.protocol.staking().state();
    assert_eq!(state.accounted_balance, 0);
    assert_eq!(state.total_profit(), U256::ZERO);
    assert!(m.protocol.take_events().is_empty());

    // the first staker picks it up at the next distribution
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(5_000));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(5_000));
}

#[test]
fn test_buy_does_not_distribute() {
    let mut m = call_market();
    m.fund_governance(&alice(), LOT);
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    land_profit(&mut m, 1_000);

    m.protocol.buy_staking_lot(&at(START), &alice(), 1).unwrap();
    assert!(m.protocol.take_events().is_empty());
    assert_eq!(m.protocol.staking().state().accounted_balance, 0);
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(0));

    // whoever holds lots when distribution runs shares the profit
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(1_000));
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(500));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(500));
}

#[test]
fn test_buying_more_settles_earlier_profit() {
    let mut m = call_market();
    m.fund_governance(&alice(), 2 * LOT);
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &alice(), 1).unwrap();
    land_profit(&mut m, 10_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(10_000));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(0));

    // the second lot starts from the current accumulator
    m.protocol.buy_staking_lot(&at(START), &alice(), 1).unwrap();
    assert_eq!(m.protocol.staking().account(&alice()).unclaimed, 10_000);

    land_profit(&mut m, 30_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(30_000));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(10_000));
}

#[test]
fn test_rounding_remainder_carries_to_next_distribution() {
    let mut m = call_market();
    for who in [alice(), bob(), carol()] {
        m.fund_governance(&who, LOT);
        m.protocol.buy_staking_lot(&at(START), &who, 1).unwrap();
    }
    land_profit(&mut m, 100);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(100));
    assert_eq!(m.protocol.staking().state().accounted_balance, 100);
    assert_eq!(m.protocol.staking().state().lot_carry, 1);
    assert_eq!(m.protocol.take_events(), vec![Event::Profit { amount: 100 }]);
    for who in [alice(), bob(), carol()] {
        assert_eq!(m.protocol.staking().profit_of(&who), Ok(33));
    }

    // the carried remainder completes the third of a unit each holder was owed
    land_profit(&mut m, 2);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(2));
    assert_eq!(m.protocol.staking().state().lot_carry, 0);
    for who in [alice(), bob(), carol()] {
        assert_eq!(m.protocol.staking().profit_of(&who), Ok(34));
    }
    assert_eq!(m.protocol.staking().state().accounted_balance, 102);
}

#[test]
fn test_sub_unit_share_is_paid_once_it_adds_up() {
    let mut m = call_market();
    for who in [alice(), bob(), carol()] {
        m.fund_governance(&who, LOT);
        m.protocol.buy_staking_lot(&at(START), &who, 1).unwrap();
    }
    land_profit(&mut m, 1);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(1));
    assert!(m.protocol.staking().state().total_profit() > U256::ZERO);
    assert_eq!(m.protocol.staking().profit_of(&carol()), Ok(0));
    assert_eq!(m.protocol.claim_profits(&carol()), Err(PoolError::ZeroProfit));

    land_profit(&mut m, 2);
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(2));
    for who in [alice(), bob(), carol()] {
        assert_eq!(m.protocol.staking().profit_of(&who), Ok(1));
    }
    assert_eq!(m.protocol.claim_profits(&carol()), Ok(1));
}

#[test]
fn test_fees_from_option_sales_reach_stakers() {
    let mut m = call_market();
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();

    m.fund(&alice(), 1_000_000);
    m.fund(&carol(), 20_000);
    m.protocol
        .provide(&at(START), &alice(), &alice(), 1_000_000, false, U256::ZERO)
        .unwrap();
    let req = OptionRequest {
        holder: carol(),
        period: (10 * DAY) as u64,
        amount: 1_000_000,
        strike: 0,
    };
    m.protocol.sell_option(&at(START), &carol(), &req).unwrap();

    // nothing is claimable until the fee is distributed
    assert_eq!(m.protocol.claim_profits(&bob()), Err(PoolError::ZeroProfit));
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(10_000));
    assert_eq!(m.protocol.claim_profits(&bob()), Ok(10_000));
    assert_eq!(m.collateral_of(&bob()), 10_000);
    assert_eq!(
        m.protocol.take_events().last(),
        Some(&Event::Claim { account: bob(), amount: 10_000 })
    );
}

// ═══════════════════════════════════════════════════════════════
// Lots
// ═══════════════════════════════════════════════════════════════

#[test]
fn test_lot_lockup_and_refund() {
    let mut m = call_market();
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    assert_eq!(m.governance_of(&bob()), 0);

    assert_eq!(
        m.protocol.sell_staking_lot(&at(START + DAY - 1), &bob(), 1),
        Err(PoolError::StakingLocked)
    );
    m.protocol.sell_staking_lot(&at(START + DAY), &bob(), 1).unwrap();
    assert_eq!(m.governance_of(&bob()), LOT);
    assert_eq!(m.protocol.staking().lots_of(&bob()), 0);
    assert_eq!(m.protocol.staking().state().total_lots, 0);
}

#[test]
fn test_sell_keeps_accrued_profit_claimable() {
    let mut m = call_market();
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    land_profit(&mut m, 7_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    m.protocol.sell_staking_lot(&at(START + DAY), &bob(), 1).unwrap();
    assert_eq!(m.protocol.staking().account(&bob()).unclaimed, 7_000);
    assert_eq!(m.protocol.claim_profits(&bob()), Ok(7_000));
}

#[test]
fn test_lot_count_bounds() {
    let mut m = call_market();
    assert_eq!(
        m.protocol.buy_staking_lot(&at(START), &bob(), 0),
        Err(PoolError::ZeroAmount)
    );
    assert_eq!(
        m.protocol.buy_staking_lot(&at(START), &bob(), MAX_SUPPLY + 1),
        Err(PoolError::MaxSupplyExceeded)
    );
    assert_eq!(
        m.protocol.buy_staking_lot(&at(START), &bob(), 1),
        Err(PoolError::InsufficientAllowance)
    );
    assert_eq!(
        m.protocol.sell_staking_lot(&at(START + DAY), &bob(), 1),
        Err(PoolError::InsufficientStake)
    );
}

#[test]
fn test_transfer_lots_moves_future_profit_only() {
    let mut m = call_market();
    m.fund_governance(&alice(), 2 * LOT);
    m.protocol.buy_staking_lot(&at(START), &alice(), 2).unwrap();
    land_profit(&mut m, 10_000);

    assert_eq!(
        m.protocol.transfer_lots(&at(START), &alice(), &bob(), 1),
        Err(PoolError::StakingLocked)
    );
    m.protocol.distribute_unrealized_rewards().unwrap();
    m.protocol.transfer_lots(&at(START + DAY), &alice(), &bob(), 1).unwrap();
    assert_eq!(m.protocol.staking().lots_of(&alice()), 1);
    assert_eq!(m.protocol.staking().lots_of(&bob()), 1);
    assert_eq!(m.protocol.staking().state().total_lots, 2);

    land_profit(&mut m, 10_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(15_000));
    assert_eq!(m.protocol.staking().profit_of(&bob()), Ok(5_000));

    assert_eq!(
        m.protocol.transfer_lots(&at(START + DAY), &bob(), &alice(), 2),
        Err(PoolError::InsufficientStake)
    );
}

// ═══════════════════════════════════════════════════════════════
// Micro-lots
// ═══════════════════════════════════════════════════════════════

#[test]
fn test_micro_lot_round_trip() {
    let mut m = call_market();
    m.fund_governance(&alice(), 5_000);
    m.protocol.buy_micro_lot(&at(START), &alice(), 5_000).unwrap();
    assert_eq!(m.protocol.staking().micro_lots_of(&alice()), 5_000);

    assert_eq!(
        m.protocol.sell_micro_lot(&at(START + 1), &alice(), 1_000),
        Err(PoolError::StakingLocked)
    );
    assert_eq!(
        m.protocol.sell_micro_lot(&at(START + DAY), &alice(), 6_000),
        Err(PoolError::InsufficientStake)
    );
    m.protocol.sell_micro_lot(&at(START + DAY), &alice(), 1_000).unwrap();
    assert_eq!(m.governance_of(&alice()), 1_000);
    assert_eq!(m.protocol.staking().state().total_micro_supply, 4_000);
}

#[test]
fn test_micro_only_receives_everything() {
    let mut m = call_market();
    m.fund_governance(&alice(), 1);
    m.protocol.buy_micro_lot(&at(START), &alice(), 1).unwrap();
    land_profit(&mut m, 999);
    m.protocol.distribute_unrealized_rewards().unwrap();
    assert_eq!(m.protocol.staking().profit_of(&alice()), Ok(999));
}

// ═══════════════════════════════════════════════════════════════
// Claims and knobs
// ═══════════════════════════════════════════════════════════════

#[test]
fn test_claim_without_profit() {
    let mut m = call_market();
    assert_eq!(m.protocol.claim_profits(&alice()), Err(PoolError::ZeroProfit));
}

#[test]
fn test_claim_is_paid_once() {
    let mut m = call_market();
    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    land_profit(&mut m, 4_000);
    m.protocol.distribute_unrealized_rewards().unwrap();
    assert_eq!(m.protocol.claim_profits(&bob()), Ok(4_000));
    assert_eq!(m.protocol.claim_profits(&bob()), Err(PoolError::ZeroProfit));
    assert_eq!(m.protocol.distribute_unrealized_rewards(), Ok(0));
}

#[test]
fn test_lockup_periods_are_owner_only() {
    let mut m = call_market();
    assert_eq!(
        m.protocol.set_staking_lockup_periods(&alice(), 0, 0),
        Err(PoolError::Unauthorized)
    );
    assert_eq!(
        m.protocol
            .set_staking_lockup_periods(&deployer(), 61 * DAY as u64, 0),
        Err(PoolError::StakingLockupTooLong)
    );
    m.protocol.set_staking_lockup_periods(&deployer(), 0, 0).unwrap();

    m.fund_governance(&bob(), LOT);
    m.protocol.buy_staking_lot(&at(START), &bob(), 1).unwrap();
    m.protocol.sell_staking_lot(&at(START), &bob(), 1).unwrap();
}
