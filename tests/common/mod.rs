//! Shared market fixture for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use option_liquidity::external::{FlatRatePricer, ManualPriceFeed};
use option_liquidity::protocol::{MarketConfig, Protocol};
use option_liquidity::state::OptionKind;
use option_liquidity::token::TokenLedger;
use solana_program::{clock::Clock, pubkey::Pubkey};

pub const DAY: i64 = 86_400;
pub const START: i64 = 1_700_000_000;

/// 2000 USD with 8 decimals.
pub const SPOT: u128 = 2_000 * 100_000_000;

pub fn key(b: u8) -> Pubkey {
    Pubkey::new_from_array([b; 32])
}

pub fn deployer() -> Pubkey {
    key(1)
}

pub fn alice() -> Pubkey {
    key(2)
}

pub fn bob() -> Pubkey {
    key(3)
}

pub fn carol() -> Pubkey {
    key(4)
}

pub fn at(t: i64) -> Clock {
    Clock {
        unix_timestamp: t,
        ..Clock::default()
    }
}

pub struct Market {
    pub protocol: Protocol,
    pub feed: Arc<ManualPriceFeed>,
}

/// premium = 0.1% of notional per day, settlement fee = 1% of notional
pub fn pricer() -> FlatRatePricer {
    FlatRatePricer {
        premium_bps_per_day: 10,
        settlement_fee_bps: 100,
    }
}

pub fn market(kind: OptionKind) -> Market {
    let feed = Arc::new(ManualPriceFeed::new(SPOT));
    let config = MarketConfig {
        program_id: key(0xAA),
        market: key(0xBB),
        kind,
        collateral_decimals: 18,
        price_feed: key(50),
        price_calculator: key(51),
    };
    let protocol = Protocol::new(&deployer(), config, feed.clone(), Arc::new(pricer())).unwrap();
    Market { protocol, feed }
}

pub fn call_market() -> Market {
    market(OptionKind::Call)
}

impl Market {
    pub fn pool_address(&self) -> Pubkey {
        self.protocol.pool().address()
    }

    /// Mint collateral to `who` and approve the pool for all of it.
    pub fn fund(&mut self, who: &Pubkey, amount: u128) {
        let pool = self.pool_address();
        let bank = self.protocol.collateral_mut();
        bank.mint_to(who, amount).unwrap();
        bank.approve(who, &pool, u128::MAX);
    }

    /// Mint governance tokens to `who` and approve the staking account.
    pub fn fund_governance(&mut self, who: &Pubkey, amount: u128) {
        let staking = self.protocol.staking().address();
        let bank = self.protocol.governance_mut();
        bank.mint_to(who, amount).unwrap();
        bank.approve(who, &staking, u128::MAX);
    }

    pub fn collateral_of(&self, who: &Pubkey) -> u128 {
        self.protocol.collateral().balance_of(who)
    }

    pub fn governance_of(&self, who: &Pubkey) -> u128 {
        self.protocol.governance().balance_of(who)
    }
}
