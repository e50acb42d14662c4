//! Pricing service and spot oracle seams.

use std::sync::RwLock;

use solana_program::msg;

use crate::error::PoolError;
use crate::state::{DAY, MAX_OPTION_PERIOD, MIN_OPTION_PERIOD};

/// Latest spot price, 8 decimals. Re-read on every sale and exercise.
pub trait PriceOracle {
    fn latest_price(&self) -> u128;
}

/// Quote for an option sale.
pub trait PriceCalculator {
    /// # Returns
    /// `(settlement_fee, premium)`, both in collateral units.
    fn calculate_total_premium(
        &self,
        period: u64,
        amount: u128,
        strike: u128,
    ) -> Result<(u128, u128), PoolError>;
}

/// Oracle whose price is pushed by a keeper.
#[derive(Debug)]
pub struct ManualPriceFeed {
    price: RwLock<u128>,
}

impl ManualPriceFeed {
    pub fn new(price: u128) -> Self {
        Self {
            price: RwLock::new(price),
        }
    }

    pub fn set_price(&self, price: u128) {
        let mut guard = match self.price.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = price;
    }
}

impl PriceOracle for ManualPriceFeed {
    fn latest_price(&self) -> u128 {
        match self.price.read() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Linear-in-time premium with a flat settlement fee.
///
/// `premium = amount * premium_bps_per_day * period / (10_000 * DAY)`,
/// `settlement_fee = amount * settlement_fee_bps / 10_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRatePricer {
    pub premium_bps_per_day: u64,
    pub settlement_fee_bps: u64,
}

impl PriceCalculator for FlatRatePricer {
    fn calculate_total_premium(
        &self,
        period: u64,
        amount: u128,
        _strike: u128,
    ) -> Result<(u128, u128), PoolError> {
        if !(MIN_OPTION_PERIOD..=MAX_OPTION_PERIOD).contains(&period) {
            msg!("Pricer: period {} out of range", period);
            return Err(PoolError::PricingFailed);
        }
        let premium = amount
            .checked_mul(self.premium_bps_per_day as u128)
            .and_then(|v| v.checked_mul(period as u128))
            .map(|v| v / (10_000 * DAY as u128))
            .ok_or(PoolError::Overflow)?;
        let fee = amount
            .checked_mul(self.settlement_fee_bps as u128)
            .map(|v| v / 10_000)
            .ok_or(PoolError::Overflow)?;
        Ok((fee, premium))
    }
}
