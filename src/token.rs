//! Token ledger seam.
//!
//! Pools and staking move collateral and governance tokens only through
//! `TokenLedger`. `TokenBank` is the in-memory ledger a `Protocol` owns; it is
//! `Clone` so a failed call can be rolled back wholesale.

use std::collections::BTreeMap;

use solana_program::{msg, pubkey::Pubkey};

use crate::error::PoolError;

/// Balance/allowance ledger with standard transfer and allowance semantics.
pub trait TokenLedger {
    fn balance_of(&self, account: &Pubkey) -> u128;

    fn allowance(&self, owner: &Pubkey, spender: &Pubkey) -> u128;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), PoolError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), PoolError>;

    fn approve(&mut self, owner: &Pubkey, spender: &Pubkey, amount: u128);
}

#[derive(Debug, Clone, Default)]
pub struct TokenBank {
    decimals: u8,
    total_supply: u128,
    balances: BTreeMap<Pubkey, u128>,
    allowances: BTreeMap<(Pubkey, Pubkey), u128>,
}

impl TokenBank {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            ..Self::default()
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Credit freshly issued tokens to `to`.
    pub fn mint_to(&mut self, to: &Pubkey, amount: u128) -> Result<(), PoolError> {
        let supply = self.total_supply.checked_add(amount).ok_or(PoolError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }

    /// (account, balance) pairs with a non-zero balance, in key order.
    pub fn holders(&self) -> impl Iterator<Item = (&Pubkey, &u128)> {
        self.balances.iter().filter(|(_, b)| **b > 0)
    }

    fn debit(&mut self, from: &Pubkey, amount: u128) -> Result<(), PoolError> {
        let balance = self.balance_of(from);
        let rest = balance.checked_sub(amount).ok_or(PoolError::InsufficientFunds)?;
        self.balances.insert(*from, rest);
        Ok(())
    }

    fn credit(&mut self, to: &Pubkey, amount: u128) -> Result<(), PoolError> {
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.balances.insert(*to, balance);
        Ok(())
    }
}

impl TokenLedger for TokenBank {
    fn balance_of(&self, account: &Pubkey) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Pubkey, spender: &Pubkey) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), PoolError> {
        if self.balance_of(from) < amount {
            msg!("Token: {} holds less than {}", from, amount);
            return Err(PoolError::InsufficientFunds);
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), PoolError> {
        let allowance = self.allowance(from, spender);
        // The owner moving its own tokens needs no allowance.
        if spender != from && allowance < amount {
            msg!("Token: allowance {} of {} below {}", allowance, spender, amount);
            return Err(PoolError::InsufficientAllowance);
        }
        self.transfer(from, to, amount)?;
        if spender != from && allowance != u128::MAX {
            self.allowances.insert((*from, *spender), allowance - amount);
        }
        Ok(())
    }

    fn approve(&mut self, owner: &Pubkey, spender: &Pubkey, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }
}
