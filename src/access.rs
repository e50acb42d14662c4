use std::collections::BTreeMap;

use solana_program::{msg, pubkey::Pubkey};

use crate::error::PoolError;

/// Capabilities checked at the top of privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    /// Pool policy setters
    Admin = 1,
    /// Staking and rewards knobs
    Owner = 2,
}

/// Explicit identity → role-bitmask table.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    grants: BTreeMap<Pubkey, u8>,
}

impl Permissions {
    /// Table with `who` holding every role in `roles`.
    pub fn with(who: &Pubkey, roles: &[Role]) -> Self {
        let mut p = Self::default();
        for role in roles {
            p.insert(who, *role);
        }
        p
    }

    pub fn has(&self, who: &Pubkey, role: Role) -> bool {
        self.grants.get(who).is_some_and(|m| m & role as u8 != 0)
    }

    pub fn require(&self, who: &Pubkey, role: Role) -> Result<(), PoolError> {
        if self.has(who, role) {
            Ok(())
        } else {
            msg!("Access: {} lacks {:?}", who, role);
            Err(PoolError::Unauthorized)
        }
    }

    /// `caller` must already hold `role` to hand it out.
    pub fn grant(&mut self, caller: &Pubkey, who: &Pubkey, role: Role) -> Result<(), PoolError> {
        self.require(caller, role)?;
        self.insert(who, role);
        msg!("Access: {:?} granted to {}", role, who);
        Ok(())
    }

    pub fn revoke(&mut self, caller: &Pubkey, who: &Pubkey, role: Role) -> Result<(), PoolError> {
        self.require(caller, role)?;
        if let Some(mask) = self.grants.get_mut(who) {
            *mask &= !(role as u8);
            if *mask == 0 {
                self.grants.remove(who);
            }
        }
        msg!("Access: {:?} revoked from {}", role, who);
        Ok(())
    }

    fn insert(&mut self, who: &Pubkey, role: Role) {
        *self.grants.entry(*who).or_insert(0) |= role as u8;
    }
}
