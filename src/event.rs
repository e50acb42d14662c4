use alloy_primitives::U256;
use solana_program::pubkey::Pubkey;

/// Externally observable outcomes of committed operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Provided {
        tranche_id: u64,
        account: Pubkey,
        amount: u128,
        share: U256,
        hedged: bool,
    },
    Withdrawn {
        account: Pubkey,
        tranche_id: u64,
        amount: u128,
    },
    Acquired {
        option_id: u64,
        settlement_fee: u128,
        premium: u128,
    },
    Exercised {
        option_id: u64,
        profit: u128,
    },
    Expired {
        option_id: u64,
    },
    Profit {
        amount: u128,
    },
    Claim {
        account: Pubkey,
        amount: u128,
    },
    Rewarded {
        option_id: u64,
        amount: u128,
    },
}
