use alloy_primitives::U256;
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::pool::OptionRequest;
use crate::protocol::PoolConfigUpdate;

/// Instructions of the options liquidity protocol.
///
/// All integers are little-endian. `Pubkey`s are 32 raw bytes, `U256` values
/// 32 little-endian bytes, booleans one byte (non-zero = true). Optional
/// fields are a has-flag byte followed by the value, which is present (and
/// ignored) even when the flag is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolInstruction {
    /// Deposit collateral from the signer and mint a tranche for `account`.
    ///
    /// Layout: account(32) + amount(16) + hedged(1) + min_share(32)
    Provide {
        account: Pubkey,
        amount: u128,
        hedged: bool,
        min_share: U256,
    },

    /// Redeem a tranche; hedged tranches are topped up by the hedge pool.
    Withdraw { tranche_id: u64 },

    /// Redeem a tranche at pool value only.
    WithdrawWithoutHedge { tranche_id: u64 },

    /// Buy an option for `holder`; the signer pays premium and fee.
    ///
    /// Layout: holder(32) + period(8) + amount(16) + strike(16)
    SellOption {
        holder: Pubkey,
        period: u64,
        amount: u128,
        strike: u128,
    },

    Exercise { option_id: u64 },

    /// Release an expired option. Permissionless.
    Unlock { option_id: u64 },

    SetApprovalForAll { operator: Pubkey, approved: bool },

    TransferTranche { tranche_id: u64, to: Pubkey },

    TransferOption { option_id: u64, to: Pubkey },

    /// Admin updates pool policy. Lockups and deposit caps travel in pairs;
    /// a missing half keeps its current value.
    UpdatePoolConfig(PoolConfigUpdate),

    SetHedgePool { hedge_pool: Pubkey },

    SetSettlementFeeRecipient { recipient: Pubkey },

    /// Must name a registered pricing service.
    SetPriceCalculator { calculator: Pubkey },

    BuyStakingLot { count: u64 },

    SellStakingLot { count: u64 },

    BuyMicroLot { amount: u128 },

    SellMicroLot { amount: u128 },

    TransferLots { to: Pubkey, count: u64 },

    /// Attribute newly arrived profit to stakers. Permissionless.
    DistributeUnrealizedRewards,

    /// Pay out everything `account` has accrued. Permissionless.
    ClaimProfits { account: Pubkey },

    ClaimReward { option_id: u64 },

    SetRewardsRate { rate: u128 },

    SetStakingLockup { classic: u64, micro: u64 },
}

/// Bounds-checked little-endian cursor over instruction payload.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProgramError> {
        if self.data.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (head, tail) = self.data.split_at(N);
        self.data = tail;
        head.try_into().map_err(|_| ProgramError::InvalidInstructionData)
    }

    fn u64(&mut self) -> Result<u64, ProgramError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    fn u128(&mut self) -> Result<u128, ProgramError> {
        self.take::<16>().map(u128::from_le_bytes)
    }

    fn bool(&mut self) -> Result<bool, ProgramError> {
        self.take::<1>().map(|b| b[0] != 0)
    }

    fn pubkey(&mut self) -> Result<Pubkey, ProgramError> {
        self.take::<32>().map(Pubkey::new_from_array)
    }

    fn u256(&mut self) -> Result<U256, ProgramError> {
        self.take::<32>().map(|b| U256::from_le_bytes(b))
    }

    fn opt_u64(&mut self) -> Result<Option<u64>, ProgramError> {
        let has = self.bool()?;
        let v = self.u64()?;
        Ok(has.then_some(v))
    }

    fn opt_u128(&mut self) -> Result<Option<u128>, ProgramError> {
        let has = self.bool()?;
        let v = self.u128()?;
        Ok(has.then_some(v))
    }
}

fn put_opt_u64(out: &mut Vec<u8>, v: Option<u64>) {
    out.push(v.is_some() as u8);
    out.extend_from_slice(&v.unwrap_or(0).to_le_bytes());
}

fn put_opt_u128(out: &mut Vec<u8>, v: Option<u128>) {
    out.push(v.is_some() as u8);
    out.extend_from_slice(&v.unwrap_or(0).to_le_bytes());
}

impl PoolInstruction {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = data.split_first().ok_or(ProgramError::InvalidInstructionData)?;
        let mut r = Reader { data: rest };

        match tag {
            0 => Ok(Self::Provide {
                account: r.pubkey()?,
                amount: r.u128()?,
                hedged: r.bool()?,
                min_share: r.u256()?,
            }),
            1 => Ok(Self::Withdraw { tranche_id: r.u64()? }),
            2 => Ok(Self::WithdrawWithoutHedge { tranche_id: r.u64()? }),
            3 => Ok(Self::SellOption {
                holder: r.pubkey()?,
                period: r.u64()?,
                amount: r.u128()?,
                strike: r.u128()?,
            }),
            4 => Ok(Self::Exercise { option_id: r.u64()? }),
            5 => Ok(Self::Unlock { option_id: r.u64()? }),
            6 => Ok(Self::SetApprovalForAll {
                operator: r.pubkey()?,
                approved: r.bool()?,
            }),
            7 => Ok(Self::TransferTranche {
                tranche_id: r.u64()?,
                to: r.pubkey()?,
            }),
            8 => Ok(Self::TransferOption {
                option_id: r.u64()?,
                to: r.pubkey()?,
            }),
            9 => Ok(Self::UpdatePoolConfig(PoolConfigUpdate {
                lockup_hedged: r.opt_u64()?,
                lockup_unhedged: r.opt_u64()?,
                max_deposit_amount: r.opt_u128()?,
                max_hedged_deposit_amount: r.opt_u128()?,
                max_utilization_rate: r.opt_u64()?,
                collateralization_ratio: r.opt_u64()?,
                hedge_fee_rate: r.opt_u64()?,
            })),
            10 => Ok(Self::SetHedgePool { hedge_pool: r.pubkey()? }),
            11 => Ok(Self::SetSettlementFeeRecipient { recipient: r.pubkey()? }),
            12 => Ok(Self::SetPriceCalculator { calculator: r.pubkey()? }),
            13 => Ok(Self::BuyStakingLot { count: r.u64()? }),
            14 => Ok(Self::SellStakingLot { count: r.u64()? }),
            15 => Ok(Self::BuyMicroLot { amount: r.u128()? }),
            16 => Ok(Self::SellMicroLot { amount: r.u128()? }),
            17 => Ok(Self::TransferLots {
                to: r.pubkey()?,
                count: r.u64()?,
            }),
            18 => Ok(Self::DistributeUnrealizedRewards),
            19 => Ok(Self::ClaimProfits { account: r.pubkey()? }),
            20 => Ok(Self::ClaimReward { option_id: r.u64()? }),
            21 => Ok(Self::SetRewardsRate { rate: r.u128()? }),
            22 => Ok(Self::SetStakingLockup {
                classic: r.u64()?,
                micro: r.u64()?,
            }),
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    /// Client-side encoding; inverse of `unpack`.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(96);
        match self {
            Self::Provide { account, amount, hedged, min_share } => {
                out.push(0);
                out.extend_from_slice(account.as_ref());
                out.extend_from_slice(&amount.to_le_bytes());
                out.push(*hedged as u8);
                out.extend_from_slice(&min_share.to_le_bytes::<32>());
            }
            Self::Withdraw { tranche_id } => {
                out.push(1);
                out.extend_from_slice(&tranche_id.to_le_bytes());
            }
            Self::WithdrawWithoutHedge { tranche_id } => {
                out.push(2);
                out.extend_from_slice(&tranche_id.to_le_bytes());
            }
            Self::SellOption { holder, period, amount, strike } => {
                out.push(3);
                out.extend_from_slice(holder.as_ref());
                out.extend_from_slice(&period.to_le_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
                out.extend_from_slice(&strike.to_le_bytes());
            }
            Self::Exercise { option_id } => {
                out.push(4);
                out.extend_from_slice(&option_id.to_le_bytes());
            }
            Self::Unlock { option_id } => {
                out.push(5);
                out.extend_from_slice(&option_id.to_le_bytes());
            }
            Self::SetApprovalForAll { operator, approved } => {
                out.push(6);
                out.extend_from_slice(operator.as_ref());
                out.push(*approved as u8);
            }
            Self::TransferTranche { tranche_id, to } => {
                out.push(7);
                out.extend_from_slice(&tranche_id.to_le_bytes());
                out.extend_from_slice(to.as_ref());
            }
            Self::TransferOption { option_id, to } => {
                out.push(8);
                out.extend_from_slice(&option_id.to_le_bytes());
                out.extend_from_slice(to.as_ref());
            }
            Self::UpdatePoolConfig(u) => {
                out.push(9);
                put_opt_u64(&mut out, u.lockup_hedged);
                put_opt_u64(&mut out, u.lockup_unhedged);
                put_opt_u128(&mut out, u.max_deposit_amount);
                put_opt_u128(&mut out, u.max_hedged_deposit_amount);
                put_opt_u64(&mut out, u.max_utilization_rate);
                put_opt_u64(&mut out, u.collateralization_ratio);
                put_opt_u64(&mut out, u.hedge_fee_rate);
            }
            Self::SetHedgePool { hedge_pool } => {
                out.push(10);
                out.extend_from_slice(hedge_pool.as_ref());
            }
            Self::SetSettlementFeeRecipient { recipient } => {
                out.push(11);
                out.extend_from_slice(recipient.as_ref());
            }
            Self::SetPriceCalculator { calculator } => {
                out.push(12);
                out.extend_from_slice(calculator.as_ref());
            }
            Self::BuyStakingLot { count } => {
                out.push(13);
                out.extend_from_slice(&count.to_le_bytes());
            }
            Self::SellStakingLot { count } => {
                out.push(14);
                out.extend_from_slice(&count.to_le_bytes());
            }
            Self::BuyMicroLot { amount } => {
                out.push(15);
                out.extend_from_slice(&amount.to_le_bytes());
            }
            Self::SellMicroLot { amount } => {
                out.push(16);
                out.extend_from_slice(&amount.to_le_bytes());
            }
            Self::TransferLots { to, count } => {
                out.push(17);
                out.extend_from_slice(to.as_ref());
                out.extend_from_slice(&count.to_le_bytes());
            }
            Self::DistributeUnrealizedRewards => out.push(18),
            Self::ClaimProfits { account } => {
                out.push(19);
                out.extend_from_slice(account.as_ref());
            }
            Self::ClaimReward { option_id } => {
                out.push(20);
                out.extend_from_slice(&option_id.to_le_bytes());
            }
            Self::SetRewardsRate { rate } => {
                out.push(21);
                out.extend_from_slice(&rate.to_le_bytes());
            }
            Self::SetStakingLockup { classic, micro } => {
                out.push(22);
                out.extend_from_slice(&classic.to_le_bytes());
                out.extend_from_slice(&micro.to_le_bytes());
            }
        }
        out
    }

    /// The option request carried by a `SellOption`.
    pub fn option_request(&self) -> Option<OptionRequest> {
        match *self {
            Self::SellOption { holder, period, amount, strike } => Some(OptionRequest {
                holder,
                period,
                amount,
                strike,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Pubkey {
        Pubkey::new_from_array([b; 32])
    }

    // ── Tag 0: Provide ──

    #[test]
    fn test_unpack_provide() {
        let mut data = vec![0u8];
        data.extend_from_slice(&[7u8; 32]); // account
        data.extend_from_slice(&100_000u128.to_le_bytes()); // amount
        data.push(1); // hedged
        data.extend_from_slice(&U256::from(5u64).to_le_bytes::<32>()); // min_share
        match PoolInstruction::unpack(&data).unwrap() {
            PoolInstruction::Provide { account, amount, hedged, min_share } => {
                assert_eq!(account, key(7));
                assert_eq!(amount, 100_000);
                assert!(hedged);
                assert_eq!(min_share, U256::from(5u64));
            }
            other => panic!("wrong variant {:?}", other),
        }
    }

    #[test]
    fn test_unpack_provide_too_short() {
        let mut data = vec![0u8];
        data.extend_from_slice(&[7u8; 32]);
        data.extend_from_slice(&1u128.to_le_bytes());
        data.push(0);
        // min_share missing
        assert_eq!(
            PoolInstruction::unpack(&data),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    // ── Tag 3: SellOption ──

    #[test]
    fn test_unpack_sell_option() {
        let mut data = vec![3u8];
        data.extend_from_slice(&[9u8; 32]);
        data.extend_from_slice(&(7 * 86_400u64).to_le_bytes());
        data.extend_from_slice(&(10u128.pow(18)).to_le_bytes());
        data.extend_from_slice(&0u128.to_le_bytes());
        let ix = PoolInstruction::unpack(&data).unwrap();
        let req = ix.option_request().unwrap();
        assert_eq!(req.holder, key(9));
        assert_eq!(req.period, 7 * 86_400);
        assert_eq!(req.amount, 10u128.pow(18));
        assert_eq!(req.strike, 0);
    }

    // ── Tag 9: UpdatePoolConfig ──

    #[test]
    fn test_unpack_update_config_partial() {
        let mut data = vec![9u8];
        data.push(1);
        data.extend_from_slice(&3600u64.to_le_bytes()); // lockup_hedged
        data.push(0);
        data.extend_from_slice(&0u64.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&0u128.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&0u128.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&90u64.to_le_bytes()); // utilization
        data.push(0);
        data.extend_from_slice(&0u64.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&0u64.to_le_bytes());
        match PoolInstruction::unpack(&data).unwrap() {
            PoolInstruction::UpdatePoolConfig(u) => {
                assert_eq!(u.lockup_hedged, Some(3600));
                assert_eq!(u.lockup_unhedged, None);
                assert_eq!(u.max_deposit_amount, None);
                assert_eq!(u.max_utilization_rate, Some(90));
                assert_eq!(u.hedge_fee_rate, None);
            }
            other => panic!("wrong variant {:?}", other),
        }
    }

    #[test]
    fn test_unpack_update_config_truncated() {
        let data = vec![9u8, 1, 0, 0];
        assert!(PoolInstruction::unpack(&data).is_err());
    }

    // ── Tag 18: DistributeUnrealizedRewards ──

    #[test]
    fn test_unpack_distribute() {
        assert_eq!(
            PoolInstruction::unpack(&[18u8]).unwrap(),
            PoolInstruction::DistributeUnrealizedRewards
        );
    }

    // ── Tag 22: SetStakingLockup ──

    #[test]
    fn test_unpack_staking_lockup() {
        let mut data = vec![22u8];
        data.extend_from_slice(&10u64.to_le_bytes());
        data.extend_from_slice(&20u64.to_le_bytes());
        assert_eq!(
            PoolInstruction::unpack(&data).unwrap(),
            PoolInstruction::SetStakingLockup { classic: 10, micro: 20 }
        );
    }

    // ── pack ──

    #[test]
    fn test_pack_every_tag_unpacks() {
        let all = vec![
            PoolInstruction::Provide {
                account: key(1),
                amount: u128::MAX,
                hedged: false,
                min_share: U256::MAX,
            },
            PoolInstruction::Withdraw { tranche_id: 3 },
            PoolInstruction::WithdrawWithoutHedge { tranche_id: 4 },
            PoolInstruction::SellOption { holder: key(2), period: 86_400, amount: 5, strike: 6 },
            PoolInstruction::Exercise { option_id: 7 },
            PoolInstruction::Unlock { option_id: 8 },
            PoolInstruction::SetApprovalForAll { operator: key(3), approved: true },
            PoolInstruction::TransferTranche { tranche_id: 9, to: key(4) },
            PoolInstruction::TransferOption { option_id: 10, to: key(5) },
            PoolInstruction::UpdatePoolConfig(PoolConfigUpdate {
                max_deposit_amount: Some(11),
                collateralization_ratio: Some(40),
                ..PoolConfigUpdate::default()
            }),
            PoolInstruction::SetHedgePool { hedge_pool: key(6) },
            PoolInstruction::SetSettlementFeeRecipient { recipient: key(7) },
            PoolInstruction::SetPriceCalculator { calculator: key(8) },
            PoolInstruction::BuyStakingLot { count: 1 },
            PoolInstruction::SellStakingLot { count: 2 },
            PoolInstruction::BuyMicroLot { amount: 3 },
            PoolInstruction::SellMicroLot { amount: 4 },
            PoolInstruction::TransferLots { to: key(9), count: 5 },
            PoolInstruction::DistributeUnrealizedRewards,
            PoolInstruction::ClaimProfits { account: key(10) },
            PoolInstruction::ClaimReward { option_id: 12 },
            PoolInstruction::SetRewardsRate { rate: 10u128.pow(20) },
            PoolInstruction::SetStakingLockup { classic: 1, micro: 2 },
        ];
        for (tag, ix) in all.iter().enumerate() {
            let bytes = ix.pack();
            assert_eq!(bytes[0] as usize, tag);
            assert_eq!(&PoolInstruction::unpack(&bytes).unwrap(), ix);
        }
    }

    // ── Invalid tag ──

    #[test]
    fn test_unpack_invalid_tag() {
        assert!(PoolInstruction::unpack(&[23u8]).is_err());
        assert!(PoolInstruction::unpack(&[255u8]).is_err());
    }

    #[test]
    fn test_unpack_empty() {
        let data: Vec<u8> = vec![];
        assert!(PoolInstruction::unpack(&data).is_err());
    }
}
