use solana_program::{
    entrypoint::ProgramResult, msg, program_error::ProgramError, pubkey::Pubkey,
    sysvar::clock::Clock,
};

use crate::error::PoolError;
use crate::instruction::PoolInstruction;
use crate::pool::OptionRequest;
use crate::protocol::Protocol;

/// Decode one instruction and run it against `protocol` as `signer`.
///
/// Each instruction is atomic: on error no ledger or token balance changes
/// and no event is published.
pub fn process(
    protocol: &mut Protocol,
    signer: &Pubkey,
    clock: &Clock,
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = PoolInstruction::unpack(instruction_data)?;

    match instruction {
        PoolInstruction::Provide { account, amount, hedged, min_share } => {
            let id = protocol.provide(clock, signer, &account, amount, hedged, min_share)?;
            msg!("Provided tranche {}", id);
        }
        PoolInstruction::Withdraw { tranche_id } => {
            let amount = protocol.withdraw(clock, signer, tranche_id)?;
            msg!("Withdrew {} from tranche {}", amount, tranche_id);
        }
        PoolInstruction::WithdrawWithoutHedge { tranche_id } => {
            let amount = protocol.withdraw_without_hedge(clock, signer, tranche_id)?;
            msg!("Withdrew {} unhedged from tranche {}", amount, tranche_id);
        }
        PoolInstruction::SellOption { holder, period, amount, strike } => {
            let request = OptionRequest { holder, period, amount, strike };
            let id = protocol.sell_option(clock, signer, &request)?;
            msg!("Sold option {}", id);
        }
        PoolInstruction::Exercise { option_id } => {
            let profit = protocol.exercise(clock, signer, option_id)?;
            msg!("Exercised option {} for {}", option_id, profit);
        }
        PoolInstruction::Unlock { option_id } => protocol.unlock(clock, option_id)?,
        PoolInstruction::SetApprovalForAll { operator, approved } => {
            protocol.set_approval_for_all(signer, &operator, approved)?
        }
        PoolInstruction::TransferTranche { tranche_id, to } => {
            protocol.transfer_tranche(signer, tranche_id, &to)?
        }
        PoolInstruction::TransferOption { option_id, to } => {
            protocol.transfer_option(signer, option_id, &to)?
        }
        PoolInstruction::UpdatePoolConfig(update) => {
            protocol.update_pool_config(signer, &update)?;
            msg!("Pool config updated");
        }
        PoolInstruction::SetHedgePool { hedge_pool } => protocol.set_hedge_pool(signer, &hedge_pool)?,
        PoolInstruction::SetSettlementFeeRecipient { recipient } => {
            protocol.set_settlement_fee_recipient(signer, &recipient)?
        }
        PoolInstruction::SetPriceCalculator { calculator } => {
            protocol.set_price_calculator(signer, &calculator)?
        }
        PoolInstruction::BuyStakingLot { count } => protocol.buy_staking_lot(clock, signer, count)?,
        PoolInstruction::SellStakingLot { count } => protocol.sell_staking_lot(clock, signer, count)?,
        PoolInstruction::BuyMicroLot { amount } => protocol.buy_micro_lot(clock, signer, amount)?,
        PoolInstruction::SellMicroLot { amount } => protocol.sell_micro_lot(clock, signer, amount)?,
        PoolInstruction::TransferLots { to, count } => {
            protocol.transfer_lots(clock, signer, &to, count)?
        }
        PoolInstruction::DistributeUnrealizedRewards => {
            let amount = protocol.distribute_unrealized_rewards()?;
            msg!("Distributed {}", amount);
        }
        PoolInstruction::ClaimProfits { account } => {
            let amount = protocol.claim_profits(&account)?;
            msg!("Claimed {} for {}", amount, account);
        }
        PoolInstruction::ClaimReward { option_id } => {
            let amount = protocol.claim_reward(clock, signer, option_id)?;
            msg!("Rewarded {} for option {}", amount, option_id);
        }
        PoolInstruction::SetRewardsRate { rate } => protocol.set_rewards_rate(signer, rate)?,
        PoolInstruction::SetStakingLockup { classic, micro } => {
            protocol.set_staking_lockup_periods(signer, classic, micro)?
        }
    }
    Ok(())
}

/// Error code carried by a failed `process` call, if it is one of ours.
pub fn pool_error_code(err: &ProgramError) -> Option<u32> {
    match err {
        ProgramError::Custom(code) if *code <= PoolError::NotEnoughFunds as u32 => Some(*code),
        _ => None,
    }
}
