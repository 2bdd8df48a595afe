use anchor_lang::prelude::*;
use fund::state::Receipt;

use crate::constants::*;
use crate::ErrorCode;

#[account]
pub struct StakingConfig {
    pub admin: Pubkey,
    pub reward_mint: Pubkey,
    pub reward_vault: Pubkey,
    /// Reward tokens per stable unit, scaled by `RATE_PRECISION`.
    pub rate_to_usd: u64,
    /// Zero until `init_staking` runs.
    pub staking_started_at: i64,
    pub tokens_claimable: bool,
    pub tiers: Vec<TierStep>,
    pub total_staked: u64,
    pub total_rewards_released: u64,
    pub bump: u8,
}

/// Annual rate paid to receipts whose principal is at least `threshold`.
#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct TierStep {
    pub threshold: u64,
    pub rate_bps: u16,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionStatus {
    Unstaked,
    Staked,
    EmergencyWithdrawn,
}

impl Default for PositionStatus {
    fn default() -> Self {
        PositionStatus::Unstaked
    }
}

#[account]
#[derive(Default, Debug)]
pub struct StakedPosition {
    pub owner: Pubkey,
    pub receipt_mint: Pubkey,
    pub token_id: u64,
    pub pool_id: u64,
    pub pegged_amount: u64,
    pub staked_at: i64,
    pub last_checkpoint: i64,
    pub accrued: u64,
    pub rewards_released: u64,
    pub status: PositionStatus,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct StakedToken {
    pub receipt_mint: Pubkey,
    pub token_id: u64,
}

#[account]
#[derive(Default)]
pub struct Staker {
    pub owner: Pubkey,
    pub tokens: Vec<StakedToken>,
}

impl StakingConfig {
    pub const LEN: usize = 8 + // discriminator
        32 * 3 + // admin, reward mint and vault
        8 + // rate_to_usd
        8 + // staking_started_at
        1 + // tokens_claimable
        (4 + MAX_TIERS * TierStep::SPACE) +
        8 + 8 + // totals
        1; // bump

    pub fn assert_admin(&self, caller: &Pubkey) -> Result<()> {
        require!(self.admin == *caller, ErrorCode::Unauthorized);
        Ok(())
    }

    pub fn set_rate_to_usd(&mut self, caller: &Pubkey, rate: u64) -> Result<()> {
        self.assert_admin(caller)?;
        require!(rate > 0, ErrorCode::InvalidRate);
        self.rate_to_usd = rate;
        Ok(())
    }

    pub fn set_tier_table(&mut self, caller: &Pubkey, tiers: Vec<TierStep>) -> Result<()> {
        self.assert_admin(caller)?;
        require!(tiers.len() <= MAX_TIERS, ErrorCode::InvalidTierTable);
        require!(
            tiers.windows(2).all(|pair| pair[0].threshold < pair[1].threshold),
            ErrorCode::InvalidTierTable
        );
        self.tiers = tiers;
        Ok(())
    }

    pub fn init_staking(&mut self, caller: &Pubkey, now: i64) -> Result<()> {
        self.assert_admin(caller)?;
        require!(self.staking_started_at == 0, ErrorCode::AlreadyStarted);
        // a zero clock would read as "not started"
        self.staking_started_at = now.max(1);
        Ok(())
    }

    pub fn set_tokens_claimable(&mut self, caller: &Pubkey, claimable: bool) -> Result<()> {
        self.assert_admin(caller)?;
        self.tokens_claimable = claimable;
        Ok(())
    }

    /// Rate of the largest threshold not above `pegged_amount`, 0 below the first one.
    pub fn tier_rate(&self, pegged_amount: u64) -> u16 {
        self.tiers
            .iter()
            .take_while(|tier| tier.threshold <= pegged_amount)
            .last()
            .map_or(0, |tier| tier.rate_bps)
    }

    pub fn reward_between(&self, pegged_amount: u64, from: i64, to: i64) -> Result<u64> {
        let elapsed = to.saturating_sub(from);
        if elapsed <= 0 {
            return Ok(0);
        }

        let stable = (pegged_amount as u128)
            .checked_mul(self.tier_rate(pegged_amount) as u128)
            .and_then(|value| value.checked_mul(elapsed as u128))
            .ok_or(ErrorCode::MathOverflow)?
            / (SECONDS_PER_YEAR as u128 * BPS_DENOMINATOR as u128);
        let reward = stable
            .checked_mul(self.rate_to_usd as u128)
            .ok_or(ErrorCode::MathOverflow)?
            / RATE_PRECISION as u128;

        u64::try_from(reward).map_err(|_| error!(ErrorCode::MathOverflow))
    }

    /// Moves the checkpoint to `now`. Calling it twice at the same instant adds nothing.
    pub fn accrue(&self, position: &mut StakedPosition, now: i64) -> Result<u64> {
        if position.status != PositionStatus::Staked {
            return Ok(0);
        }

        let earned = self.reward_between(position.pegged_amount, position.last_checkpoint, now)?;
        position.accrued = position
            .accrued
            .checked_add(earned)
            .ok_or(ErrorCode::MathOverflow)?;
        position.last_checkpoint = position.last_checkpoint.max(now);

        Ok(earned)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stake(
        &mut self,
        position: &mut StakedPosition,
        staker: &mut Staker,
        owner: Pubkey,
        receipt: &Receipt,
        holds_receipt: bool,
        approved: bool,
        now: i64,
    ) -> Result<()> {
        require!(self.staking_started_at > 0, ErrorCode::NotStarted);
        require!(holds_receipt, ErrorCode::NotOwner);
        require!(approved, ErrorCode::NotApproved);
        require!(position.status != PositionStatus::Staked, ErrorCode::AlreadyStaked);

        staker.owner = owner;
        staker.add(receipt.mint, receipt.token_id)?;

        *position = StakedPosition {
            owner,
            receipt_mint: receipt.mint,
            token_id: receipt.token_id,
            pool_id: receipt.pool_id,
            pegged_amount: receipt.pegged_amount,
            staked_at: now,
            last_checkpoint: now,
            accrued: 0,
            rewards_released: position.rewards_released,
            status: PositionStatus::Staked,
        };
        self.total_staked = self.total_staked.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

        Ok(())
    }

    pub fn claim_reward(
        &mut self,
        position: &mut StakedPosition,
        caller: &Pubkey,
        vault_balance: u64,
        now: i64,
    ) -> Result<u64> {
        self.claim_rewards(std::slice::from_mut(position), caller, vault_balance, now)
    }

    /// Settles every position in one payout. All of them must belong to `caller`.
    pub fn claim_rewards(
        &mut self,
        positions: &mut [StakedPosition],
        caller: &Pubkey,
        vault_balance: u64,
        now: i64,
    ) -> Result<u64> {
        require!(self.tokens_claimable, ErrorCode::NotClaimable);
        require!(
            positions.iter().all(|position| position.owner == *caller),
            ErrorCode::NotOwner
        );

        let mut total: u64 = 0;
        for position in positions.iter_mut() {
            self.accrue(position, now)?;
            total = total
                .checked_add(position.accrued)
                .ok_or(ErrorCode::MathOverflow)?;
        }
        require!(total > 0, ErrorCode::ZeroReward);
        require!(total <= vault_balance, ErrorCode::InsufficientPoolLiquidity);

        for position in positions.iter_mut() {
            self.release(position)?;
        }

        Ok(total)
    }

    /// Pays out what the position has accrued, returns the NFT and closes the position.
    pub fn unstake(
        &mut self,
        position: &mut StakedPosition,
        staker: &mut Staker,
        caller: &Pubkey,
        vault_balance: u64,
        now: i64,
    ) -> Result<u64> {
        require!(self.tokens_claimable, ErrorCode::NotClaimable);
        require!(position.owner == *caller, ErrorCode::NotOwner);
        require!(position.status == PositionStatus::Staked, ErrorCode::AlreadyWithdrawn);

        self.accrue(position, now)?;
        let reward = position.accrued;
        require!(reward <= vault_balance, ErrorCode::InsufficientPoolLiquidity);
        self.release(position)?;

        self.close_position(position, staker, PositionStatus::Unstaked)?;

        Ok(reward)
    }

    /// Returns the NFT without paying anything. The forfeited reward is returned for logging.
    pub fn emergency_unstake(
        &mut self,
        position: &mut StakedPosition,
        staker: &mut Staker,
        caller: &Pubkey,
        now: i64,
    ) -> Result<u64> {
        require!(position.owner == *caller, ErrorCode::NotOwner);
        require!(position.status == PositionStatus::Staked, ErrorCode::AlreadyWithdrawn);

        self.accrue(position, now)?;
        let forfeited = position.accrued;
        position.accrued = 0;

        self.close_position(position, staker, PositionStatus::EmergencyWithdrawn)?;

        Ok(forfeited)
    }

    fn release(&mut self, position: &mut StakedPosition) -> Result<()> {
        let amount = position.accrued;
        position.accrued = 0;
        position.rewards_released = position
            .rewards_released
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        self.total_rewards_released = self
            .total_rewards_released
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }

    fn close_position(
        &mut self,
        position: &mut StakedPosition,
        staker: &mut Staker,
        status: PositionStatus,
    ) -> Result<()> {
        position.status = status;
        staker.remove(&position.receipt_mint);
        self.total_staked = self.total_staked.checked_sub(1).ok_or(ErrorCode::MathOverflow)?;
        Ok(())
    }
}

impl TierStep {
    pub const SPACE: usize = 8 + 2;
}

impl StakedPosition {
    pub const LEN: usize = 8 + 32 + 32 + 8 + 8 + 8 + 8 + 8 + 8 + 8 + 1;

    /// Reward owed at `now` without touching the position.
    pub fn pending_reward(&self, config: &StakingConfig, now: i64) -> Result<u64> {
        let mut position = self.clone();
        config.accrue(&mut position, now)?;
        Ok(position.accrued)
    }
}

impl Staker {
    pub const LEN: usize = 8 + 32 + 4 + MAX_STAKED_PER_OWNER * (32 + 8);

    pub fn add(&mut self, receipt_mint: Pubkey, token_id: u64) -> Result<()> {
        require!(
            self.tokens.len() < MAX_STAKED_PER_OWNER,
            ErrorCode::TooManyStakedTokens
        );
        self.tokens.push(StakedToken { receipt_mint, token_id });
        Ok(())
    }

    pub fn remove(&mut self, receipt_mint: &Pubkey) {
        self.tokens.retain(|token| token.receipt_mint != *receipt_mint);
    }

    pub fn token_ids(&self) -> Vec<u64> {
        self.tokens.iter().map(|token| token.token_id).collect()
    }

    pub fn token_id(&self, index: u32) -> Result<u64> {
        self.tokens
            .get(index as usize)
            .map(|token| token.token_id)
            .ok_or_else(|| error!(ErrorCode::IndexOutOfRange))
    }
}
