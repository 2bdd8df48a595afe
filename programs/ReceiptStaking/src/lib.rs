use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};
use fund::constants::RECEIPT_SEED;
use fund::state::Receipt;
use fund::token_ops;

pub mod constants;
pub mod state;

use constants::*;
use state::*;

declare_id!("2kLxY1kMWC8DQa1X7E2B6uHafdnm3WauosfruTgTz5M2");

#[program]
pub mod receipt_staking {
    use super::*;

    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        let bump = *ctx.bumps.get("config").ok_or(ErrorCode::BumpNotFound)?;
        let config = &mut ctx.accounts.config;

        config.admin = ctx.accounts.admin.key();
        config.reward_mint = ctx.accounts.reward_mint.key();
        config.reward_vault = ctx.accounts.reward_vault.key();
        config.rate_to_usd = RATE_PRECISION;
        config.bump = bump;

        msg!("Receipt staking initialized for reward mint {}", config.reward_mint);

        Ok(())
    }

    pub fn set_rate_to_usd(ctx: Context<UpdateStakingConfig>, rate: u64) -> Result<()> {
        let config = &mut ctx.accounts.config;
        config.set_rate_to_usd(ctx.accounts.admin.key, rate)?;

        emit!(RateToUsdUpdated { rate });

        Ok(())
    }

    pub fn set_tier_table(ctx: Context<UpdateStakingConfig>, tiers: Vec<TierStep>) -> Result<()> {
        let config = &mut ctx.accounts.config;
        config.set_tier_table(ctx.accounts.admin.key, tiers.clone())?;

        emit!(TierTableUpdated { tiers });

        Ok(())
    }

    pub fn init_staking(ctx: Context<UpdateStakingConfig>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let config = &mut ctx.accounts.config;
        config.init_staking(ctx.accounts.admin.key, now)?;

        emit!(StakingStarted {
            started_at: config.staking_started_at
        });

        Ok(())
    }

    pub fn set_tokens_claimable(ctx: Context<UpdateStakingConfig>, claimable: bool) -> Result<()> {
        let config = &mut ctx.accounts.config;
        config.set_tokens_claimable(ctx.accounts.admin.key, claimable)?;

        emit!(TokensClaimableChanged { claimable });

        Ok(())
    }

    pub fn stake(ctx: Context<Stake>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();
        let config_key = ctx.accounts.config.key();
        let owner_receipt_account = &ctx.accounts.owner_receipt_account;
        let holds_receipt =
            token_ops::holds_nft(owner_receipt_account, &owner, &ctx.accounts.receipt.mint);
        let approved = token_ops::allowance(owner_receipt_account, &config_key) >= 1;

        let config = &mut ctx.accounts.config;
        config.stake(
            &mut ctx.accounts.position,
            &mut ctx.accounts.staker,
            owner,
            &ctx.accounts.receipt,
            holds_receipt,
            approved,
            now,
        )?;

        let bump_seed = [config.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[STAKING_CONFIG_SEED, &bump_seed]];
        token_ops::transfer_from_user(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.owner_receipt_account.to_account_info(),
            &ctx.accounts.nft_vault.to_account_info(),
            &ctx.accounts.config.to_account_info(),
            signer_seeds,
            1,
        )?;

        emit!(Staked {
            owner,
            receipt_mint: ctx.accounts.receipt.mint,
            token_id: ctx.accounts.receipt.token_id,
            pegged_amount: ctx.accounts.receipt.pegged_amount,
        });

        Ok(())
    }

    pub fn get_investment_tier(ctx: Context<GetInvestmentTier>) -> Result<u16> {
        Ok(ctx.accounts.config.tier_rate(ctx.accounts.receipt.pegged_amount))
    }

    pub fn update_reward(ctx: Context<UpdateReward>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let position = &mut ctx.accounts.position;
        let earned = ctx.accounts.config.accrue(position, now)?;

        emit!(RewardUpdated {
            receipt_mint: position.receipt_mint,
            earned,
            accrued: position.accrued,
        });

        Ok(())
    }

    pub fn update_rewards_for_owner<'info>(
        ctx: Context<'_, '_, '_, 'info, UpdateRewardsForOwner<'info>>,
        owner: Pubkey,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let config = &ctx.accounts.config;
        let mut positions = load_positions(ctx.remaining_accounts)?;

        for position in positions.iter_mut() {
            if position.owner != owner {
                return Err(ErrorCode::NotOwner.into());
            }
            let earned = config.accrue(position, now)?;

            emit!(RewardUpdated {
                receipt_mint: position.receipt_mint,
                earned,
                accrued: position.accrued,
            });
        }

        store_positions(ctx.remaining_accounts, &positions)
    }

    pub fn claim_reward(ctx: Context<ClaimReward>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();
        let vault_balance = ctx.accounts.reward_vault.amount;

        let config = &mut ctx.accounts.config;
        let reward = config.claim_reward(&mut ctx.accounts.position, &owner, vault_balance, now)?;

        pay_reward(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.reward_vault.to_account_info(),
            &ctx.accounts.owner_reward_account.to_account_info(),
            &ctx.accounts.config.to_account_info(),
            ctx.accounts.config.bump,
            reward,
        )?;

        emit!(RewardClaimed {
            owner,
            positions: 1,
            reward,
        });

        Ok(())
    }

    pub fn claim_reward_for_owner<'info>(
        ctx: Context<'_, '_, '_, 'info, ClaimRewardForOwner<'info>>,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();
        let vault_balance = ctx.accounts.reward_vault.amount;
        let mut positions = load_positions(ctx.remaining_accounts)?;

        let config = &mut ctx.accounts.config;
        let reward = config.claim_rewards(&mut positions, &owner, vault_balance, now)?;
        store_positions(ctx.remaining_accounts, &positions)?;

        pay_reward(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.reward_vault.to_account_info(),
            &ctx.accounts.owner_reward_account.to_account_info(),
            &ctx.accounts.config.to_account_info(),
            ctx.accounts.config.bump,
            reward,
        )?;

        emit!(RewardClaimed {
            owner,
            positions: positions.len() as u32,
            reward,
        });

        Ok(())
    }

    pub fn unstake(ctx: Context<Unstake>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();
        let vault_balance = ctx.accounts.reward_vault.amount;

        let config = &mut ctx.accounts.config;
        let reward = config.unstake(
            &mut ctx.accounts.position,
            &mut ctx.accounts.staker,
            &owner,
            vault_balance,
            now,
        )?;

        let token_program = ctx.accounts.token_program.to_account_info();
        let config_info = ctx.accounts.config.to_account_info();
        let bump = ctx.accounts.config.bump;
        pay_reward(
            &token_program,
            &ctx.accounts.reward_vault.to_account_info(),
            &ctx.accounts.owner_reward_account.to_account_info(),
            &config_info,
            bump,
            reward,
        )?;
        return_nft(
            &token_program,
            &ctx.accounts.nft_vault.to_account_info(),
            &ctx.accounts.owner_receipt_account.to_account_info(),
            &config_info,
            bump,
        )?;

        emit!(Unstaked {
            owner,
            receipt_mint: ctx.accounts.receipt_mint.key(),
            reward,
        });

        Ok(())
    }

    pub fn emergency_unstake(ctx: Context<EmergencyUnstake>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();

        let config = &mut ctx.accounts.config;
        let forfeited = config.emergency_unstake(
            &mut ctx.accounts.position,
            &mut ctx.accounts.staker,
            &owner,
            now,
        )?;

        return_nft(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.nft_vault.to_account_info(),
            &ctx.accounts.owner_receipt_account.to_account_info(),
            &ctx.accounts.config.to_account_info(),
            ctx.accounts.config.bump,
        )?;

        msg!("Emergency unstake forfeited {}", forfeited);
        emit!(EmergencyUnstaked {
            owner,
            receipt_mint: ctx.accounts.receipt_mint.key(),
            forfeited,
        });

        Ok(())
    }

    pub fn get_staked_tokens(ctx: Context<GetStakedTokens>, _owner: Pubkey) -> Result<Vec<u64>> {
        Ok(ctx.accounts.staker.token_ids())
    }

    pub fn get_token_id(ctx: Context<GetStakedTokens>, _owner: Pubkey, index: u32) -> Result<u64> {
        ctx.accounts.staker.token_id(index)
    }

    pub fn get_staked_token_owner(ctx: Context<GetPosition>) -> Result<Pubkey> {
        let position = &ctx.accounts.position;
        if position.status != PositionStatus::Staked {
            return Ok(Pubkey::default());
        }

        Ok(position.owner)
    }

    pub fn get_position_reward(ctx: Context<GetPosition>) -> Result<u64> {
        let now = Clock::get()?.unix_timestamp;
        ctx.accounts
            .position
            .pending_reward(&ctx.accounts.config, now)
    }
}

fn pay_reward<'info>(
    token_program: &AccountInfo<'info>,
    reward_vault: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    config: &AccountInfo<'info>,
    bump: u8,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    config_transfer(token_program, reward_vault, to, config, bump, amount)
}

fn return_nft<'info>(
    token_program: &AccountInfo<'info>,
    nft_vault: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    config: &AccountInfo<'info>,
    bump: u8,
) -> Result<()> {
    config_transfer(token_program, nft_vault, to, config, bump, 1)
}

fn config_transfer<'info>(
    token_program: &AccountInfo<'info>,
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    config: &AccountInfo<'info>,
    bump: u8,
    amount: u64,
) -> Result<()> {
    let bump_seed = [bump];
    let signer_seeds: &[&[&[u8]]] = &[&[STAKING_CONFIG_SEED, &bump_seed]];

    let cpi_accounts = Transfer {
        from: from.clone(),
        to: to.clone(),
        authority: config.clone(),
    };
    let cpi_ctx = CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds);

    token::transfer(cpi_ctx, amount)
}

/// Reads staked positions passed as remaining accounts. Each account may appear once.
fn load_positions(accounts: &[AccountInfo]) -> Result<Vec<StakedPosition>> {
    let mut keys: Vec<Pubkey> = accounts.iter().map(|info| info.key()).collect();
    keys.sort();
    keys.dedup();
    if keys.len() != accounts.len() {
        return Err(ErrorCode::DuplicatePosition.into());
    }

    let mut positions = Vec::with_capacity(accounts.len());
    for info in accounts {
        if info.owner != &crate::ID {
            return Err(ErrorCode::InvalidPositionAccount.into());
        }
        let data = info.try_borrow_data()?;
        let position = StakedPosition::try_deserialize(&mut &data[..])?;
        positions.push(position);
    }

    Ok(positions)
}

fn store_positions(accounts: &[AccountInfo], positions: &[StakedPosition]) -> Result<()> {
    for (info, position) in accounts.iter().zip(positions) {
        let mut data = info.try_borrow_mut_data()?;
        let mut new_data: Vec<u8> = Vec::new();
        position.try_serialize(&mut new_data)?;
        data[..new_data.len()].copy_from_slice(&new_data);
    }

    Ok(())
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = admin,
        space = StakingConfig::LEN,
        seeds = [STAKING_CONFIG_SEED],
        bump
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    pub reward_mint: Box<Account<'info, Mint>>,
    #[account(
        init,
        payer = admin,
        seeds = [REWARD_VAULT_SEED],
        bump,
        token::mint = reward_mint,
        token::authority = config,
    )]
    pub reward_vault: Box<Account<'info, TokenAccount>>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct UpdateStakingConfig<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, StakingConfig>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct Stake<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    #[account(
        seeds = [RECEIPT_SEED, receipt_mint.key().as_ref()],
        bump,
        seeds::program = fund::ID,
    )]
    pub receipt: Box<Account<'info, Receipt>>,
    pub receipt_mint: Box<Account<'info, Mint>>,
    #[account(
        init_if_needed,
        payer = owner,
        space = StakedPosition::LEN,
        seeds = [POSITION_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, StakedPosition>>,
    #[account(
        init_if_needed,
        payer = owner,
        space = Staker::LEN,
        seeds = [STAKER_SEED, owner.key().as_ref()],
        bump
    )]
    pub staker: Box<Account<'info, Staker>>,
    #[account(mut)]
    pub owner_receipt_account: Box<Account<'info, TokenAccount>>,
    #[account(
        init_if_needed,
        payer = owner,
        seeds = [NFT_VAULT_SEED, receipt_mint.key().as_ref()],
        bump,
        token::mint = receipt_mint,
        token::authority = config,
    )]
    pub nft_vault: Box<Account<'info, TokenAccount>>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct GetInvestmentTier<'info> {
    #[account(
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, StakingConfig>,
    #[account(
        seeds = [RECEIPT_SEED, receipt.mint.as_ref()],
        bump,
        seeds::program = fund::ID,
    )]
    pub receipt: Account<'info, Receipt>,
}

#[derive(Accounts)]
pub struct UpdateReward<'info> {
    #[account(
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, StakingConfig>,
    #[account(
        mut,
        seeds = [POSITION_SEED, position.receipt_mint.as_ref()],
        bump
    )]
    pub position: Account<'info, StakedPosition>,
}

#[derive(Accounts)]
pub struct UpdateRewardsForOwner<'info> {
    #[account(
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, StakingConfig>,
}

#[derive(Accounts)]
pub struct ClaimReward<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    #[account(
        mut,
        seeds = [POSITION_SEED, position.receipt_mint.as_ref()],
        bump
    )]
    pub position: Box<Account<'info, StakedPosition>>,
    #[account(mut, address = config.reward_vault)]
    pub reward_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = config.reward_mint,
        token::authority = owner,
    )]
    pub owner_reward_account: Box<Account<'info, TokenAccount>>,
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ClaimRewardForOwner<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    #[account(mut, address = config.reward_vault)]
    pub reward_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = config.reward_mint,
        token::authority = owner,
    )]
    pub owner_reward_account: Box<Account<'info, TokenAccount>>,
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct Unstake<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    pub receipt_mint: Box<Account<'info, Mint>>,
    #[account(
        mut,
        seeds = [POSITION_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, StakedPosition>>,
    #[account(
        mut,
        seeds = [STAKER_SEED, owner.key().as_ref()],
        bump
    )]
    pub staker: Box<Account<'info, Staker>>,
    #[account(
        mut,
        seeds = [NFT_VAULT_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub nft_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = receipt_mint,
        token::authority = owner,
    )]
    pub owner_receipt_account: Box<Account<'info, TokenAccount>>,
    #[account(mut, address = config.reward_vault)]
    pub reward_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = config.reward_mint,
        token::authority = owner,
    )]
    pub owner_reward_account: Box<Account<'info, TokenAccount>>,
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct EmergencyUnstake<'info> {
    #[account(
        mut,
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Box<Account<'info, StakingConfig>>,
    pub receipt_mint: Box<Account<'info, Mint>>,
    #[account(
        mut,
        seeds = [POSITION_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub position: Box<Account<'info, StakedPosition>>,
    #[account(
        mut,
        seeds = [STAKER_SEED, owner.key().as_ref()],
        bump
    )]
    pub staker: Box<Account<'info, Staker>>,
    #[account(
        mut,
        seeds = [NFT_VAULT_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub nft_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = receipt_mint,
        token::authority = owner,
    )]
    pub owner_receipt_account: Box<Account<'info, TokenAccount>>,
    pub owner: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(owner: Pubkey)]
pub struct GetStakedTokens<'info> {
    #[account(
        seeds = [STAKER_SEED, owner.as_ref()],
        bump
    )]
    pub staker: Account<'info, Staker>,
}

#[derive(Accounts)]
pub struct GetPosition<'info> {
    #[account(
        seeds = [STAKING_CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, StakingConfig>,
    #[account(
        seeds = [POSITION_SEED, position.receipt_mint.as_ref()],
        bump
    )]
    pub position: Account<'info, StakedPosition>,
}

#[event]
pub struct RateToUsdUpdated {
    pub rate: u64,
}

#[event]
pub struct TierTableUpdated {
    pub tiers: Vec<TierStep>,
}

#[event]
pub struct StakingStarted {
    pub started_at: i64,
}

#[event]
pub struct TokensClaimableChanged {
    pub claimable: bool,
}

#[event]
pub struct Staked {
    pub owner: Pubkey,
    pub receipt_mint: Pubkey,
    pub token_id: u64,
    pub pegged_amount: u64,
}

#[event]
pub struct RewardUpdated {
    pub receipt_mint: Pubkey,
    pub earned: u64,
    pub accrued: u64,
}

#[event]
pub struct RewardClaimed {
    pub owner: Pubkey,
    pub positions: u32,
    pub reward: u64,
}

#[event]
pub struct Unstaked {
    pub owner: Pubkey,
    pub receipt_mint: Pubkey,
    pub reward: u64,
}

#[event]
pub struct EmergencyUnstaked {
    pub owner: Pubkey,
    pub receipt_mint: Pubkey,
    pub forfeited: u64,
}

#[error_code]
pub enum ErrorCode {
    #[msg("Only the staking admin can do this!")]
    Unauthorized,
    #[msg("Staking has not started")]
    NotStarted,
    #[msg("Staking has already started")]
    AlreadyStarted,
    #[msg("You must be owner!")]
    NotOwner,
    #[msg("Approve the receipt to the staking pool first")]
    NotApproved,
    #[msg("Receipt is already staked")]
    AlreadyStaked,
    #[msg("Receipt is not staked")]
    AlreadyWithdrawn,
    #[msg("Rewards are not claimable yet")]
    NotClaimable,
    #[msg("No reward to claim")]
    ZeroReward,
    #[msg("Reward vault cannot cover this payout")]
    InsufficientPoolLiquidity,
    #[msg("Tier thresholds must be strictly ascending")]
    InvalidTierTable,
    #[msg("Rate must be greater than zero")]
    InvalidRate,
    #[msg("Too many receipts staked by this owner")]
    TooManyStakedTokens,
    #[msg("Index out of range")]
    IndexOutOfRange,
    #[msg("The same position was passed twice")]
    DuplicatePosition,
    #[msg("Account is not a staked position")]
    InvalidPositionAccount,
    #[msg("Arithmetic overflow")]
    MathOverflow,
    #[msg("Bump not found")]
    BumpNotFound,
}
