use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

pub mod constants;
pub mod state;
pub mod token_ops;

use constants::*;
use state::*;

declare_id!("5k8jHvgMw3QMKpQie3Rp3xptPkP2LeF3FYaGdkfqsXrR");

#[program]
pub mod fund {
    use super::*;

    pub fn initialize(
        ctx: Context<Initialize>,
        fee_wallet: Pubkey,
        admin_wallet: Pubkey,
        fund_wallet: Pubkey,
    ) -> Result<()> {
        let bump = *ctx.bumps.get("fund_state").ok_or(ErrorCode::BumpNotFound)?;
        let fund_state = &mut ctx.accounts.fund_state;
        let admin = &ctx.accounts.admin;

        fund_state.admin = *admin.key;
        fund_state.init_mint = ctx.accounts.init_mint.key();
        fund_state.busd_mint = ctx.accounts.busd_mint.key();
        fund_state.init_vault = ctx.accounts.init_vault.key();
        fund_state.busd_vault = ctx.accounts.busd_vault.key();
        fund_state.fee_wallet = fee_wallet;
        fund_state.admin_wallet = admin_wallet;
        fund_state.fund_wallet = fund_wallet;
        fund_state.fee_bps = DEFAULT_FEE_BPS;
        fund_state.fund_bps = DEFAULT_FUND_BPS;
        fund_state.next_token_id = 1;
        fund_state.bump = bump;

        msg!("Fund initialized by {}", admin.key);

        Ok(())
    }

    pub fn set_paused(ctx: Context<UpdateFundConfig>, paused: bool) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.assert_admin(ctx.accounts.admin.key)?;

        fund_state.paused = paused;

        emit!(PauseChanged { paused });

        Ok(())
    }

    pub fn set_admin_wallet(ctx: Context<UpdateFundConfig>, admin_wallet: Pubkey) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.assert_admin(ctx.accounts.admin.key)?;

        fund_state.admin_wallet = admin_wallet;

        emit!(AdminWalletUpdated { admin_wallet });

        Ok(())
    }

    pub fn set_fee_wallet(ctx: Context<UpdateFundConfig>, fee_wallet: Pubkey) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.assert_admin(ctx.accounts.admin.key)?;

        fund_state.fee_wallet = fee_wallet;

        emit!(FeeWalletUpdated { fee_wallet });

        Ok(())
    }

    pub fn set_fund_wallet(ctx: Context<UpdateFundConfig>, fund_wallet: Pubkey) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.assert_admin(ctx.accounts.admin.key)?;

        fund_state.fund_wallet = fund_wallet;

        emit!(FundWalletUpdated { fund_wallet });

        Ok(())
    }

    pub fn set_split_rates(ctx: Context<UpdateFundConfig>, fee_bps: u16, fund_bps: u16) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.set_split_rates(ctx.accounts.admin.key, fee_bps, fund_bps)?;

        emit!(SplitRatesUpdated { fee_bps, fund_bps });

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        ctx: Context<CreatePool>,
        id: u64,
        name: String,
        description: String,
        sponsor: String,
        start_date: i64,
        end_date: i64,
    ) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.create_pool(
            ctx.accounts.admin.key,
            id,
            name.clone(),
            description,
            sponsor,
            start_date,
            end_date,
        )?;

        emit!(PoolCreated {
            pool_id: id,
            name,
            start_date,
            end_date,
        });

        Ok(())
    }

    pub fn get_pool_info(ctx: Context<ViewFund>, pool_id: u64) -> Result<PoolInfo> {
        ctx.accounts.fund_state.pool_info(pool_id)
    }

    pub fn get_pool_info_admin(ctx: Context<ViewFund>, pool_id: u64) -> Result<PoolAdminInfo> {
        ctx.accounts
            .fund_state
            .pool_admin_info(ctx.accounts.user.key, pool_id)
    }

    pub fn get_total_pools(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.total_pools)
    }

    pub fn get_total_staked_in_pool(ctx: Context<ViewFund>, pool_id: u64) -> Result<u64> {
        Ok(ctx.accounts.fund_state.pool(pool_id)?.total_busd_staked)
    }

    pub fn get_balance_in_pool(ctx: Context<ViewFund>, pool_id: u64) -> Result<u64> {
        Ok(ctx.accounts.fund_state.pool(pool_id)?.cumulative_busd)
    }

    pub fn get_total_investment(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.total_investment)
    }

    pub fn get_stakers_in_the_pool(ctx: Context<ViewFund>, pool_id: u64) -> Result<u32> {
        Ok(ctx.accounts.fund_state.pool(pool_id)?.stakers)
    }

    pub fn close_pool(
        ctx: Context<UpdateFundConfig>,
        pool_id: u64,
        expected_total_busd_stakes: u32,
        expected_total_staked_in_pool: u64,
    ) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.close_pool(
            ctx.accounts.admin.key,
            pool_id,
            expected_total_busd_stakes,
            expected_total_staked_in_pool,
        )?;

        emit!(PoolClosed { pool_id });

        Ok(())
    }

    pub fn add_stake_holder_in_pool(
        ctx: Context<AddStakeHolderInPool>,
        pool_id: u64,
        amount: u64,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let holder = ctx.accounts.holder.key();
        let allowance = token_ops::allowance(
            &ctx.accounts.holder_token_account,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        let index = fund_state.add_init_stake(
            &mut ctx.accounts.init_stake,
            holder,
            pool_id,
            amount,
            allowance,
            now,
        )?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::transfer_from_user(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.holder_token_account.to_account_info(),
            &ctx.accounts.init_vault.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            amount,
        )?;

        emit!(InitStaked {
            holder,
            pool_id,
            amount,
            index,
        });

        Ok(())
    }

    pub fn claim_init_stake_from_pool(
        ctx: Context<ClaimInitStakeFromPool>,
        pool_id: u64,
        index: u32,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let holder = ctx.accounts.holder.key();

        let fund_state = &mut ctx.accounts.fund_state;
        let amount = fund_state.claim_init_stake(
            &mut ctx.accounts.init_stake,
            &holder,
            pool_id,
            index,
            now,
        )?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::transfer_from_vault(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.init_vault.to_account_info(),
            &ctx.accounts.holder_token_account.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            amount,
        )?;

        emit!(InitStakeClaimed {
            holder,
            pool_id,
            amount,
            index,
        });

        Ok(())
    }

    pub fn is_holder_in_pool(ctx: Context<IsHolderInPool>, pool_id: u64, _address: Pubkey) -> Result<i64> {
        ctx.accounts.fund_state.pool(pool_id)?;
        let stake = InitStake::load(&ctx.accounts.init_stake.to_account_info());

        Ok(InitStake::membership_index(stake.as_ref()))
    }

    pub fn add_busd_stake_in_pool(
        ctx: Context<AddBusdStakeInPool>,
        pool_id: u64,
        amount: u64,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let holder = ctx.accounts.holder.key();
        let receipt_mint = ctx.accounts.receipt_mint.key();
        let init_stake = InitStake::load(&ctx.accounts.init_stake.to_account_info());
        let allowance = token_ops::allowance(
            &ctx.accounts.holder_busd_account,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        let split = fund_state.add_busd_stake(
            init_stake.as_ref(),
            &mut ctx.accounts.receipt,
            holder,
            receipt_mint,
            pool_id,
            amount,
            allowance,
            now,
        )?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        let token_program = ctx.accounts.token_program.to_account_info();
        let fund_state_info = ctx.accounts.fund_state.to_account_info();
        token_ops::transfer_from_user(
            &token_program,
            &ctx.accounts.holder_busd_account.to_account_info(),
            &ctx.accounts.busd_vault.to_account_info(),
            &fund_state_info,
            signer_seeds,
            amount,
        )?;
        token_ops::mint_receipt(
            &token_program,
            &ctx.accounts.receipt_mint.to_account_info(),
            &ctx.accounts.holder_receipt_account.to_account_info(),
            &fund_state_info,
            signer_seeds,
        )?;

        emit!(BusdStaked {
            holder,
            pool_id,
            token_id: ctx.accounts.receipt.token_id,
            receipt_mint,
            amount,
            fee: split.fee,
            admin_share: split.admin,
            fund_share: split.fund,
        });

        Ok(())
    }

    pub fn get_total_busd_stakes(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.total_busd_stakes)
    }

    pub fn get_total_init_stakes(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.total_init_stakes)
    }

    pub fn get_receipt_info(ctx: Context<GetReceiptInfo>) -> Result<ReceiptInfo> {
        Ok(ctx.accounts.receipt.info())
    }

    pub fn get_user_busd_balance(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.user_busd_balance(ctx.accounts.user.key))
    }

    pub fn settle_ledger(ctx: Context<SettleLedger>, pool_id: u64, amount: u64) -> Result<()> {
        let wallet = ctx.accounts.wallet.key();
        let allowance = token_ops::allowance(
            &ctx.accounts.busd_vault,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.settle_ledger(&wallet, pool_id, amount, allowance)?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::transfer_from_vault(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.busd_vault.to_account_info(),
            &ctx.accounts.wallet_busd_account.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            amount,
        )?;

        emit!(LedgerSettled {
            wallet,
            pool_id,
            amount,
        });

        Ok(())
    }

    pub fn approve_busd(ctx: Context<ApproveBusd>, amount: u64) -> Result<()> {
        let fund_state = &ctx.accounts.fund_state;
        fund_state.assert_admin(ctx.accounts.admin.key)?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::approve_vault(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.busd_vault.to_account_info(),
            &fund_state.to_account_info(),
            signer_seeds,
            amount,
        )?;

        msg!("Stable vault approved for {}", amount);
        emit!(BusdApproved { amount });

        Ok(())
    }

    pub fn get_busd_allowance(ctx: Context<GetBusdAllowance>) -> Result<u64> {
        Ok(token_ops::allowance(
            &ctx.accounts.busd_vault,
            &ctx.accounts.fund_state.key(),
        ))
    }

    pub fn start_voting(ctx: Context<UpdateFundConfig>, pool_id: u64) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        let round = fund_state.start_voting(ctx.accounts.admin.key, pool_id)?;

        emit!(VotingStarted { pool_id, round });

        Ok(())
    }

    pub fn close_voting(
        ctx: Context<UpdateFundConfig>,
        pool_id: u64,
        expected_tally_count: u32,
    ) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        let voting = fund_state.close_voting(ctx.accounts.admin.key, pool_id, expected_tally_count)?;

        emit!(VotingClosed {
            pool_id,
            round: voting.round,
            yes_votes: voting.yes_votes,
            no_votes: voting.no_votes,
        });

        Ok(())
    }

    pub fn cast_vote<'info>(
        ctx: Context<'_, '_, '_, 'info, CastVote<'info>>,
        pool_id: u64,
        support: bool,
        weight: Option<u64>,
    ) -> Result<()> {
        let voter = ctx.accounts.voter.key();
        let is_member = is_pool_member(
            &voter,
            pool_id,
            &ctx.accounts.init_stake.to_account_info(),
            ctx.remaining_accounts,
        )?;

        let fund_state = &mut ctx.accounts.fund_state;
        let weight = fund_state.cast_vote(
            &mut ctx.accounts.vote_record,
            voter,
            pool_id,
            is_member,
            support,
            weight,
        )?;

        emit!(VoteCast {
            voter,
            pool_id,
            round: ctx.accounts.vote_record.round,
            support,
            weight,
        });

        Ok(())
    }

    pub fn get_votes(ctx: Context<ViewFund>, pool_id: u64) -> Result<u64> {
        Ok(ctx.accounts.fund_state.pool(pool_id)?.voting.yes_votes)
    }

    pub fn get_votings_amount(ctx: Context<ViewFund>) -> Result<u64> {
        Ok(ctx.accounts.fund_state.votings_amount)
    }

    pub fn fund_pool(ctx: Context<FundPool>, pool_id: u64, amount: u64) -> Result<()> {
        let allowance = token_ops::allowance(
            &ctx.accounts.funder_busd_account,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        let pulled = fund_state.fund_pool(pool_id, amount, allowance)?;
        let is_funded = fund_state.pool(pool_id)?.is_funded;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::transfer_from_user(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.funder_busd_account.to_account_info(),
            &ctx.accounts.busd_vault.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            pulled,
        )?;

        msg!("Pool {} funded with {} of {} offered", pool_id, pulled, amount);
        emit!(PoolFunded {
            pool_id,
            funder: ctx.accounts.funder.key(),
            amount: pulled,
            is_funded,
        });

        Ok(())
    }

    pub fn withdraw_busd_reward_with_token(ctx: Context<WithdrawBusdRewardWithToken>) -> Result<()> {
        let holder = ctx.accounts.holder.key();
        let receipt_mint = ctx.accounts.receipt_mint.key();
        if !token_ops::holds_nft(&ctx.accounts.holder_receipt_account, &holder, &receipt_mint) {
            return Err(ErrorCode::NotOwner.into());
        }
        let allowance = token_ops::allowance(
            &ctx.accounts.busd_vault,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        let (principal, reward) =
            fund_state.withdraw_with_receipt(&mut ctx.accounts.receipt, allowance)?;
        let payout = principal.checked_add(reward).ok_or(ErrorCode::MathOverflow)?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        let token_program = ctx.accounts.token_program.to_account_info();
        token_ops::transfer_from_vault(
            &token_program,
            &ctx.accounts.busd_vault.to_account_info(),
            &ctx.accounts.holder_busd_account.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            payout,
        )?;
        token_ops::burn_receipt(
            &token_program,
            &ctx.accounts.receipt_mint.to_account_info(),
            &ctx.accounts.holder_receipt_account.to_account_info(),
            &ctx.accounts.holder.to_account_info(),
        )?;

        emit!(RewardWithdrawn {
            holder,
            pool_id: ctx.accounts.receipt.pool_id,
            token_id: ctx.accounts.receipt.token_id,
            principal,
            reward,
        });

        Ok(())
    }

    pub fn update_rewards(
        ctx: Context<UpdateFundConfig>,
        pools_amount: u64,
        pool_id: u64,
        percentage: u16,
    ) -> Result<()> {
        let fund_state = &mut ctx.accounts.fund_state;
        fund_state.update_rewards(ctx.accounts.admin.key, pools_amount, pool_id, percentage)?;
        let is_funded = fund_state.pool(pool_id)?.is_funded;

        emit!(RewardsUpdated {
            pool_id,
            percentage,
            is_funded,
        });

        Ok(())
    }

    pub fn emergency_withdraw_rewards_to_admin(
        ctx: Context<EmergencyWithdrawRewardsToAdmin>,
        pool_id: u64,
    ) -> Result<()> {
        let allowance = token_ops::allowance(
            &ctx.accounts.busd_vault,
            &ctx.accounts.fund_state.key(),
        );

        let fund_state = &mut ctx.accounts.fund_state;
        let amount = fund_state.emergency_withdraw(ctx.accounts.admin.key, pool_id, allowance)?;

        let bump_seed = [fund_state.bump];
        let signer_seeds: &[&[&[u8]]] = &[&[FUND_STATE_SEED, &bump_seed]];
        token_ops::transfer_from_vault(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.busd_vault.to_account_info(),
            &ctx.accounts.admin_wallet_account.to_account_info(),
            &ctx.accounts.fund_state.to_account_info(),
            signer_seeds,
            amount,
        )?;

        msg!("Emergency withdrawal of {} from pool {}", amount, pool_id);
        emit!(EmergencyWithdrawn { pool_id, amount });

        Ok(())
    }
}

/// A voter is a member of a pool through an open init stake, or by holding an
/// open receipt of the pool passed as `[receipt, token_account]` remaining accounts.
fn is_pool_member<'info>(
    voter: &Pubkey,
    pool_id: u64,
    init_stake: &AccountInfo<'info>,
    remaining_accounts: &[AccountInfo<'info>],
) -> Result<bool> {
    let has_init_stake = InitStake::load(init_stake)
        .map_or(false, |stake| stake.is_open_for(voter, pool_id));
    if has_init_stake {
        return Ok(true);
    }

    if let [receipt_info, token_info, ..] = remaining_accounts {
        let receipt = match Receipt::load(receipt_info) {
            Some(receipt) => receipt,
            None => return Ok(false),
        };
        let token_account: Account<TokenAccount> = Account::try_from(token_info)?;

        return Ok(receipt.is_open_in(pool_id)
            && token_ops::holds_nft(&token_account, voter, &receipt.mint));
    }

    Ok(false)
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = admin,
        space = FundState::space_for(0),
        seeds = [FUND_STATE_SEED],
        bump
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    pub init_mint: Box<Account<'info, Mint>>,
    pub busd_mint: Box<Account<'info, Mint>>,
    #[account(
        init,
        payer = admin,
        seeds = [INIT_VAULT_SEED],
        bump,
        token::mint = init_mint,
        token::authority = fund_state,
    )]
    pub init_vault: Box<Account<'info, TokenAccount>>,
    #[account(
        init,
        payer = admin,
        seeds = [BUSD_VAULT_SEED],
        bump,
        token::mint = busd_mint,
        token::authority = fund_state,
    )]
    pub busd_vault: Box<Account<'info, TokenAccount>>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct UpdateFundConfig<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Account<'info, FundState>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct ViewFund<'info> {
    #[account(
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Account<'info, FundState>,
    pub user: Signer<'info>,
}

#[derive(Accounts)]
pub struct CreatePool<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
        realloc = FundState::space_for(fund_state.pools.len() + 1),
        realloc::payer = admin,
        realloc::zero = false
    )]
    pub fund_state: Account<'info, FundState>,
    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(pool_id: u64)]
pub struct AddStakeHolderInPool<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(
        init_if_needed,
        payer = holder,
        space = InitStake::LEN,
        seeds = [INIT_STAKE_SEED, &pool_id.to_le_bytes(), holder.key().as_ref()],
        bump
    )]
    pub init_stake: Account<'info, InitStake>,
    #[account(
        mut,
        token::mint = fund_state.init_mint,
        token::authority = holder,
    )]
    pub holder_token_account: Account<'info, TokenAccount>,
    #[account(mut, address = fund_state.init_vault)]
    pub init_vault: Account<'info, TokenAccount>,
    #[account(mut)]
    pub holder: Signer<'info>,
    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(pool_id: u64)]
pub struct ClaimInitStakeFromPool<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(
        mut,
        seeds = [INIT_STAKE_SEED, &pool_id.to_le_bytes(), holder.key().as_ref()],
        bump
    )]
    pub init_stake: Account<'info, InitStake>,
    #[account(
        mut,
        token::mint = fund_state.init_mint,
        token::authority = holder,
    )]
    pub holder_token_account: Account<'info, TokenAccount>,
    #[account(mut, address = fund_state.init_vault)]
    pub init_vault: Account<'info, TokenAccount>,
    pub holder: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
#[instruction(pool_id: u64, address: Pubkey)]
pub struct IsHolderInPool<'info> {
    #[account(
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Account<'info, FundState>,
    /// CHECK: may not exist yet, read through `InitStake::load`.
    #[account(
        seeds = [INIT_STAKE_SEED, &pool_id.to_le_bytes(), address.as_ref()],
        bump
    )]
    pub init_stake: UncheckedAccount<'info>,
}

#[derive(Accounts)]
#[instruction(pool_id: u64)]
pub struct AddBusdStakeInPool<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    /// CHECK: may not exist, read through `InitStake::load`.
    #[account(
        seeds = [INIT_STAKE_SEED, &pool_id.to_le_bytes(), holder.key().as_ref()],
        bump
    )]
    pub init_stake: UncheckedAccount<'info>,
    #[account(
        init,
        payer = holder,
        mint::decimals = 0,
        mint::authority = fund_state,
    )]
    pub receipt_mint: Box<Account<'info, Mint>>,
    #[account(
        init,
        payer = holder,
        space = Receipt::LEN,
        seeds = [RECEIPT_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub receipt: Box<Account<'info, Receipt>>,
    #[account(
        init,
        payer = holder,
        associated_token::mint = receipt_mint,
        associated_token::authority = holder,
    )]
    pub holder_receipt_account: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = fund_state.busd_mint,
        token::authority = holder,
    )]
    pub holder_busd_account: Box<Account<'info, TokenAccount>>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Box<Account<'info, TokenAccount>>,
    #[account(mut)]
    pub holder: Signer<'info>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct GetReceiptInfo<'info> {
    #[account(
        seeds = [RECEIPT_SEED, receipt.mint.as_ref()],
        bump
    )]
    pub receipt: Account<'info, Receipt>,
}

#[derive(Accounts)]
pub struct SettleLedger<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(
        mut,
        token::mint = fund_state.busd_mint,
        token::authority = wallet,
    )]
    pub wallet_busd_account: Account<'info, TokenAccount>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Account<'info, TokenAccount>,
    pub wallet: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ApproveBusd<'info> {
    #[account(
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Account<'info, FundState>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Account<'info, TokenAccount>,
    pub admin: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct GetBusdAllowance<'info> {
    #[account(
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Account<'info, FundState>,
    #[account(address = fund_state.busd_vault)]
    pub busd_vault: Account<'info, TokenAccount>,
}

#[derive(Accounts)]
#[instruction(pool_id: u64)]
pub struct CastVote<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    /// CHECK: may not exist, read through `InitStake::load`.
    #[account(
        seeds = [INIT_STAKE_SEED, &pool_id.to_le_bytes(), voter.key().as_ref()],
        bump
    )]
    pub init_stake: UncheckedAccount<'info>,
    #[account(
        init_if_needed,
        payer = voter,
        space = VoteRecord::LEN,
        seeds = [VOTE_SEED, &pool_id.to_le_bytes(), voter.key().as_ref()],
        bump
    )]
    pub vote_record: Account<'info, VoteRecord>,
    #[account(mut)]
    pub voter: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct FundPool<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(
        mut,
        token::mint = fund_state.busd_mint,
        token::authority = funder,
    )]
    pub funder_busd_account: Account<'info, TokenAccount>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Account<'info, TokenAccount>,
    pub funder: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct WithdrawBusdRewardWithToken<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(
        mut,
        seeds = [RECEIPT_SEED, receipt_mint.key().as_ref()],
        bump
    )]
    pub receipt: Box<Account<'info, Receipt>>,
    #[account(mut)]
    pub receipt_mint: Box<Account<'info, Mint>>,
    #[account(mut)]
    pub holder_receipt_account: Box<Account<'info, TokenAccount>>,
    #[account(
        mut,
        token::mint = fund_state.busd_mint,
        token::authority = holder,
    )]
    pub holder_busd_account: Box<Account<'info, TokenAccount>>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Box<Account<'info, TokenAccount>>,
    pub holder: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct EmergencyWithdrawRewardsToAdmin<'info> {
    #[account(
        mut,
        seeds = [FUND_STATE_SEED],
        bump = fund_state.bump,
    )]
    pub fund_state: Box<Account<'info, FundState>>,
    #[account(mut, address = fund_state.busd_vault)]
    pub busd_vault: Account<'info, TokenAccount>,
    #[account(
        mut,
        token::mint = fund_state.busd_mint,
        token::authority = fund_state.admin_wallet,
    )]
    pub admin_wallet_account: Account<'info, TokenAccount>,
    pub admin: Signer<'info>,
    pub token_program: Program<'info, Token>,
}

#[event]
pub struct PauseChanged {
    pub paused: bool,
}

#[event]
pub struct AdminWalletUpdated {
    pub admin_wallet: Pubkey,
}

#[event]
pub struct FeeWalletUpdated {
    pub fee_wallet: Pubkey,
}

#[event]
pub struct FundWalletUpdated {
    pub fund_wallet: Pubkey,
}

#[event]
pub struct SplitRatesUpdated {
    pub fee_bps: u16,
    pub fund_bps: u16,
}

#[event]
pub struct PoolCreated {
    pub pool_id: u64,
    pub name: String,
    pub start_date: i64,
    pub end_date: i64,
}

#[event]
pub struct PoolClosed {
    pub pool_id: u64,
}

#[event]
pub struct InitStaked {
    pub holder: Pubkey,
    pub pool_id: u64,
    pub amount: u64,
    pub index: u32,
}

#[event]
pub struct InitStakeClaimed {
    pub holder: Pubkey,
    pub pool_id: u64,
    pub amount: u64,
    pub index: u32,
}

#[event]
pub struct BusdStaked {
    pub holder: Pubkey,
    pub pool_id: u64,
    pub token_id: u64,
    pub receipt_mint: Pubkey,
    pub amount: u64,
    pub fee: u64,
    pub admin_share: u64,
    pub fund_share: u64,
}

#[event]
pub struct LedgerSettled {
    pub wallet: Pubkey,
    pub pool_id: u64,
    pub amount: u64,
}

#[event]
pub struct BusdApproved {
    pub amount: u64,
}

#[event]
pub struct VotingStarted {
    pub pool_id: u64,
    pub round: u32,
}

#[event]
pub struct VotingClosed {
    pub pool_id: u64,
    pub round: u32,
    pub yes_votes: u64,
    pub no_votes: u64,
}

#[event]
pub struct VoteCast {
    pub voter: Pubkey,
    pub pool_id: u64,
    pub round: u32,
    pub support: bool,
    pub weight: u64,
}

#[event]
pub struct PoolFunded {
    pub pool_id: u64,
    pub funder: Pubkey,
    pub amount: u64,
    pub is_funded: bool,
}

#[event]
pub struct RewardWithdrawn {
    pub holder: Pubkey,
    pub pool_id: u64,
    pub token_id: u64,
    pub principal: u64,
    pub reward: u64,
}

#[event]
pub struct RewardsUpdated {
    pub pool_id: u64,
    pub percentage: u16,
    pub is_funded: bool,
}

#[event]
pub struct EmergencyWithdrawn {
    pub pool_id: u64,
    pub amount: u64,
}

#[error_code]
pub enum ErrorCode {
    #[msg("Only the fund admin can do this!")]
    Unauthorized,
    #[msg("The fund is paused!")]
    ErrorForPause,
    #[msg("Pool does not exist")]
    PoolNotFound,
    #[msg("A pool with this id already exists")]
    DuplicatePool,
    #[msg("The fund already holds the maximum number of pools")]
    TooManyPools,
    #[msg("Pool is closed")]
    PoolClosed,
    #[msg("Pool is not funded")]
    PoolNotFunded,
    #[msg("Pool is already fully funded")]
    AlreadyFunded,
    #[msg("Name, description or sponsor is too long")]
    FieldTooLong,
    #[msg("Pool must end after it starts")]
    InvalidPoolDates,
    #[msg("Amount is below the minimum stake")]
    BelowMinimum,
    #[msg("Amount must be greater than zero")]
    ZeroAmount,
    #[msg("Holder already staked in this pool")]
    DuplicateStake,
    #[msg("Approve more tokens before this call")]
    InsufficientAllowance,
    #[msg("Init stake is still locked")]
    LockActive,
    #[msg("You must be owner!")]
    NotOwner,
    #[msg("Already claimed")]
    AlreadyClaimed,
    #[msg("Stake the utility token in this pool first")]
    NoInitStake,
    #[msg("Not enough liquidity for this payout")]
    InsufficientLiquidity,
    #[msg("Nothing to withdraw")]
    NothingToWithdraw,
    #[msg("Pool ledger has no room for another wallet")]
    LedgerFull,
    #[msg("Fee and fund shares exceed 100%")]
    InvalidSplit,
    #[msg("Reward percentage is too high")]
    InvalidPercentage,
    #[msg("Expected totals do not match the pool")]
    StaleAggregate,
    #[msg("Only pool members can vote")]
    NotAMember,
    #[msg("No voting round is open")]
    VotingClosed,
    #[msg("A voting round is already open")]
    VotingAlreadyOpen,
    #[msg("Already voted in this round")]
    AlreadyVoted,
    #[msg("Vote weight must be greater than zero")]
    InvalidVoteWeight,
    #[msg("Arithmetic overflow")]
    MathOverflow,
    #[msg("Bump not found")]
    BumpNotFound,
}
