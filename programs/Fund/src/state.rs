use anchor_lang::prelude::*;

use crate::constants::*;
use crate::ErrorCode;

#[account]
pub struct FundState {
    pub admin: Pubkey,
    pub init_mint: Pubkey,
    pub busd_mint: Pubkey,
    pub init_vault: Pubkey,
    pub busd_vault: Pubkey,
    pub fee_wallet: Pubkey,
    pub admin_wallet: Pubkey,
    pub fund_wallet: Pubkey,
    pub fee_bps: u16,
    pub fund_bps: u16,
    pub paused: bool,
    pub total_pools: u64,
    pub total_init_stakes: u64,
    pub total_busd_stakes: u64,
    pub total_investment: u64,
    pub votings_amount: u64,
    pub next_token_id: u64,
    pub pools: Vec<Pool>,
    pub bump: u8,
}

#[derive(AnchorDeserialize, AnchorSerialize, Clone, Default, Debug)]
pub struct Pool {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub sponsor: String,
    pub start_date: i64,
    pub end_date: i64,
    pub is_active: bool,
    pub is_funded: bool,
    /// Holders with an open init stake.
    pub stakers: u32,
    pub next_init_index: u32,
    pub total_init_staked: u64,
    /// Principal of the receipts that are still open.
    pub total_busd_staked: u64,
    pub busd_stake_count: u32,
    /// Principal of every receipt ever minted for the pool.
    pub cumulative_busd: u64,
    /// Stable currency held in the vault on behalf of this pool.
    pub custodied: u64,
    /// Funding set aside for receipt payouts.
    pub reserve: u64,
    pub funded_amount: u64,
    pub reward_percentage: u16,
    pub ledger: Vec<LedgerEntry>,
    pub voting: VotingRound,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub wallet: Pubkey,
    pub amount: u64,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct VotingRound {
    pub round: u32,
    pub is_open: bool,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub voters: u32,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Claimed,
}

impl Default for PositionStatus {
    fn default() -> Self {
        PositionStatus::Open
    }
}

#[account]
#[derive(Default)]
pub struct InitStake {
    pub holder: Pubkey,
    pub pool_id: u64,
    pub amount: u64,
    pub deposited_at: i64,
    pub index: u32,
    pub status: PositionStatus,
}

#[account]
#[derive(Default)]
pub struct Receipt {
    pub token_id: u64,
    pub mint: Pubkey,
    pub pool_id: u64,
    pub pegged_amount: u64,
    pub minted_to: Pubkey,
    pub minted_at: i64,
    pub status: PositionStatus,
}

#[account]
#[derive(Default)]
pub struct VoteRecord {
    pub pool_id: u64,
    pub round: u32,
    pub voter: Pubkey,
    pub support: bool,
    pub weight: u64,
}

/// Public projection of a pool.
#[derive(AnchorDeserialize, AnchorSerialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub sponsor: String,
    pub start_date: i64,
    pub end_date: i64,
    pub is_active: bool,
    pub is_funded: bool,
    pub stakers: u32,
    pub total_init_staked: u64,
    pub total_busd_staked: u64,
}

/// Everything in [`PoolInfo`] plus the funding internals.
#[derive(AnchorDeserialize, AnchorSerialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolAdminInfo {
    pub info: PoolInfo,
    pub busd_stake_count: u32,
    pub cumulative_busd: u64,
    pub custodied: u64,
    pub reserve: u64,
    pub funded_amount: u64,
    pub reward_percentage: u16,
    pub unmet_requirement: u64,
    pub ledger: Vec<LedgerEntry>,
    pub voting: VotingRound,
}

#[derive(AnchorDeserialize, AnchorSerialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub token_id: u64,
    pub pool_id: u64,
    pub pegged_amount: u64,
    pub status: PositionStatus,
}

/// How one stable-currency contribution is divided between the wallets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContributionSplit {
    pub fee: u64,
    pub fund: u64,
    pub admin: u64,
}

impl ContributionSplit {
    pub fn compute(amount: u64, fee_bps: u16, fund_bps: u16) -> Result<Self> {
        require!(
            fee_bps as u64 + fund_bps as u64 <= BPS_DENOMINATOR,
            ErrorCode::InvalidSplit
        );
        let fee = bps_share(amount, fee_bps);
        let fund = bps_share(amount, fund_bps);
        let admin = amount
            .checked_sub(fee)
            .and_then(|rest| rest.checked_sub(fund))
            .ok_or(ErrorCode::MathOverflow)?;

        Ok(ContributionSplit { fee, fund, admin })
    }
}

// bps is capped at BPS_DENOMINATOR so the share never exceeds `amount`.
fn bps_share(amount: u64, bps: u16) -> u64 {
    (amount as u128 * bps as u128 / BPS_DENOMINATOR as u128) as u64
}

impl FundState {
    pub const BASE_LEN: usize = 8 + // discriminator
        32 * 8 + // admin, mints, vaults, wallets
        2 + 2 + 1 + // split rates, paused
        8 * 6 + // counters
        4 + // pools vec prefix
        1; // bump

    pub fn space_for(pools: usize) -> usize {
        Self::BASE_LEN + pools * Pool::SPACE
    }

    pub fn assert_admin(&self, caller: &Pubkey) -> Result<()> {
        require!(self.admin == *caller, ErrorCode::Unauthorized);
        Ok(())
    }

    pub fn assert_not_paused(&self) -> Result<()> {
        require!(!self.paused, ErrorCode::ErrorForPause);
        Ok(())
    }

    pub fn pool(&self, pool_id: u64) -> Result<&Pool> {
        self.pools
            .iter()
            .find(|pool| pool.id == pool_id)
            .ok_or_else(|| error!(ErrorCode::PoolNotFound))
    }

    pub fn pool_mut(&mut self, pool_id: u64) -> Result<&mut Pool> {
        self.pools
            .iter_mut()
            .find(|pool| pool.id == pool_id)
            .ok_or_else(|| error!(ErrorCode::PoolNotFound))
    }

    fn active_pool_mut(&mut self, pool_id: u64) -> Result<&mut Pool> {
        let pool = self.pool_mut(pool_id)?;
        require!(pool.is_active, ErrorCode::PoolClosed);
        Ok(pool)
    }

    pub fn set_split_rates(&mut self, caller: &Pubkey, fee_bps: u16, fund_bps: u16) -> Result<()> {
        self.assert_admin(caller)?;
        require!(
            fee_bps as u64 + fund_bps as u64 <= BPS_DENOMINATOR,
            ErrorCode::InvalidSplit
        );
        self.fee_bps = fee_bps;
        self.fund_bps = fund_bps;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        &mut self,
        caller: &Pubkey,
        id: u64,
        name: String,
        description: String,
        sponsor: String,
        start_date: i64,
        end_date: i64,
    ) -> Result<()> {
        self.assert_admin(caller)?;
        require!(
            self.pools.iter().all(|pool| pool.id != id),
            ErrorCode::DuplicatePool
        );
        require!(
            name.len() <= MAX_NAME_LEN
                && description.len() <= MAX_DESCRIPTION_LEN
                && sponsor.len() <= MAX_SPONSOR_LEN,
            ErrorCode::FieldTooLong
        );
        require!(end_date > start_date, ErrorCode::InvalidPoolDates);
        require!(self.pools.len() < MAX_POOLS, ErrorCode::TooManyPools);

        self.pools.push(Pool {
            id,
            name,
            description,
            sponsor,
            start_date,
            end_date,
            is_active: true,
            ..Pool::default()
        });
        self.total_pools = self.total_pools.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

        Ok(())
    }

    pub fn close_pool(
        &mut self,
        caller: &Pubkey,
        pool_id: u64,
        expected_total_busd_stakes: u32,
        expected_total_staked_in_pool: u64,
    ) -> Result<()> {
        self.assert_admin(caller)?;
        let pool = self.active_pool_mut(pool_id)?;
        require!(pool.is_funded, ErrorCode::PoolNotFunded);
        require!(
            pool.busd_stake_count == expected_total_busd_stakes
                && pool.total_busd_staked == expected_total_staked_in_pool,
            ErrorCode::StaleAggregate
        );

        pool.is_active = false;
        pool.voting.is_open = false;

        Ok(())
    }

    pub fn add_init_stake(
        &mut self,
        stake: &mut InitStake,
        holder: Pubkey,
        pool_id: u64,
        amount: u64,
        allowance: u64,
        now: i64,
    ) -> Result<u32> {
        self.assert_not_paused()?;
        let pool = self.active_pool_mut(pool_id)?;
        require!(stake.holder == Pubkey::default(), ErrorCode::DuplicateStake);
        require!(amount >= MIN_INIT_STAKE, ErrorCode::BelowMinimum);
        require!(allowance >= amount, ErrorCode::InsufficientAllowance);

        let index = pool.next_init_index;
        pool.next_init_index = index.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        pool.stakers = pool.stakers.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        pool.total_init_staked = pool
            .total_init_staked
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;

        *stake = InitStake {
            holder,
            pool_id,
            amount,
            deposited_at: now,
            index,
            status: PositionStatus::Open,
        };
        self.total_init_stakes = self
            .total_init_stakes
            .checked_add(1)
            .ok_or(ErrorCode::MathOverflow)?;

        Ok(index)
    }

    pub fn claim_init_stake(
        &mut self,
        stake: &mut InitStake,
        caller: &Pubkey,
        pool_id: u64,
        index: u32,
        now: i64,
    ) -> Result<u64> {
        self.assert_not_paused()?;
        let pool = self.pool_mut(pool_id)?;
        require!(
            stake.holder == *caller && stake.pool_id == pool_id && stake.index == index,
            ErrorCode::NotOwner
        );
        require!(stake.status == PositionStatus::Open, ErrorCode::AlreadyClaimed);
        require!(stake.is_unlocked(now), ErrorCode::LockActive);
        require!(pool.is_active, ErrorCode::PoolClosed);

        pool.stakers = pool.stakers.checked_sub(1).ok_or(ErrorCode::MathOverflow)?;
        pool.total_init_staked = pool
            .total_init_staked
            .checked_sub(stake.amount)
            .ok_or(ErrorCode::MathOverflow)?;
        stake.status = PositionStatus::Claimed;

        Ok(stake.amount)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_busd_stake(
        &mut self,
        init_stake: Option<&InitStake>,
        receipt: &mut Receipt,
        holder: Pubkey,
        receipt_mint: Pubkey,
        pool_id: u64,
        amount: u64,
        allowance: u64,
        now: i64,
    ) -> Result<ContributionSplit> {
        self.assert_not_paused()?;
        let (fee_bps, fund_bps) = (self.fee_bps, self.fund_bps);
        let (fee_wallet, fund_wallet, admin_wallet) =
            (self.fee_wallet, self.fund_wallet, self.admin_wallet);
        let token_id = self.next_token_id;

        let pool = self.active_pool_mut(pool_id)?;
        let has_init_stake = init_stake.map_or(false, |stake| stake.is_open_for(&holder, pool_id));
        require!(has_init_stake, ErrorCode::NoInitStake);
        require!(amount >= MIN_BUSD_STAKE, ErrorCode::BelowMinimum);
        require!(allowance >= amount, ErrorCode::InsufficientAllowance);

        let split = ContributionSplit::compute(amount, fee_bps, fund_bps)?;
        pool.credit(fee_wallet, split.fee)?;
        pool.credit(fund_wallet, split.fund)?;
        pool.credit(admin_wallet, split.admin)?;
        pool.custodied = pool.custodied.checked_add(amount).ok_or(ErrorCode::MathOverflow)?;
        pool.total_busd_staked = pool
            .total_busd_staked
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        pool.cumulative_busd = pool
            .cumulative_busd
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;
        pool.busd_stake_count = pool
            .busd_stake_count
            .checked_add(1)
            .ok_or(ErrorCode::MathOverflow)?;
        pool.refresh_funded()?;

        *receipt = Receipt {
            token_id,
            mint: receipt_mint,
            pool_id,
            pegged_amount: amount,
            minted_to: holder,
            minted_at: now,
            status: PositionStatus::Open,
        };

        self.next_token_id = token_id.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        self.total_busd_stakes = self
            .total_busd_stakes
            .checked_add(1)
            .ok_or(ErrorCode::MathOverflow)?;
        self.total_investment = self
            .total_investment
            .checked_add(amount)
            .ok_or(ErrorCode::MathOverflow)?;

        Ok(split)
    }

    /// Virtual stable-currency credit of `wallet` summed over every pool.
    pub fn user_busd_balance(&self, wallet: &Pubkey) -> u64 {
        self.pools
            .iter()
            .fold(0u64, |total, pool| total.saturating_add(pool.credit_of(wallet)))
    }

    pub fn settle_ledger(
        &mut self,
        wallet: &Pubkey,
        pool_id: u64,
        amount: u64,
        allowance: u64,
    ) -> Result<()> {
        let pool = self.pool_mut(pool_id)?;
        let credit = pool.credit_of(wallet);
        require!(credit > 0, ErrorCode::NothingToWithdraw);
        require!(amount > 0, ErrorCode::ZeroAmount);
        require!(
            amount <= credit && amount <= pool.custodied,
            ErrorCode::InsufficientLiquidity
        );
        require!(allowance >= amount, ErrorCode::InsufficientAllowance);

        pool.debit(wallet, amount)?;
        pool.custodied = pool.custodied.checked_sub(amount).ok_or(ErrorCode::MathOverflow)?;

        Ok(())
    }

    /// Returns the amount actually pulled from the funder.
    pub fn fund_pool(&mut self, pool_id: u64, amount: u64, allowance: u64) -> Result<u64> {
        let pool = self.active_pool_mut(pool_id)?;
        require!(amount > 0, ErrorCode::ZeroAmount);
        let unmet = pool.unmet_requirement()?;
        if unmet == 0 {
            require!(!pool.is_funded, ErrorCode::AlreadyFunded);
            pool.is_funded = true;
            return Ok(0);
        }

        let pulled = amount.min(unmet);
        require!(allowance >= pulled, ErrorCode::InsufficientAllowance);

        pool.reserve = pool.reserve.checked_add(pulled).ok_or(ErrorCode::MathOverflow)?;
        pool.custodied = pool.custodied.checked_add(pulled).ok_or(ErrorCode::MathOverflow)?;
        pool.funded_amount = pool
            .funded_amount
            .checked_add(pulled)
            .ok_or(ErrorCode::MathOverflow)?;
        pool.is_funded = pool.unmet_requirement()? == 0;

        Ok(pulled)
    }

    pub fn update_rewards(
        &mut self,
        caller: &Pubkey,
        pools_amount: u64,
        pool_id: u64,
        percentage: u16,
    ) -> Result<()> {
        self.assert_admin(caller)?;
        let pool = self.active_pool_mut(pool_id)?;
        require!(pools_amount == pool.total_busd_staked, ErrorCode::StaleAggregate);
        require!(percentage <= MAX_REWARD_PERCENTAGE, ErrorCode::InvalidPercentage);

        pool.reward_percentage = percentage;
        pool.refresh_funded()?;

        Ok(())
    }

    /// Pays a receipt out of the pool reserve. Returns `(principal, reward)`.
    pub fn withdraw_with_receipt(
        &mut self,
        receipt: &mut Receipt,
        allowance: u64,
    ) -> Result<(u64, u64)> {
        self.assert_not_paused()?;
        let pool = self.pool_mut(receipt.pool_id)?;
        require!(pool.is_funded, ErrorCode::PoolNotFunded);
        require!(receipt.status == PositionStatus::Open, ErrorCode::AlreadyClaimed);
        require!(pool.is_active, ErrorCode::PoolClosed);

        let principal = receipt.pegged_amount;
        let reward = pool.reward_for(principal)?;
        let payout = principal.checked_add(reward).ok_or(ErrorCode::MathOverflow)?;
        require!(payout <= pool.reserve, ErrorCode::InsufficientLiquidity);
        require!(allowance >= payout, ErrorCode::InsufficientAllowance);

        pool.reserve -= payout;
        pool.custodied = pool.custodied.checked_sub(payout).ok_or(ErrorCode::MathOverflow)?;
        pool.total_busd_staked = pool
            .total_busd_staked
            .checked_sub(principal)
            .ok_or(ErrorCode::MathOverflow)?;
        pool.busd_stake_count = pool
            .busd_stake_count
            .checked_sub(1)
            .ok_or(ErrorCode::MathOverflow)?;
        receipt.status = PositionStatus::Claimed;

        Ok((principal, reward))
    }

    pub fn emergency_withdraw(
        &mut self,
        caller: &Pubkey,
        pool_id: u64,
        allowance: u64,
    ) -> Result<u64> {
        self.assert_admin(caller)?;
        let pool = self.pool_mut(pool_id)?;
        require!(pool.funded_amount > 0, ErrorCode::PoolNotFunded);
        require!(pool.reserve > 0, ErrorCode::NothingToWithdraw);

        let amount = pool.reserve;
        require!(allowance >= amount, ErrorCode::InsufficientAllowance);

        pool.reserve = 0;
        pool.custodied = pool.custodied.checked_sub(amount).ok_or(ErrorCode::MathOverflow)?;
        pool.refresh_funded()?;

        Ok(amount)
    }

    pub fn start_voting(&mut self, caller: &Pubkey, pool_id: u64) -> Result<u32> {
        self.assert_admin(caller)?;
        let pool = self.active_pool_mut(pool_id)?;
        require!(!pool.voting.is_open, ErrorCode::VotingAlreadyOpen);

        let round = pool.voting.round.checked_add(1).ok_or(ErrorCode::MathOverflow)?;
        pool.voting = VotingRound {
            round,
            is_open: true,
            ..VotingRound::default()
        };
        self.votings_amount = self
            .votings_amount
            .checked_add(1)
            .ok_or(ErrorCode::MathOverflow)?;

        Ok(round)
    }

    pub fn close_voting(
        &mut self,
        caller: &Pubkey,
        pool_id: u64,
        expected_tally_count: u32,
    ) -> Result<VotingRound> {
        self.assert_admin(caller)?;
        let pool = self.pool_mut(pool_id)?;
        require!(pool.voting.is_open, ErrorCode::VotingClosed);
        require!(
            pool.voting.voters == expected_tally_count,
            ErrorCode::StaleAggregate
        );

        pool.voting.is_open = false;

        Ok(pool.voting)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn cast_vote(
        &mut self,
        record: &mut VoteRecord,
        voter: Pubkey,
        pool_id: u64,
        is_member: bool,
        support: bool,
        weight: Option<u64>,
    ) -> Result<u64> {
        self.assert_not_paused()?;
        let pool = self.pool_mut(pool_id)?;
        require!(is_member, ErrorCode::NotAMember);
        require!(pool.voting.is_open, ErrorCode::VotingClosed);
        // rounds start at 1, so a fresh record never matches
        require!(
            !(record.voter == voter && record.round == pool.voting.round),
            ErrorCode::AlreadyVoted
        );

        let weight = weight.unwrap_or(1);
        require!(weight > 0, ErrorCode::InvalidVoteWeight);

        if support {
            pool.voting.yes_votes = pool
                .voting
                .yes_votes
                .checked_add(weight)
                .ok_or(ErrorCode::MathOverflow)?;
        } else {
            pool.voting.no_votes = pool
                .voting
                .no_votes
                .checked_add(weight)
                .ok_or(ErrorCode::MathOverflow)?;
        }
        pool.voting.voters = pool.voting.voters.checked_add(1).ok_or(ErrorCode::MathOverflow)?;

        *record = VoteRecord {
            pool_id,
            round: pool.voting.round,
            voter,
            support,
            weight,
        };

        Ok(weight)
    }

    pub fn pool_info(&self, pool_id: u64) -> Result<PoolInfo> {
        Ok(self.pool(pool_id)?.info())
    }

    pub fn pool_admin_info(&self, caller: &Pubkey, pool_id: u64) -> Result<PoolAdminInfo> {
        self.assert_admin(caller)?;
        let pool = self.pool(pool_id)?;

        Ok(PoolAdminInfo {
            info: pool.info(),
            busd_stake_count: pool.busd_stake_count,
            cumulative_busd: pool.cumulative_busd,
            custodied: pool.custodied,
            reserve: pool.reserve,
            funded_amount: pool.funded_amount,
            reward_percentage: pool.reward_percentage,
            unmet_requirement: pool.unmet_requirement()?,
            ledger: pool.ledger.clone(),
            voting: pool.voting,
        })
    }
}

impl Pool {
    pub const SPACE: usize = 8 + // id
        (4 + MAX_NAME_LEN) +
        (4 + MAX_DESCRIPTION_LEN) +
        (4 + MAX_SPONSOR_LEN) +
        8 + 8 + // dates
        1 + 1 + // flags
        4 + 4 + // stakers, next_init_index
        8 + 8 + // init and busd totals
        4 + // busd_stake_count
        8 * 4 + // cumulative_busd, custodied, reserve, funded_amount
        2 + // reward_percentage
        (4 + MAX_LEDGER_ENTRIES * LedgerEntry::SPACE) +
        VotingRound::SPACE;

    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            sponsor: self.sponsor.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            is_funded: self.is_funded,
            stakers: self.stakers,
            total_init_staked: self.total_init_staked,
            total_busd_staked: self.total_busd_staked,
        }
    }

    pub fn reward_for(&self, pegged_amount: u64) -> Result<u64> {
        let reward = (pegged_amount as u128)
            .checked_mul(self.reward_percentage as u128)
            .ok_or(ErrorCode::MathOverflow)?
            / 100;

        u64::try_from(reward).map_err(|_| error!(ErrorCode::MathOverflow))
    }

    /// What the reserve still lacks to pay every open receipt in full.
    pub fn unmet_requirement(&self) -> Result<u64> {
        let required = self
            .total_busd_staked
            .checked_add(self.reward_for(self.total_busd_staked)?)
            .ok_or(ErrorCode::MathOverflow)?;

        Ok(required.saturating_sub(self.reserve))
    }

    /// Re-evaluates the funded flag after the requirement or the reserve moved.
    /// A pool that was never funded stays unfunded until `fund_pool` runs.
    fn refresh_funded(&mut self) -> Result<()> {
        let was_funded = self.is_funded || self.funded_amount > 0;
        self.is_funded = was_funded && self.unmet_requirement()? == 0;
        Ok(())
    }

    pub fn credit_of(&self, wallet: &Pubkey) -> u64 {
        self.ledger
            .iter()
            .find(|entry| entry.wallet == *wallet)
            .map_or(0, |entry| entry.amount)
    }

    pub fn ledger_total(&self) -> u64 {
        self.ledger
            .iter()
            .fold(0u64, |total, entry| total.saturating_add(entry.amount))
    }

    pub fn credit(&mut self, wallet: Pubkey, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        if let Some(entry) = self.ledger.iter_mut().find(|entry| entry.wallet == wallet) {
            entry.amount = entry.amount.checked_add(amount).ok_or(ErrorCode::MathOverflow)?;
            return Ok(());
        }

        require!(self.ledger.len() < MAX_LEDGER_ENTRIES, ErrorCode::LedgerFull);
        self.ledger.push(LedgerEntry { wallet, amount });

        Ok(())
    }

    fn debit(&mut self, wallet: &Pubkey, amount: u64) -> Result<()> {
        let entry = self
            .ledger
            .iter_mut()
            .find(|entry| entry.wallet == *wallet)
            .ok_or(ErrorCode::NothingToWithdraw)?;
        entry.amount = entry
            .amount
            .checked_sub(amount)
            .ok_or(ErrorCode::InsufficientLiquidity)?;

        self.ledger.retain(|entry| entry.amount > 0);

        Ok(())
    }
}

impl LedgerEntry {
    pub const SPACE: usize = 32 + 8;
}

impl VotingRound {
    pub const SPACE: usize = 4 + 1 + 8 + 8 + 4;
}

impl InitStake {
    pub const LEN: usize = 8 + 32 + 8 + 8 + 8 + 4 + 1;

    pub fn is_unlocked(&self, now: i64) -> bool {
        now >= self.deposited_at.saturating_add(INIT_STAKE_LOCK)
    }

    pub fn is_open_for(&self, holder: &Pubkey, pool_id: u64) -> bool {
        self.holder == *holder && self.pool_id == pool_id && self.status == PositionStatus::Open
    }

    /// Index of an open stake, or -1 when there is none.
    pub fn membership_index(stake: Option<&InitStake>) -> i64 {
        match stake {
            Some(stake) if stake.status == PositionStatus::Open && stake.holder != Pubkey::default() => {
                stake.index as i64
            }
            _ => -1,
        }
    }

    /// Reads a stake PDA that may not have been created yet.
    pub fn load(info: &AccountInfo) -> Option<InitStake> {
        load_program_account(info)
    }
}

impl Receipt {
    pub const LEN: usize = 8 + 8 + 32 + 8 + 8 + 32 + 8 + 1;

    pub fn info(&self) -> ReceiptInfo {
        ReceiptInfo {
            token_id: self.token_id,
            pool_id: self.pool_id,
            pegged_amount: self.pegged_amount,
            status: self.status,
        }
    }

    pub fn is_open_in(&self, pool_id: u64) -> bool {
        self.pool_id == pool_id && self.status == PositionStatus::Open
    }

    pub fn load(info: &AccountInfo) -> Option<Receipt> {
        load_program_account(info)
    }
}

impl VoteRecord {
    pub const LEN: usize = 8 + 8 + 4 + 32 + 1 + 8;
}

fn load_program_account<T: AccountDeserialize>(info: &AccountInfo) -> Option<T> {
    if info.owner != &crate::ID || info.data_is_empty() {
        return None;
    }
    let data = info.try_borrow_data().ok()?;
    let account = T::try_deserialize(&mut &data[..]).ok()?;
    Some(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wallets {
        admin: Pubkey,
        fee: Pubkey,
        admin_wallet: Pubkey,
        fund: Pubkey,
    }

    fn setup() -> (FundState, Wallets) {
        let wallets = Wallets {
            admin: Pubkey::new_unique(),
            fee: Pubkey::new_unique(),
            admin_wallet: Pubkey::new_unique(),
            fund: Pubkey::new_unique(),
        };
        let state = FundState {
            admin: wallets.admin,
            init_mint: Pubkey::new_unique(),
            busd_mint: Pubkey::new_unique(),
            init_vault: Pubkey::new_unique(),
            busd_vault: Pubkey::new_unique(),
            fee_wallet: wallets.fee,
            admin_wallet: wallets.admin_wallet,
            fund_wallet: wallets.fund,
            fee_bps: DEFAULT_FEE_BPS,
            fund_bps: DEFAULT_FUND_BPS,
            paused: false,
            total_pools: 0,
            total_init_stakes: 0,
            total_busd_stakes: 0,
            total_investment: 0,
            votings_amount: 0,
            next_token_id: 1,
            pools: Vec::new(),
            bump: 255,
        };
        (state, wallets)
    }

    fn with_pool() -> (FundState, Wallets) {
        let (mut state, wallets) = setup();
        state
            .create_pool(
                &wallets.admin,
                0,
                "Pool#1".to_string(),
                "Pool number one".to_string(),
                "Some companies".to_string(),
                1_000,
                2_000,
            )
            .unwrap();
        (state, wallets)
    }

    fn tokens(amount: u64) -> u64 {
        amount * ONE_TOKEN
    }

    fn join(state: &mut FundState, holder: Pubkey, now: i64) -> InitStake {
        let mut stake = InitStake::default();
        state
            .add_init_stake(&mut stake, holder, 0, tokens(6_000), tokens(6_000), now)
            .unwrap();
        stake
    }

    fn contribute(state: &mut FundState, stake: &InitStake, amount: u64) -> Receipt {
        let mut receipt = Receipt::default();
        state
            .add_busd_stake(
                Some(stake),
                &mut receipt,
                stake.holder,
                Pubkey::new_unique(),
                0,
                amount,
                amount,
                0,
            )
            .unwrap();
        receipt
    }

    fn assert_custody_balanced(pool: &Pool) {
        assert_eq!(pool.ledger_total() + pool.reserve, pool.custodied);
    }

    #[test]
    fn space_constants_cover_serialized_values() {
        let (state, _) = with_pool();
        let mut pool = state.pools[0].clone();
        pool.name = "n".repeat(MAX_NAME_LEN);
        pool.description = "d".repeat(MAX_DESCRIPTION_LEN);
        pool.sponsor = "s".repeat(MAX_SPONSOR_LEN);
        pool.ledger = vec![LedgerEntry::default(); MAX_LEDGER_ENTRIES];
        assert_eq!(pool.try_to_vec().unwrap().len(), Pool::SPACE);

        let empty = FundState { pools: Vec::new(), ..state };
        assert_eq!(empty.try_to_vec().unwrap().len() + 8, FundState::BASE_LEN);
        assert_eq!(InitStake::default().try_to_vec().unwrap().len() + 8, InitStake::LEN);
        assert_eq!(Receipt::default().try_to_vec().unwrap().len() + 8, Receipt::LEN);
        assert_eq!(VoteRecord::default().try_to_vec().unwrap().len() + 8, VoteRecord::LEN);
    }

    #[test]
    fn create_pool_is_admin_only_and_unique() {
        let (mut state, wallets) = with_pool();
        let pool = state.pool_info(0).unwrap();
        assert_eq!(pool.name, "Pool#1");
        assert!(pool.is_active);
        assert!(!pool.is_funded);

        let outsider = Pubkey::new_unique();
        let result = state.create_pool(&outsider, 1, "x".into(), "y".into(), "z".into(), 0, 1);
        assert_eq!(result.unwrap_err(), ErrorCode::Unauthorized.into());

        let result = state.create_pool(&wallets.admin, 0, "x".into(), "y".into(), "z".into(), 0, 1);
        assert_eq!(result.unwrap_err(), ErrorCode::DuplicatePool.into());

        let result = state.create_pool(&wallets.admin, 1, "x".into(), "y".into(), "z".into(), 5, 5);
        assert_eq!(result.unwrap_err(), ErrorCode::InvalidPoolDates.into());

        assert_eq!(state.total_pools, 1);
        assert_eq!(state.pool_info(7).unwrap_err(), ErrorCode::PoolNotFound.into());
    }

    #[test]
    fn pool_registry_is_bounded() {
        let (mut state, wallets) = with_pool();
        for id in 1..MAX_POOLS as u64 {
            state
                .create_pool(&wallets.admin, id, "p".into(), "d".into(), "s".into(), 0, 1)
                .unwrap();
        }
        assert_eq!(state.pools.len(), MAX_POOLS);

        let result = state.create_pool(&wallets.admin, 99, "p".into(), "d".into(), "s".into(), 0, 1);
        assert_eq!(result.unwrap_err(), ErrorCode::TooManyPools.into());
        assert_eq!(state.total_pools, MAX_POOLS as u64);

        // deserialized registry plus the write-back buffer must fit the 32 KiB heap
        let full = FundState::space_for(MAX_POOLS);
        assert!(2 * full < 32 * 1024, "registry too large for the heap: {}", full);
    }

    #[test]
    fn admin_info_is_restricted() {
        let (state, wallets) = with_pool();
        let outsider = Pubkey::new_unique();
        assert_eq!(
            state.pool_admin_info(&outsider, 0).unwrap_err(),
            ErrorCode::Unauthorized.into()
        );
        let info = state.pool_admin_info(&wallets.admin, 0).unwrap();
        assert_eq!(info.info, state.pool_info(0).unwrap());
        assert_eq!(info.unmet_requirement, 0);
    }

    #[test]
    fn second_init_stake_is_rejected_regardless_of_amount() {
        let (mut state, _) = with_pool();
        let holder = Pubkey::new_unique();
        let mut stake = join(&mut state, holder, 10);
        assert_eq!(stake.index, 0);
        assert_eq!(InitStake::membership_index(Some(&stake)), 0);

        for amount in [1, tokens(6_000), tokens(60_000)] {
            let result = state.add_init_stake(&mut stake, holder, 0, amount, amount, 20);
            assert_eq!(result.unwrap_err(), ErrorCode::DuplicateStake.into());
        }

        let pool = state.pool(0).unwrap();
        assert_eq!(pool.stakers, 1);
        assert_eq!(pool.total_init_staked, tokens(6_000));
        assert_eq!(state.total_init_stakes, 1);
    }

    #[test]
    fn init_stake_checks_minimum_allowance_and_pool() {
        let (mut state, _) = with_pool();
        let holder = Pubkey::new_unique();

        let mut stake = InitStake::default();
        let result = state.add_init_stake(&mut stake, holder, 0, tokens(5_999), tokens(6_000), 0);
        assert_eq!(result.unwrap_err(), ErrorCode::BelowMinimum.into());

        let result = state.add_init_stake(&mut stake, holder, 0, tokens(6_000), tokens(5_000), 0);
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientAllowance.into());

        let result = state.add_init_stake(&mut stake, holder, 9, tokens(6_000), tokens(6_000), 0);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFound.into());

        state.pools[0].is_active = false;
        let result = state.add_init_stake(&mut stake, holder, 0, tokens(6_000), tokens(6_000), 0);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolClosed.into());
        assert_eq!(InitStake::membership_index(Some(&stake)), -1);
        assert_eq!(InitStake::membership_index(None), -1);
    }

    #[test]
    fn indices_are_sequential_per_pool() {
        let (mut state, _) = with_pool();
        let first = join(&mut state, Pubkey::new_unique(), 0);
        let second = join(&mut state, Pubkey::new_unique(), 0);
        assert_eq!((first.index, second.index), (0, 1));
    }

    #[test]
    fn init_stake_is_locked_for_thirty_days() {
        let (mut state, _) = with_pool();
        let holder = Pubkey::new_unique();
        let deposited_at = 1_000;
        let mut stake = join(&mut state, holder, deposited_at);

        let early = deposited_at + INIT_STAKE_LOCK - 1;
        let result = state.claim_init_stake(&mut stake, &holder, 0, 0, early);
        assert_eq!(result.unwrap_err(), ErrorCode::LockActive.into());

        let stranger = Pubkey::new_unique();
        let at_unlock = deposited_at + INIT_STAKE_LOCK;
        let result = state.claim_init_stake(&mut stake, &stranger, 0, 0, at_unlock);
        assert_eq!(result.unwrap_err(), ErrorCode::NotOwner.into());
        let result = state.claim_init_stake(&mut stake, &holder, 0, 3, at_unlock);
        assert_eq!(result.unwrap_err(), ErrorCode::NotOwner.into());

        let amount = state.claim_init_stake(&mut stake, &holder, 0, 0, at_unlock).unwrap();
        assert_eq!(amount, tokens(6_000));
        assert_eq!(stake.status, PositionStatus::Claimed);

        let result = state.claim_init_stake(&mut stake, &holder, 0, 0, at_unlock + 1);
        assert_eq!(result.unwrap_err(), ErrorCode::AlreadyClaimed.into());

        let pool = state.pool(0).unwrap();
        assert_eq!(pool.stakers, 0);
        assert_eq!(pool.total_init_staked, 0);
        assert_eq!(state.total_init_stakes, 1);
    }

    #[test]
    fn init_stake_cannot_be_claimed_from_a_closed_pool() {
        let (mut state, _) = with_pool();
        let holder = Pubkey::new_unique();
        let mut stake = join(&mut state, holder, 0);
        state.pools[0].is_active = false;

        let result = state.claim_init_stake(&mut stake, &holder, 0, 0, INIT_STAKE_LOCK);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolClosed.into());
        assert_eq!(stake.status, PositionStatus::Open);
    }

    #[test]
    fn busd_stake_requires_an_init_stake() {
        let (mut state, _) = with_pool();
        let holder = Pubkey::new_unique();
        let mut receipt = Receipt::default();
        let amount = tokens(5_000);

        let result = state.add_busd_stake(
            None,
            &mut receipt,
            holder,
            Pubkey::new_unique(),
            0,
            amount,
            u64::MAX,
            0,
        );
        assert_eq!(result.unwrap_err(), ErrorCode::NoInitStake.into());

        let someone_else = join(&mut state, Pubkey::new_unique(), 0);
        let result = state.add_busd_stake(
            Some(&someone_else),
            &mut receipt,
            holder,
            Pubkey::new_unique(),
            0,
            amount,
            u64::MAX,
            0,
        );
        assert_eq!(result.unwrap_err(), ErrorCode::NoInitStake.into());
        assert_eq!(state.total_busd_stakes, 0);
    }

    #[test]
    fn busd_stake_checks_minimum_and_allowance() {
        let (mut state, _) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        let mut receipt = Receipt::default();
        let mint = Pubkey::new_unique();

        let result = state.add_busd_stake(
            Some(&stake),
            &mut receipt,
            stake.holder,
            mint,
            0,
            tokens(999),
            u64::MAX,
            0,
        );
        assert_eq!(result.unwrap_err(), ErrorCode::BelowMinimum.into());

        let result = state.add_busd_stake(
            Some(&stake),
            &mut receipt,
            stake.holder,
            mint,
            0,
            tokens(5_000),
            tokens(4_000),
            0,
        );
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientAllowance.into());
    }

    #[test]
    fn deposit_then_contribution_splits_fee_and_mints_receipt() {
        let (mut state, wallets) = with_pool();
        let holder = Pubkey::new_unique();
        let stake = join(&mut state, holder, 0);
        let receipt = contribute(&mut state, &stake, tokens(5_000));

        assert_eq!(state.user_busd_balance(&wallets.fee), tokens(100));
        assert_eq!(state.user_busd_balance(&wallets.admin_wallet), tokens(4_900));
        assert_eq!(state.user_busd_balance(&wallets.fund), 0);
        assert_eq!(state.user_busd_balance(&holder), 0);

        assert_eq!(receipt.pegged_amount, tokens(5_000));
        assert_eq!(receipt.pool_id, 0);
        assert_eq!(receipt.token_id, 1);
        assert_eq!(receipt.minted_to, holder);

        let pool = state.pool(0).unwrap();
        assert_eq!(pool.total_busd_staked, tokens(5_000));
        assert_eq!(pool.cumulative_busd, tokens(5_000));
        assert_custody_balanced(pool);
        assert_eq!(state.total_busd_stakes, 1);
        assert_eq!(state.total_investment, tokens(5_000));
        assert_eq!(state.next_token_id, 2);
    }

    #[test]
    fn split_is_exact() {
        let split = ContributionSplit::compute(5_000, 200, 0).unwrap();
        assert_eq!(split, ContributionSplit { fee: 100, fund: 0, admin: 4_900 });

        let split = ContributionSplit::compute(10_001, 200, 500).unwrap();
        assert_eq!(split.fee + split.fund + split.admin, 10_001);
        assert_eq!((split.fee, split.fund), (200, 500));

        assert_eq!(
            ContributionSplit::compute(1, 9_000, 1_001).unwrap_err(),
            ErrorCode::InvalidSplit.into()
        );
    }

    #[test]
    fn wallet_changes_only_affect_later_splits() {
        let (mut state, wallets) = with_pool();
        let first = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &first, tokens(5_000));

        let new_admin_wallet = Pubkey::new_unique();
        state.admin_wallet = new_admin_wallet;
        let second = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &second, tokens(1_000));

        assert_eq!(state.user_busd_balance(&wallets.admin_wallet), tokens(4_900));
        assert_eq!(state.user_busd_balance(&new_admin_wallet), tokens(980));
        assert_eq!(state.user_busd_balance(&wallets.fee), tokens(120));
    }

    #[test]
    fn settling_moves_credit_out_of_custody() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));

        let result = state.settle_ledger(&wallets.admin_wallet, 0, tokens(100), tokens(50));
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientAllowance.into());
        let result = state.settle_ledger(&wallets.admin_wallet, 0, tokens(5_000), u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientLiquidity.into());
        let result = state.settle_ledger(&Pubkey::new_unique(), 0, 1, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::NothingToWithdraw.into());

        state
            .settle_ledger(&wallets.admin_wallet, 0, tokens(4_900), u64::MAX)
            .unwrap();
        assert_eq!(state.user_busd_balance(&wallets.admin_wallet), 0);
        let pool = state.pool(0).unwrap();
        assert_eq!(pool.custodied, tokens(100));
        assert_custody_balanced(pool);

        let result = state.settle_ledger(&wallets.admin_wallet, 0, 1, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::NothingToWithdraw.into());
    }

    #[test]
    fn fund_pool_pulls_only_the_unmet_requirement() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));
        state
            .update_rewards(&wallets.admin, tokens(5_000), 0, 20)
            .unwrap();
        assert_eq!(state.pool(0).unwrap().unmet_requirement().unwrap(), tokens(6_000));

        let result = state.fund_pool(0, tokens(10_000), tokens(5_000));
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientAllowance.into());

        let pulled = state.fund_pool(0, tokens(10_000), tokens(6_000)).unwrap();
        assert_eq!(pulled, tokens(6_000));

        let pool = state.pool(0).unwrap();
        assert!(pool.is_funded);
        assert_eq!(pool.reserve, tokens(6_000));
        assert_custody_balanced(pool);

        let result = state.fund_pool(0, tokens(1), u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::AlreadyFunded.into());
    }

    #[test]
    fn empty_pool_can_be_funded_and_closed() {
        let (mut state, wallets) = with_pool();
        let result = state.close_pool(&wallets.admin, 0, 0, 0);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());

        assert_eq!(state.fund_pool(0, tokens(1_000), u64::MAX).unwrap(), 0);
        let pool = state.pool(0).unwrap();
        assert!(pool.is_funded);
        assert_eq!((pool.reserve, pool.custodied, pool.funded_amount), (0, 0, 0));

        let result = state.fund_pool(0, tokens(1_000), u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::AlreadyFunded.into());

        state.close_pool(&wallets.admin, 0, 0, 0).unwrap();
        assert!(!state.pool_info(0).unwrap().is_active);
    }

    #[test]
    fn fully_paid_out_pool_can_be_closed() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        let mut receipt = contribute(&mut state, &stake, tokens(5_000));
        state.fund_pool(0, tokens(5_000), u64::MAX).unwrap();
        state.withdraw_with_receipt(&mut receipt, u64::MAX).unwrap();

        state.update_rewards(&wallets.admin, 0, 0, 10).unwrap();
        assert!(state.pool(0).unwrap().is_funded);
        state.close_pool(&wallets.admin, 0, 0, 0).unwrap();
    }

    #[test]
    fn partial_funding_keeps_the_pool_unfunded() {
        let (mut state, _) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));

        assert_eq!(state.fund_pool(0, tokens(2_000), u64::MAX).unwrap(), tokens(2_000));
        assert!(!state.pool(0).unwrap().is_funded);
        assert_eq!(state.fund_pool(0, tokens(9_000), u64::MAX).unwrap(), tokens(3_000));
        assert!(state.pool(0).unwrap().is_funded);
    }

    #[test]
    fn update_rewards_guards_against_stale_totals() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));

        let result = state.update_rewards(&Pubkey::new_unique(), tokens(5_000), 0, 10);
        assert_eq!(result.unwrap_err(), ErrorCode::Unauthorized.into());
        let result = state.update_rewards(&wallets.admin, tokens(4_000), 0, 10);
        assert_eq!(result.unwrap_err(), ErrorCode::StaleAggregate.into());
        let result = state.update_rewards(&wallets.admin, tokens(5_000), 0, MAX_REWARD_PERCENTAGE + 1);
        assert_eq!(result.unwrap_err(), ErrorCode::InvalidPercentage.into());

        let pool = state.pool(0).unwrap();
        let low = pool.reward_for(tokens(5_000)).unwrap();
        state.update_rewards(&wallets.admin, tokens(5_000), 0, 15).unwrap();
        let high = state.pool(0).unwrap().reward_for(tokens(5_000)).unwrap();
        assert!(high >= low);
        assert_eq!(high, tokens(750));
    }

    #[test]
    fn raising_rewards_after_funding_requires_a_top_up() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));
        state.fund_pool(0, tokens(5_000), u64::MAX).unwrap();
        assert!(state.pool(0).unwrap().is_funded);

        state.update_rewards(&wallets.admin, tokens(5_000), 0, 10).unwrap();
        assert!(!state.pool(0).unwrap().is_funded);
        assert_eq!(state.fund_pool(0, tokens(9_000), u64::MAX).unwrap(), tokens(500));
        assert!(state.pool(0).unwrap().is_funded);
    }

    #[test]
    fn receipt_pays_principal_and_reward_exactly_once() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        let mut receipt = contribute(&mut state, &stake, tokens(5_000));

        let result = state.withdraw_with_receipt(&mut receipt, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());

        state.update_rewards(&wallets.admin, tokens(5_000), 0, 20).unwrap();
        state.fund_pool(0, tokens(6_000), u64::MAX).unwrap();

        let result = state.withdraw_with_receipt(&mut receipt, tokens(1_000));
        assert_eq!(result.unwrap_err(), ErrorCode::InsufficientAllowance.into());

        let staked_before = state.pool_info(0).unwrap().total_busd_staked;
        let (principal, reward) = state.withdraw_with_receipt(&mut receipt, u64::MAX).unwrap();
        assert_eq!((principal, reward), (tokens(5_000), tokens(1_000)));
        assert_eq!(receipt.status, PositionStatus::Claimed);

        let pool = state.pool(0).unwrap();
        assert_eq!(staked_before - pool.total_busd_staked, tokens(5_000));
        assert_eq!(pool.reserve, 0);
        assert_custody_balanced(pool);

        let result = state.withdraw_with_receipt(&mut receipt, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::AlreadyClaimed.into());
        assert_eq!(state.pool(0).unwrap().total_busd_staked, 0);
        assert!(state.pool(0).unwrap().total_busd_staked <= state.pool(0).unwrap().cumulative_busd);
    }

    #[test]
    fn contribution_after_funding_requires_a_top_up() {
        let (mut state, wallets) = with_pool();
        let first = join(&mut state, Pubkey::new_unique(), 0);
        let second = join(&mut state, Pubkey::new_unique(), 0);
        let mut first_receipt = contribute(&mut state, &first, tokens(5_000));
        state.fund_pool(0, tokens(5_000), u64::MAX).unwrap();
        assert!(state.pool(0).unwrap().is_funded);

        let mut second_receipt = contribute(&mut state, &second, tokens(5_000));
        let pool = state.pool(0).unwrap();
        assert!(!pool.is_funded);
        assert_eq!(pool.unmet_requirement().unwrap(), tokens(5_000));

        let result = state.withdraw_with_receipt(&mut first_receipt, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());
        let result = state.close_pool(&wallets.admin, 0, 2, tokens(10_000));
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());

        assert_eq!(state.fund_pool(0, tokens(9_000), u64::MAX).unwrap(), tokens(5_000));
        assert!(state.pool(0).unwrap().is_funded);

        state.withdraw_with_receipt(&mut first_receipt, u64::MAX).unwrap();
        state.withdraw_with_receipt(&mut second_receipt, u64::MAX).unwrap();
        let pool = state.pool(0).unwrap();
        assert_eq!(pool.reserve, 0);
        assert!(pool.is_funded);
        assert_custody_balanced(pool);
    }

    #[test]
    fn claims_must_happen_before_close() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        let mut receipt = contribute(&mut state, &stake, tokens(5_000));

        let result = state.close_pool(&wallets.admin, 0, 1, tokens(5_000));
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());

        state.fund_pool(0, tokens(5_000), u64::MAX).unwrap();

        let result = state.close_pool(&Pubkey::new_unique(), 0, 1, tokens(5_000));
        assert_eq!(result.unwrap_err(), ErrorCode::Unauthorized.into());
        let result = state.close_pool(&wallets.admin, 0, 2, tokens(5_000));
        assert_eq!(result.unwrap_err(), ErrorCode::StaleAggregate.into());
        let result = state.close_pool(&wallets.admin, 0, 1, tokens(4_000));
        assert_eq!(result.unwrap_err(), ErrorCode::StaleAggregate.into());

        state.close_pool(&wallets.admin, 0, 1, tokens(5_000)).unwrap();
        assert!(!state.pool_info(0).unwrap().is_active);

        let result = state.withdraw_with_receipt(&mut receipt, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolClosed.into());
        let result = state.close_pool(&wallets.admin, 0, 1, tokens(5_000));
        assert_eq!(result.unwrap_err(), ErrorCode::PoolClosed.into());
    }

    #[test]
    fn emergency_sweep_happens_once() {
        let (mut state, wallets) = with_pool();
        let stake = join(&mut state, Pubkey::new_unique(), 0);
        contribute(&mut state, &stake, tokens(5_000));

        let result = state.emergency_withdraw(&wallets.admin, 0, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::PoolNotFunded.into());

        state.fund_pool(0, tokens(5_000), u64::MAX).unwrap();
        let result = state.emergency_withdraw(&Pubkey::new_unique(), 0, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::Unauthorized.into());

        let swept = state.emergency_withdraw(&wallets.admin, 0, u64::MAX).unwrap();
        assert_eq!(swept, tokens(5_000));
        assert_custody_balanced(state.pool(0).unwrap());

        let result = state.emergency_withdraw(&wallets.admin, 0, u64::MAX);
        assert_eq!(result.unwrap_err(), ErrorCode::NothingToWithdraw.into());
    }

    #[test]
    fn voting_round_counts_each_member_once() {
        let (mut state, wallets) = with_pool();
        let voter = Pubkey::new_unique();
        let mut record = VoteRecord::default();

        let result = state.cast_vote(&mut record, voter, 0, true, true, None);
        assert_eq!(result.unwrap_err(), ErrorCode::VotingClosed.into());

        let result = state.start_voting(&voter, 0);
        assert_eq!(result.unwrap_err(), ErrorCode::Unauthorized.into());
        assert_eq!(state.start_voting(&wallets.admin, 0).unwrap(), 1);
        let result = state.start_voting(&wallets.admin, 0);
        assert_eq!(result.unwrap_err(), ErrorCode::VotingAlreadyOpen.into());

        let result = state.cast_vote(&mut record, voter, 0, false, true, None);
        assert_eq!(result.unwrap_err(), ErrorCode::NotAMember.into());

        state.cast_vote(&mut record, voter, 0, true, true, None).unwrap();
        let result = state.cast_vote(&mut record, voter, 0, true, true, None);
        assert_eq!(result.unwrap_err(), ErrorCode::AlreadyVoted.into());

        let mut other = VoteRecord::default();
        let result = state.cast_vote(&mut other, Pubkey::new_unique(), 0, true, false, Some(0));
        assert_eq!(result.unwrap_err(), ErrorCode::InvalidVoteWeight.into());
        state
            .cast_vote(&mut other, Pubkey::new_unique(), 0, true, false, Some(3))
            .unwrap();

        let voting = state.pool(0).unwrap().voting;
        assert_eq!((voting.yes_votes, voting.no_votes, voting.voters), (1, 3, 2));

        let result = state.close_voting(&wallets.admin, 0, 1);
        assert_eq!(result.unwrap_err(), ErrorCode::StaleAggregate.into());
        let closed = state.close_voting(&wallets.admin, 0, 2).unwrap();
        assert!(!closed.is_open);
        let result = state.close_voting(&wallets.admin, 0, 2);
        assert_eq!(result.unwrap_err(), ErrorCode::VotingClosed.into());

        // the same record may vote again in the next round
        state.start_voting(&wallets.admin, 0).unwrap();
        state.cast_vote(&mut record, voter, 0, true, true, None).unwrap();
        assert_eq!(state.votings_amount, 2);
        assert_eq!(state.pool(0).unwrap().voting.yes_votes, 1);
    }

    #[test]
    fn pause_blocks_member_operations() {
        let (mut state, wallets) = with_pool();
        let holder = Pubkey::new_unique();
        let mut stake = join(&mut state, holder, 0);
        state.paused = true;

        let mut fresh = InitStake::default();
        let result = state.add_init_stake(&mut fresh, holder, 0, tokens(6_000), u64::MAX, 0);
        assert_eq!(result.unwrap_err(), ErrorCode::ErrorForPause.into());
        let result = state.claim_init_stake(&mut stake, &holder, 0, 0, INIT_STAKE_LOCK);
        assert_eq!(result.unwrap_err(), ErrorCode::ErrorForPause.into());

        state
            .create_pool(&wallets.admin, 1, "b".into(), "c".into(), "d".into(), 0, 1)
            .unwrap();
    }

    #[test]
    fn ledger_is_bounded_per_pool() {
        let (mut state, _) = with_pool();
        let pool = state.pool_mut(0).unwrap();
        for _ in 0..MAX_LEDGER_ENTRIES {
            pool.credit(Pubkey::new_unique(), 1).unwrap();
        }
        assert_eq!(
            pool.credit(Pubkey::new_unique(), 1).unwrap_err(),
            ErrorCode::LedgerFull.into()
        );
        let existing = pool.ledger[0].wallet;
        pool.credit(existing, 1).unwrap();
        assert_eq!(pool.credit_of(&existing), 2);
    }
}
