pub const STAKING_CONFIG_SEED: &[u8] = b"staking_config";
pub const REWARD_VAULT_SEED: &[u8] = b"reward_vault";
pub const NFT_VAULT_SEED: &[u8] = b"nft_vault";
pub const POSITION_SEED: &[u8] = b"position";
pub const STAKER_SEED: &[u8] = b"staker";

pub const SECONDS_PER_YEAR: u64 = 365 * 86_400;
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fixed-point scale of `rate_to_usd`; this value means one reward token per stable unit.
pub const RATE_PRECISION: u64 = 1_000_000_000;

pub const MAX_TIERS: usize = 16;
pub const MAX_STAKED_PER_OWNER: usize = 20;
