pub const FUND_STATE_SEED: &[u8] = b"fund_state";
pub const INIT_VAULT_SEED: &[u8] = b"init_vault";
pub const BUSD_VAULT_SEED: &[u8] = b"busd_vault";
pub const INIT_STAKE_SEED: &[u8] = b"init_stake";
pub const RECEIPT_SEED: &[u8] = b"receipt";
pub const VOTE_SEED: &[u8] = b"vote";

/// Base units per whole token for the 9-decimal mints the fund is deployed with.
pub const ONE_TOKEN: u64 = 1_000_000_000;

pub const MIN_INIT_STAKE: u64 = 6_000 * ONE_TOKEN;
pub const MIN_BUSD_STAKE: u64 = 1_000 * ONE_TOKEN;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const INIT_STAKE_LOCK: i64 = 30 * SECONDS_PER_DAY;

pub const BPS_DENOMINATOR: u64 = 10_000;
pub const DEFAULT_FEE_BPS: u16 = 200;
pub const DEFAULT_FUND_BPS: u16 = 0;

/// Upper bound for `update_rewards` (10x principal).
pub const MAX_REWARD_PERCENTAGE: u16 = 1_000;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 128;
pub const MAX_SPONSOR_LEN: usize = 64;
pub const MAX_LEDGER_ENTRIES: usize = 8;

/// Every instruction deserializes the whole pool registry onto the heap.
pub const MAX_POOLS: usize = 16;
