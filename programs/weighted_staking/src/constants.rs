//! Program constants for the Weighted Staking program.
//!
//! This module defines all constant values used throughout the staking program,
//! including PDA seeds, time units, fixed-point precision and policy defaults.

/// Seed for deriving the stake pool PDA
pub const STAKE_POOL_SEED: &[u8] = b"stake_pool";

/// Seed for deriving user position account PDAs
pub const USER_POSITION_SEED: &[u8] = b"user_position";

/// Seed for deriving the pool vault PDA
pub const POOL_VAULT_SEED: &[u8] = b"pool_vault";

/// Seed for deriving the treasury vault PDA (reward source)
pub const TREASURY_VAULT_SEED: &[u8] = b"treasury_vault";

/// Number of seconds in a day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Fixed-point scale of the reward-per-share index (10^18)
pub const REWARD_SCALE: u128 = 1_000_000_000_000_000_000;

/// Default minimum lock duration in days
pub const DEFAULT_MIN_STAKE_DAYS: u32 = 28;

/// Default maximum lock duration in days
pub const DEFAULT_MAX_STAKE_DAYS: u32 = 2888;

/// Basis points denominator (100% = 10000 basis points)
pub const BASIS_POINTS_DENOMINATOR: u64 = 10_000;

/// Default share bonus reached at the maximum duration (200% = 3x shares)
pub const DEFAULT_MAX_SHARE_BONUS_BPS: u32 = 20_000;

/// Upper bound accepted for a share bonus (1000% = 11x shares)
pub const MAX_SHARE_BONUS_BPS: u32 = 100_000;

/// Default principal forfeiture for a stake closed right after opening (10%)
pub const DEFAULT_MAX_PRINCIPAL_PENALTY_BPS: u16 = 1_000;

/// Default reward forfeiture for a stake closed right after opening (100%)
pub const DEFAULT_MAX_REWARD_PENALTY_BPS: u16 = 10_000;

/// Number of stake records a single position account can hold
pub const MAX_STAKES_PER_POSITION: usize = 64;
