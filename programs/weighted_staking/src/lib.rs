//! # Weighted Staking Program
//!
//! A single-token, time-weighted staking pool. Rewards are emitted at a fixed
//! rate per second and shared among open stakes in proportion to their shares.
//! A stake's shares grow with its principal and its lock duration.
//!
//! ## Features
//! - Lock durations bounded by the pool configuration
//! - Pluggable share curve (linear or square-root duration bonus)
//! - Pluggable early-exit penalty policy
//! - Add principal to an open stake without changing its unlock time
//! - Pull-based reward accounting with a 1e18-scaled accumulator
//! - Treasury-funded rewards
//! - Safe math with overflow protection

use anchor_lang::prelude::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

pub mod constants;
pub mod engine;
pub mod error;
pub mod instructions;
pub mod math;
pub mod policy;
pub mod state;

use instructions::*;
use state::PoolConfig;

#[program]
pub mod weighted_staking {
    use super::*;

    /// Initializes the staking pool.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for initialization
    /// * `config` - Emission rate, duration bounds, share curve and penalty policy
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn initialize(ctx: Context<Initialize>, config: PoolConfig) -> Result<()> {
        instructions::initialize::handler(ctx, config)
    }

    /// Funds the reward treasury.
    ///
    /// # Arguments
    /// * `ctx` - The context containing funding accounts
    /// * `amount` - Amount of tokens to fund
    ///
    /// # Errors
    /// Returns an error if amount is zero or insufficient balance.
    pub fn fund_treasury(ctx: Context<FundTreasury>, amount: u64) -> Result<()> {
        instructions::fund_treasury::handler(ctx, amount)
    }

    /// Opens a new stake.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for staking
    /// * `amount` - Amount of tokens to lock
    /// * `duration_days` - Lock duration in days
    ///
    /// # Errors
    /// Returns an error if:
    /// - Amount is zero
    /// - Duration is outside the pool's bounds
    /// - The position already holds the maximum number of stakes
    /// - Insufficient balance
    pub fn stake(ctx: Context<StakeTokens>, amount: u64, duration_days: u32) -> Result<()> {
        instructions::stake::handler(ctx, amount, duration_days)
    }

    /// Adds principal to an open stake, keeping its duration.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for adding
    /// * `stake_id` - Id of the stake to grow
    /// * `amount` - Amount of tokens to add
    ///
    /// # Errors
    /// Returns an error if:
    /// - Amount is zero
    /// - The stake does not exist or is closed
    /// - Insufficient balance
    pub fn add_stake(ctx: Context<AddStake>, stake_id: u64, amount: u64) -> Result<()> {
        instructions::add_stake::handler(ctx, stake_id, amount)
    }

    /// Ends a stake, paying principal and reward minus any early-exit penalty.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for ending
    /// * `stake_id` - Id of the stake to close
    ///
    /// # Errors
    /// Returns an error if:
    /// - The stake does not exist or is already closed
    /// - Treasury has insufficient funds
    pub fn end_stake(ctx: Context<EndStake>, stake_id: u64) -> Result<()> {
        instructions::end_stake::handler(ctx, stake_id)
    }
}
