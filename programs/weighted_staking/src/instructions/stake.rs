//! Stake instruction handler.
//!
//! Opens a new time-locked stake for the signer.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::engine;
use crate::error::StakingError;
use crate::state::{StakePool, UserPosition};

/// Accounts required for staking.
#[derive(Accounts)]
pub struct StakeTokens<'info> {
    /// The user staking tokens.
    #[account(mut)]
    pub user: Signer<'info>,

    /// The stake pool.
    #[account(
        mut,
        seeds = [STAKE_POOL_SEED, stake_pool.staking_mint.as_ref()],
        bump = stake_pool.bump,
        has_one = staking_vault @ StakingError::VaultMismatch,
        has_one = staking_mint @ StakingError::MintMismatch
    )]
    pub stake_pool: Account<'info, StakePool>,

    /// User's position account (created on the first stake).
    #[account(
        init_if_needed,
        payer = user,
        space = UserPosition::LEN,
        seeds = [USER_POSITION_SEED, stake_pool.key().as_ref(), user.key().as_ref()],
        bump
    )]
    pub user_position: Account<'info, UserPosition>,

    /// The staking token mint.
    pub staking_mint: Account<'info, Mint>,

    /// User's token account for the staking token.
    #[account(
        mut,
        constraint = user_token_account.mint == staking_mint.key() @ StakingError::MintMismatch,
        constraint = user_token_account.owner == user.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    /// Pool's staking vault.
    #[account(mut)]
    pub staking_vault: Account<'info, TokenAccount>,

    /// System program.
    pub system_program: Program<'info, System>,

    /// Token program.
    pub token_program: Program<'info, Token>,

    /// Rent sysvar.
    pub rent: Sysvar<'info, Rent>,
}

/// Lock tokens for `duration_days`.
///
/// # Arguments
/// * `ctx` - Stake accounts context
/// * `amount` - Amount of tokens to lock
/// * `duration_days` - Lock duration, within the pool's configured bounds
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<StakeTokens>, amount: u64, duration_days: u32) -> Result<()> {
    let clock = Clock::get()?;
    let user_key = ctx.accounts.user.key();
    let pool_key = ctx.accounts.stake_pool.key();

    let user_position = &mut ctx.accounts.user_position;
    if !user_position.is_initialized() {
        user_position.owner = user_key;
        user_position.stake_pool = pool_key;
        user_position.bump = ctx.bumps.user_position;
    }

    let stake_pool = &mut ctx.accounts.stake_pool;
    let config = stake_pool.config;
    let stake_id = engine::apply_stake(
        &config,
        &config.share_curve,
        &mut stake_pool.state,
        &mut user_position.ledger,
        amount,
        duration_days,
        clock.unix_timestamp,
    )?;

    // Transfer principal from user to vault
    let cpi_accounts = Transfer {
        from: ctx.accounts.user_token_account.to_account_info(),
        to: ctx.accounts.staking_vault.to_account_info(),
        authority: ctx.accounts.user.to_account_info(),
    };
    let cpi_program = ctx.accounts.token_program.to_account_info();
    let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);
    token::transfer(cpi_ctx, amount)?;

    msg!("Staked {} tokens as stake {}", amount, stake_id);
    msg!(
        "Total staked by user: {}",
        ctx.accounts.user_position.ledger.total_amount
    );

    Ok(())
}
