//! Add stake instruction handler.
//!
//! Adds principal to one of the signer's open stakes.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::engine;
use crate::error::StakingError;
use crate::state::{StakePool, UserPosition};

#[derive(Accounts)]
pub struct AddStake<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [STAKE_POOL_SEED, stake_pool.staking_mint.as_ref()],
        bump = stake_pool.bump,
        has_one = staking_vault @ StakingError::VaultMismatch,
        has_one = staking_mint @ StakingError::MintMismatch
    )]
    pub stake_pool: Account<'info, StakePool>,

    #[account(
        mut,
        seeds = [USER_POSITION_SEED, stake_pool.key().as_ref(), user.key().as_ref()],
        bump = user_position.bump,
        constraint = user_position.owner == user.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub user_position: Account<'info, UserPosition>,

    pub staking_mint: Account<'info, Mint>,

    #[account(
        mut,
        constraint = user_token_account.mint == staking_mint.key() @ StakingError::MintMismatch,
        constraint = user_token_account.owner == user.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub staking_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

/// Add `amount` to stake `stake_id`. The stake keeps its unlock time.
pub fn handler(ctx: Context<AddStake>, stake_id: u64, amount: u64) -> Result<()> {
    let clock = Clock::get()?;

    let stake_pool = &mut ctx.accounts.stake_pool;
    let user_position = &mut ctx.accounts.user_position;
    let config = stake_pool.config;
    engine::apply_add_stake(
        &config,
        &config.share_curve,
        &mut stake_pool.state,
        &mut user_position.ledger,
        stake_id,
        amount,
        clock.unix_timestamp,
    )?;

    let cpi_accounts = Transfer {
        from: ctx.accounts.user_token_account.to_account_info(),
        to: ctx.accounts.staking_vault.to_account_info(),
        authority: ctx.accounts.user.to_account_info(),
    };
    let cpi_program = ctx.accounts.token_program.to_account_info();
    let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);
    token::transfer(cpi_ctx, amount)?;

    msg!("Added {} tokens to stake {}", amount, stake_id);

    Ok(())
}
