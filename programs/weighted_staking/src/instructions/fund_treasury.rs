//! Fund treasury instruction handler.
//!
//! Deposits reward tokens into the treasury and records them in the pool's
//! reward books, so `unpaid_funding` can be compared against what stakes have
//! accrued.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::error::StakingError;
use crate::state::StakePool;

/// Accounts required for funding the treasury.
#[derive(Accounts)]
pub struct FundTreasury<'info> {
    /// The funder (anyone can fund).
    #[account(mut)]
    pub funder: Signer<'info>,

    /// The stake pool.
    #[account(
        mut,
        seeds = [STAKE_POOL_SEED, stake_pool.staking_mint.as_ref()],
        bump = stake_pool.bump,
        has_one = treasury_vault @ StakingError::TreasuryMismatch,
        has_one = staking_mint @ StakingError::MintMismatch
    )]
    pub stake_pool: Account<'info, StakePool>,

    /// The staking token mint.
    pub staking_mint: Account<'info, Mint>,

    /// Funder's token account.
    #[account(
        mut,
        constraint = funder_token_account.mint == staking_mint.key() @ StakingError::MintMismatch,
        constraint = funder_token_account.owner == funder.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub funder_token_account: Account<'info, TokenAccount>,

    /// Pool's treasury vault.
    #[account(
        mut,
        seeds = [TREASURY_VAULT_SEED, stake_pool.key().as_ref()],
        bump = stake_pool.treasury_bump
    )]
    pub treasury_vault: Account<'info, TokenAccount>,

    /// Token program.
    pub token_program: Program<'info, Token>,
}

/// Fund the treasury with reward tokens.
///
/// # Arguments
/// * `ctx` - FundTreasury accounts context
/// * `amount` - Amount of tokens to fund
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<FundTreasury>, amount: u64) -> Result<()> {
    ctx.accounts.stake_pool.state.record_funding(amount)?;

    let cpi_accounts = Transfer {
        from: ctx.accounts.funder_token_account.to_account_info(),
        to: ctx.accounts.treasury_vault.to_account_info(),
        authority: ctx.accounts.funder.to_account_info(),
    };
    let cpi_program = ctx.accounts.token_program.to_account_info();
    let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);
    token::transfer(cpi_ctx, amount)?;

    let state = &ctx.accounts.stake_pool.state;
    msg!("Treasury funded with {} tokens by {}", amount, ctx.accounts.funder.key());
    msg!(
        "Rewards funded {}, paid {}, unpaid {}",
        state.total_rewards_funded,
        state.total_rewards_paid,
        state.unpaid_funding()
    );

    Ok(())
}
