//! End stake instruction handler.
//!
//! Closes one of the signer's stakes: principal is paid from the staking vault,
//! reward from the treasury. Early-exit forfeits of principal move to the
//! treasury, forfeited rewards never leave it.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

use crate::constants::*;
use crate::engine;
use crate::error::StakingError;
use crate::state::{StakePool, UserPosition};

/// Accounts required for ending a stake.
#[derive(Accounts)]
pub struct EndStake<'info> {
    /// The stake owner.
    #[account(mut)]
    pub user: Signer<'info>,

    /// The stake pool.
    #[account(
        mut,
        seeds = [STAKE_POOL_SEED, stake_pool.staking_mint.as_ref()],
        bump = stake_pool.bump,
        has_one = staking_vault @ StakingError::VaultMismatch,
        has_one = treasury_vault @ StakingError::TreasuryMismatch,
        has_one = staking_mint @ StakingError::MintMismatch
    )]
    pub stake_pool: Account<'info, StakePool>,

    /// User's position account.
    #[account(
        mut,
        seeds = [USER_POSITION_SEED, stake_pool.key().as_ref(), user.key().as_ref()],
        bump = user_position.bump,
        constraint = user_position.owner == user.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub user_position: Account<'info, UserPosition>,

    /// The staking token mint.
    pub staking_mint: Account<'info, Mint>,

    /// User's token account receiving principal and reward.
    #[account(
        mut,
        constraint = user_token_account.mint == staking_mint.key() @ StakingError::MintMismatch,
        constraint = user_token_account.owner == user.key() @ StakingError::UnauthorizedStakeAccess
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    /// Pool's staking vault.
    #[account(mut)]
    pub staking_vault: Account<'info, TokenAccount>,

    /// Pool's reward treasury.
    #[account(mut)]
    pub treasury_vault: Account<'info, TokenAccount>,

    /// Token program.
    pub token_program: Program<'info, Token>,
}

impl<'info> EndStake<'info> {
    /// Transfer out of a pool-owned vault using the pool PDA signer.
    fn pay_out(
        &self,
        from: &Account<'info, TokenAccount>,
        to: &Account<'info, TokenAccount>,
        amount: u64,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        let staking_mint_key = self.stake_pool.staking_mint;
        let seeds = &[
            STAKE_POOL_SEED,
            staking_mint_key.as_ref(),
            &[self.stake_pool.bump],
        ];
        let signer_seeds = &[&seeds[..]];

        let cpi_accounts = Transfer {
            from: from.to_account_info(),
            to: to.to_account_info(),
            authority: self.stake_pool.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);
        token::transfer(cpi_ctx, amount)
    }
}

/// End stake `stake_id`.
///
/// # Arguments
/// * `ctx` - EndStake accounts context
/// * `stake_id` - Id of the stake inside the user's position
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<EndStake>, stake_id: u64) -> Result<()> {
    let clock = Clock::get()?;

    let stake_pool = &mut ctx.accounts.stake_pool;
    let user_position = &mut ctx.accounts.user_position;
    let config = stake_pool.config;
    let receipt = engine::apply_end_stake(
        &config,
        &config.penalty,
        &mut stake_pool.state,
        &mut user_position.ledger,
        stake_id,
        clock.unix_timestamp,
    )?;

    require!(
        ctx.accounts.treasury_vault.amount >= receipt.reward_returned,
        StakingError::InsufficientTreasuryFunds
    );

    let accounts = &ctx.accounts;
    accounts.pay_out(
        &accounts.staking_vault,
        &accounts.user_token_account,
        receipt.principal_returned,
    )?;
    accounts.pay_out(
        &accounts.treasury_vault,
        &accounts.user_token_account,
        receipt.reward_returned,
    )?;
    accounts.pay_out(
        &accounts.staking_vault,
        &accounts.treasury_vault,
        receipt.principal_forfeited,
    )?;

    msg!(
        "Ended stake {}: {} principal, {} reward",
        stake_id,
        receipt.principal_returned,
        receipt.reward_returned
    );
    msg!(
        "Remaining staked by user: {}",
        accounts.user_position.ledger.total_amount
    );

    Ok(())
}
