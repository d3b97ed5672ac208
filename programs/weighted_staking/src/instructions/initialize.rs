/// Initialize instruction handler.
///
/// Creates a new staking pool with its staking vault and reward treasury.
///
/// ## Security Guarantees
/// - Vault and treasury are PDAs owned by the stake pool
/// - Mint address is locked to pool state permanently
/// - Pool configuration is validated and immutable afterwards

use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::constants::*;
use crate::state::{PoolConfig, PoolState, StakePool};

/// Accounts required for pool initialization.
///
/// ## Security Notes
/// - `staking_vault` and `treasury_vault` are PDAs with `stake_pool` as authority
/// - Seeds ensure these accounts cannot be swapped or replaced
#[derive(Accounts)]
pub struct Initialize<'info> {
    /// Pays for the pool accounts.
    #[account(mut)]
    pub payer: Signer<'info>,

    /// The stake pool account to be created.
    /// SECURITY: PDA derived from STAKE_POOL_SEED + mint ensures uniqueness per token.
    #[account(
        init,
        payer = payer,
        space = StakePool::LEN,
        seeds = [STAKE_POOL_SEED, staking_mint.key().as_ref()],
        bump
    )]
    pub stake_pool: Account<'info, StakePool>,

    /// The mint for the staking token; rewards are paid in the same token.
    pub staking_mint: Account<'info, Mint>,

    /// The vault that will hold staked principal.
    #[account(
        init,
        payer = payer,
        seeds = [POOL_VAULT_SEED, stake_pool.key().as_ref()],
        bump,
        token::mint = staking_mint,
        token::authority = stake_pool
    )]
    pub staking_vault: Account<'info, TokenAccount>,

    /// The treasury vault rewards are paid from.
    #[account(
        init,
        payer = payer,
        seeds = [TREASURY_VAULT_SEED, stake_pool.key().as_ref()],
        bump,
        token::mint = staking_mint,
        token::authority = stake_pool
    )]
    pub treasury_vault: Account<'info, TokenAccount>,

    /// System program for account creation.
    pub system_program: Program<'info, System>,

    /// Token program for token account operations.
    pub token_program: Program<'info, Token>,

    /// Rent sysvar for rent-exempt calculations.
    pub rent: Sysvar<'info, Rent>,
}

/// Initialize a new staking pool.
///
/// # Arguments
/// * `ctx` - Initialize accounts context
/// * `config` - Emission rate, duration bounds, share curve and penalty policy
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<Initialize>, config: PoolConfig) -> Result<()> {
    config.validate()?;

    let stake_pool = &mut ctx.accounts.stake_pool;
    let clock = Clock::get()?;

    stake_pool.staking_mint = ctx.accounts.staking_mint.key();
    stake_pool.staking_vault = ctx.accounts.staking_vault.key();
    stake_pool.treasury_vault = ctx.accounts.treasury_vault.key();
    stake_pool.config = config;
    stake_pool.state = PoolState::new(config.rewards_per_second, clock.unix_timestamp);
    stake_pool.created_at = clock.unix_timestamp;

    stake_pool.bump = ctx.bumps.stake_pool;
    stake_pool.vault_bump = ctx.bumps.staking_vault;
    stake_pool.treasury_bump = ctx.bumps.treasury_vault;

    msg!("Weighted Staking Pool initialized");
    msg!("Mint: {}", ctx.accounts.staking_mint.key());
    msg!("Rewards per second: {}", config.rewards_per_second);
    msg!(
        "Stake duration: {}-{} days",
        config.min_stake_days,
        config.max_stake_days
    );
    msg!("Share curve: {:?}, penalty: {:?}", config.share_curve, config.penalty);

    Ok(())
}
