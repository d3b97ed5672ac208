use {
    super::{PoolConfig, PoolState},
    anchor_lang::prelude::*,
};

#[account]
pub struct StakePool {
    pub staking_mint: Pubkey,
    pub staking_vault: Pubkey,
    // reward source: emissions are paid from here, forfeits land here
    pub treasury_vault: Pubkey,

    pub config: PoolConfig,
    pub state: PoolState,

    pub created_at: i64,

    pub vault_bump: u8,
    pub treasury_bump: u8,
    pub bump: u8,
}

impl StakePool {
    pub const LEN: usize = 8
        + (32 * 3)
        + PoolConfig::LEN
        + PoolState::LEN
        + 8
        + 3;
}
