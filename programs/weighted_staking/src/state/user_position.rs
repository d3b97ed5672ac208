use {
    super::StakeLedger,
    crate::constants::MAX_STAKES_PER_POSITION,
    anchor_lang::prelude::*,
};

#[account]
pub struct UserPosition {
    pub owner: Pubkey,
    pub stake_pool: Pubkey,

    pub ledger: StakeLedger,

    pub bump: u8,
}

impl UserPosition {
    pub const LEN: usize = 8 + 32 + 32 + StakeLedger::space(MAX_STAKES_PER_POSITION) + 1;

    pub fn is_initialized(&self) -> bool {
        self.owner != Pubkey::default()
    }
}
