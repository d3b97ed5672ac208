use {
    crate::{
        constants::{DEFAULT_MAX_STAKE_DAYS, DEFAULT_MIN_STAKE_DAYS, SECONDS_PER_DAY},
        error::StakingError,
        math,
        policy::{DurationBounds, PenaltyConfig, ShareCurve},
    },
    anchor_lang::prelude::*,
};

/// Per-pool settings, fixed when the pool is created.
#[derive(Copy, Clone, PartialEq, Eq, AnchorSerialize, AnchorDeserialize, Debug)]
pub struct PoolConfig {
    // reward tokens emitted per second, shared by all open stakes
    pub rewards_per_second: u64,
    pub min_stake_days: u32,
    pub max_stake_days: u32,
    pub share_curve: ShareCurve,
    pub penalty: PenaltyConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rewards_per_second: 0,
            min_stake_days: DEFAULT_MIN_STAKE_DAYS,
            max_stake_days: DEFAULT_MAX_STAKE_DAYS,
            share_curve: ShareCurve::default(),
            penalty: PenaltyConfig::default(),
        }
    }
}

impl PoolConfig {
    pub const LEN: usize = 8 + 4 + 4 + ShareCurve::LEN + PenaltyConfig::LEN;

    pub fn validate(&self) -> Result<()> {
        require!(
            self.min_stake_days > 0 && self.min_stake_days <= self.max_stake_days,
            StakingError::InvalidPoolConfig
        );
        require!(self.share_curve.validate(), StakingError::InvalidPoolConfig);
        require!(self.penalty.validate(), StakingError::InvalidPoolConfig);
        // the longest lock must still be representable as a timestamp offset
        self.max_stake_seconds()?;
        Ok(())
    }

    pub fn bounds(&self) -> DurationBounds {
        DurationBounds {
            min_stake_days: self.min_stake_days,
            max_stake_days: self.max_stake_days,
        }
    }

    /// Time a stake must stay open before it can close without penalty.
    pub fn min_maturity_seconds(&self) -> Result<i64> {
        days_to_seconds(self.min_stake_days)
    }

    pub fn max_stake_seconds(&self) -> Result<i64> {
        days_to_seconds(self.max_stake_days)
    }
}

pub fn days_to_seconds(days: u32) -> Result<i64> {
    math::checked_mul(days as i64, SECONDS_PER_DAY)
}
