//! Early-withdrawal penalties.
//!
//! A stake closed before it has been open for the pool's minimum duration
//! forfeits part of its principal and/or accrued reward. Forfeited amounts stay
//! with the pool's reward source.

use {
    crate::{
        constants::{
            BASIS_POINTS_DENOMINATOR, DEFAULT_MAX_PRINCIPAL_PENALTY_BPS,
            DEFAULT_MAX_REWARD_PENALTY_BPS,
        },
        math,
        state::Stake,
    },
    anchor_lang::prelude::{borsh, *},
};

/// Amounts withheld from a closing stake.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Forfeit {
    pub principal: u64,
    pub reward: u64,
}

impl Forfeit {
    pub fn is_zero(&self) -> bool {
        self.principal == 0 && self.reward == 0
    }
}

/// Computes the forfeiture for closing `stake` at `now`.
///
/// `reward` is the reward the stake would receive without penalty and
/// `min_maturity_secs` the minimum time a stake must stay open to exit freely.
/// Implementations must never forfeit more than the principal or the reward.
pub trait PenaltyPolicy {
    fn penalty(
        &self,
        stake: &Stake,
        reward: u64,
        now: i64,
        min_maturity_secs: i64,
    ) -> Result<Forfeit>;
}

#[derive(Copy, Clone, PartialEq, Eq, AnchorSerialize, AnchorDeserialize, Debug)]
pub enum PenaltyConfig {
    /// Forfeiture starts at the given maxima when the stake is opened and
    /// decreases linearly to zero at minimum maturity.
    LinearRamp {
        max_principal_bps: u16,
        max_reward_bps: u16,
    },
    /// Fixed forfeiture for any close before minimum maturity.
    Flat { principal_bps: u16, reward_bps: u16 },
    /// Principal is returned in full, the whole accrued reward is forfeited.
    RewardOnly,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self::LinearRamp {
            max_principal_bps: DEFAULT_MAX_PRINCIPAL_PENALTY_BPS,
            max_reward_bps: DEFAULT_MAX_REWARD_PENALTY_BPS,
        }
    }
}

impl PenaltyConfig {
    pub const LEN: usize = 1 + 2 + 2;

    pub fn validate(&self) -> bool {
        let max = BASIS_POINTS_DENOMINATOR as u16;
        match *self {
            PenaltyConfig::LinearRamp {
                max_principal_bps,
                max_reward_bps,
            } => max_principal_bps <= max && max_reward_bps <= max,
            PenaltyConfig::Flat {
                principal_bps,
                reward_bps,
            } => principal_bps <= max && reward_bps <= max,
            PenaltyConfig::RewardOnly => true,
        }
    }
}

impl PenaltyPolicy for PenaltyConfig {
    fn penalty(
        &self,
        stake: &Stake,
        reward: u64,
        now: i64,
        min_maturity_secs: i64,
    ) -> Result<Forfeit> {
        let elapsed = math::checked_sub(now, stake.start_time)?.max(0);
        if elapsed >= min_maturity_secs {
            return Ok(Forfeit::default());
        }

        match *self {
            PenaltyConfig::LinearRamp {
                max_principal_bps,
                max_reward_bps,
            } => {
                let remaining = math::checked_sub(min_maturity_secs, elapsed)? as u128;
                let ramp = |max_bps: u16| -> Result<u64> {
                    math::checked_as_u64(math::checked_mul_div(
                        max_bps as u128,
                        remaining,
                        min_maturity_secs as u128,
                    )?)
                };
                Ok(Forfeit {
                    principal: math::checked_bps(stake.principal, ramp(max_principal_bps)?)?,
                    reward: math::checked_bps(reward, ramp(max_reward_bps)?)?,
                })
            }
            PenaltyConfig::Flat {
                principal_bps,
                reward_bps,
            } => Ok(Forfeit {
                principal: math::checked_bps(stake.principal, principal_bps as u64)?,
                reward: math::checked_bps(reward, reward_bps as u64)?,
            }),
            PenaltyConfig::RewardOnly => Ok(Forfeit {
                principal: 0,
                reward,
            }),
        }
    }
}
