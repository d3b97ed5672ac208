//! Pool-wide reward accumulator.
//!
//! Rewards are emitted continuously at `rewards_per_second` and spread over all
//! open shares. Instead of crediting every stake on every tick, the pool keeps a
//! single index, `acc_reward_per_share`, holding the reward earned by one share
//! since genesis (scaled by `REWARD_SCALE`). A position's reward between two
//! touches is then `shares * (index_now - index_then)`.
//!
//! The index only moves inside `settle`, which every mutating operation calls
//! first with the caller-supplied `now`.

use {
    crate::{constants::REWARD_SCALE, error::StakingError, math},
    anchor_lang::prelude::*,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct PoolState {
    pub total_pooled: u64,
    pub total_shares: u128,
    pub rewards_per_second: u64,
    pub acc_reward_per_share: u128,
    pub last_update_time: i64,
    pub genesis_time: i64,

    // lifetime bookkeeping
    pub total_rewards_emitted: u128,
    pub total_rewards_paid: u64,
    pub total_principal_forfeited: u64,
    pub total_rewards_forfeited: u64,
    pub total_rewards_funded: u64,
}

/// Read-only view of the pool totals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VirtualPool {
    pub total_pooled: u64,
    pub total_shares: u128,
    pub rewards_per_second: u64,
    pub acc_reward_per_share: u128,
    pub last_update_time: i64,
}

impl PoolState {
    pub const LEN: usize = 8 + 16 + 8 + 16 + 8 + 8 + 16 + 8 + 8 + 8 + 8;

    pub fn new(rewards_per_second: u64, now: i64) -> Self {
        Self {
            rewards_per_second,
            last_update_time: now,
            genesis_time: now,
            ..Self::default()
        }
    }

    /// Advances the reward index to `now`.
    ///
    /// Time during which no shares exist emits nothing: the clock still moves
    /// forward so the idle period is never paid to the next depositor.
    pub fn settle(&mut self, now: i64) -> Result<()> {
        require!(
            now >= self.last_update_time,
            StakingError::InvalidTimestamp
        );
        if now == self.last_update_time {
            return Ok(());
        }

        if self.total_shares > 0 {
            let emitted = self.emission_until(now)?;
            self.acc_reward_per_share = math::checked_add(
                self.acc_reward_per_share,
                math::checked_mul_div(emitted, REWARD_SCALE, self.total_shares)?,
            )?;
            self.total_rewards_emitted = math::checked_add(self.total_rewards_emitted, emitted)?;
        }
        self.last_update_time = now;

        Ok(())
    }

    /// Index value `settle(now)` would produce, without persisting it.
    pub fn projected_acc_reward_per_share(&self, now: i64) -> Result<u128> {
        require!(
            now >= self.last_update_time,
            StakingError::InvalidTimestamp
        );
        if self.total_shares == 0 || now == self.last_update_time {
            return Ok(self.acc_reward_per_share);
        }
        math::checked_add(
            self.acc_reward_per_share,
            math::checked_mul_div(self.emission_until(now)?, REWARD_SCALE, self.total_shares)?,
        )
    }

    fn emission_until(&self, now: i64) -> Result<u128> {
        let elapsed = math::checked_sub(now, self.last_update_time)? as u128;
        math::checked_mul(elapsed, self.rewards_per_second as u128)
    }

    pub fn add_totals(&mut self, principal: u64, shares: u128) -> Result<()> {
        self.total_pooled = math::checked_add(self.total_pooled, principal)?;
        self.total_shares = math::checked_add(self.total_shares, shares)?;
        Ok(())
    }

    pub fn remove_totals(&mut self, principal: u64, shares: u128) -> Result<()> {
        // removing more than the pool holds means the books are out of sync
        self.total_pooled = self
            .total_pooled
            .checked_sub(principal)
            .ok_or(StakingError::InvariantViolation)?;
        self.total_shares = self
            .total_shares
            .checked_sub(shares)
            .ok_or(StakingError::InvariantViolation)?;
        Ok(())
    }

    /// Records a deposit into the reward source.
    pub fn record_funding(&mut self, amount: u64) -> Result<()> {
        require!(amount > 0, StakingError::ZeroAmount);
        self.total_rewards_funded = math::checked_add(self.total_rewards_funded, amount)?;
        Ok(())
    }

    /// Funded rewards not yet paid out. Forfeited rewards never leave the
    /// reward source, so they stay in this balance.
    pub fn unpaid_funding(&self) -> u64 {
        self.total_rewards_funded.saturating_sub(self.total_rewards_paid)
    }

    pub fn virtual_pool(&self) -> VirtualPool {
        VirtualPool {
            total_pooled: self.total_pooled,
            total_shares: self.total_shares,
            rewards_per_second: self.rewards_per_second,
            acc_reward_per_share: self.acc_reward_per_share,
            last_update_time: self.last_update_time,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn get_fixture_pool(shares: u128) -> PoolState {
        let mut pool = PoolState::new(1_000, T0);
        pool.add_totals(shares as u64, shares).unwrap();
        pool
    }

    #[test]
    fn test_settle_advances_index() {
        let mut pool = get_fixture_pool(4_000);
        pool.settle(T0 + 10).unwrap();

        // 10s * 1000/s spread over 4000 shares
        assert_eq!(pool.acc_reward_per_share, 10_000 * REWARD_SCALE / 4_000);
        assert_eq!(pool.total_rewards_emitted, 10_000);
        assert_eq!(pool.last_update_time, T0 + 10);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut pool = get_fixture_pool(4_000);
        pool.settle(T0 + 10).unwrap();
        let snapshot = pool.clone();
        pool.settle(T0 + 10).unwrap();
        assert_eq!(pool, snapshot);
    }

    #[test]
    fn test_idle_pool_does_not_accrue() {
        let mut pool = PoolState::new(1_000, T0);
        pool.settle(T0 + 86_400).unwrap();
        assert_eq!(pool.acc_reward_per_share, 0);
        assert_eq!(pool.total_rewards_emitted, 0);
        assert_eq!(pool.last_update_time, T0 + 86_400);

        // the first depositor only earns from its own deposit time
        pool.add_totals(100, 100).unwrap();
        pool.settle(T0 + 86_401).unwrap();
        assert_eq!(pool.total_rewards_emitted, 1_000);
    }

    #[test]
    fn test_settle_rejects_time_travel() {
        let mut pool = get_fixture_pool(1);
        pool.settle(T0 + 5).unwrap();
        assert_eq!(
            pool.settle(T0 + 4),
            Err(StakingError::InvalidTimestamp.into())
        );
        assert_eq!(
            pool.projected_acc_reward_per_share(T0 + 4),
            Err(StakingError::InvalidTimestamp.into())
        );
    }

    #[test]
    fn test_projection_does_not_persist() {
        let mut pool = get_fixture_pool(4_000);
        let projected = pool.projected_acc_reward_per_share(T0 + 10).unwrap();
        assert_eq!(pool.acc_reward_per_share, 0);
        assert_eq!(pool.last_update_time, T0);

        pool.settle(T0 + 10).unwrap();
        assert_eq!(pool.acc_reward_per_share, projected);
    }

    #[test]
    fn test_funding_is_tracked() {
        let mut pool = PoolState::new(1_000, T0);
        pool.record_funding(5_000).unwrap();
        pool.record_funding(2_000).unwrap();
        assert_eq!(pool.total_rewards_funded, 7_000);
        assert_eq!(
            pool.record_funding(0),
            Err(StakingError::ZeroAmount.into())
        );

        pool.total_rewards_paid = 3_000;
        assert_eq!(pool.unpaid_funding(), 4_000);
        pool.total_rewards_paid = 9_000;
        assert_eq!(pool.unpaid_funding(), 0);
    }

    #[test]
    fn test_remove_totals_underflow_is_invariant_violation() {
        let mut pool = get_fixture_pool(10);
        assert_eq!(
            pool.remove_totals(11, 10),
            Err(StakingError::InvariantViolation.into())
        );
    }
}
