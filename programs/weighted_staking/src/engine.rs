//! Pool engine.
//!
//! The `apply_*` functions are the only way the ledger changes. Each one
//! validates its arguments, settles the pool accumulator at `now`, computes the
//! share or penalty effect and updates the position and the pool totals. The
//! work happens on staged copies that are committed together, so a failing
//! operation leaves both untouched. The on-chain instructions call these
//! functions on their accounts; `PoolEngine` calls them on an in-memory map of
//! positions.

use {
    crate::{
        error::StakingError,
        math,
        policy::{Forfeit, PenaltyConfig, PenaltyPolicy, ShareCurve, ShareFormula},
        state::{days_to_seconds, PoolConfig, PoolState, StakeLedger, VirtualPool},
    },
    anchor_lang::prelude::*,
    std::collections::BTreeMap,
};

/// Outcome of `end_stake`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EndStakeReceipt {
    pub stake_id: u64,
    pub principal_returned: u64,
    pub reward_returned: u64,
    pub principal_forfeited: u64,
    pub reward_forfeited: u64,
    pub penalty_applied: bool,
}

fn transact<T>(
    state: &mut PoolState,
    ledger: &mut StakeLedger,
    op: impl FnOnce(&mut PoolState, &mut StakeLedger) -> Result<T>,
) -> Result<T> {
    let mut staged_state = state.clone();
    let mut staged_ledger = ledger.clone();
    let out = op(&mut staged_state, &mut staged_ledger)?;
    staged_ledger.check_totals()?;
    *state = staged_state;
    *ledger = staged_ledger;
    Ok(out)
}

/// Opens a new stake of `amount` locked for `duration_days`.
pub fn apply_stake<F: ShareFormula>(
    config: &PoolConfig,
    share_formula: &F,
    state: &mut PoolState,
    ledger: &mut StakeLedger,
    amount: u64,
    duration_days: u32,
    now: i64,
) -> Result<u64> {
    require!(amount > 0, StakingError::ZeroAmount);
    let bounds = config.bounds();
    require!(
        bounds.contains(duration_days),
        StakingError::DurationOutOfRange
    );

    transact(state, ledger, |state, ledger| {
        state.settle(now)?;

        let shares = share_formula.shares(amount, duration_days, &bounds)?;
        let unlock_time = math::checked_add(now, days_to_seconds(duration_days)?)?;
        let stake_id = ledger.open_stake(
            amount,
            duration_days,
            shares,
            unlock_time,
            now,
            state.acc_reward_per_share,
        )?;
        state.add_totals(amount, shares)?;

        msg!(
            "Stake {} opened: {} tokens for {} days, {} shares",
            stake_id,
            amount,
            duration_days,
            shares
        );
        Ok(stake_id)
    })
}

/// Adds `amount` to an open stake. The stake keeps its duration and unlock
/// time; its shares are recomputed for the new principal.
pub fn apply_add_stake<F: ShareFormula>(
    config: &PoolConfig,
    share_formula: &F,
    state: &mut PoolState,
    ledger: &mut StakeLedger,
    stake_id: u64,
    amount: u64,
    now: i64,
) -> Result<()> {
    require!(amount > 0, StakingError::ZeroAmount);
    let stake = ledger.find_open(stake_id)?;
    let principal = math::checked_add(stake.principal, amount)?;
    let new_shares = share_formula.shares(principal, stake.duration_days, &config.bounds())?;

    transact(state, ledger, |state, ledger| {
        state.settle(now)?;

        let old_shares =
            ledger.add_to_stake(stake_id, amount, new_shares, state.acc_reward_per_share)?;
        state.add_totals(amount, math::checked_sub(new_shares, old_shares)?)?;

        msg!(
            "Stake {} extended by {} tokens, shares {} -> {}",
            stake_id,
            amount,
            old_shares,
            new_shares
        );
        Ok(())
    })
}

/// Closes an open stake, returning principal and reward net of any early
/// withdrawal penalty.
pub fn apply_end_stake<P: PenaltyPolicy>(
    config: &PoolConfig,
    penalty_policy: &P,
    state: &mut PoolState,
    ledger: &mut StakeLedger,
    stake_id: u64,
    now: i64,
) -> Result<EndStakeReceipt> {
    ledger.find_open(stake_id)?;
    let min_maturity = config.min_maturity_seconds()?;

    transact(state, ledger, |state, ledger| {
        state.settle(now)?;
        ledger.settle(state.acc_reward_per_share)?;

        let stake = ledger.find_open(stake_id)?;
        if !stake.has_ended(now) {
            msg!(
                "Stake {} ended {}s before its unlock time",
                stake_id,
                stake.unlock_time.saturating_sub(now)
            );
        }
        let forfeit = if stake.is_mature(now, min_maturity) {
            Forfeit::default()
        } else {
            penalty_policy.penalty(stake, stake.accrued_reward, now, min_maturity)?
        };
        require!(
            forfeit.principal <= stake.principal && forfeit.reward <= stake.accrued_reward,
            StakingError::InvariantViolation
        );

        let closed = ledger.close_stake(stake_id, forfeit, now, state.acc_reward_per_share)?;
        state.remove_totals(closed.principal, closed.shares)?;
        state.total_rewards_paid =
            math::checked_add(state.total_rewards_paid, closed.reward_returned)?;
        state.total_principal_forfeited =
            math::checked_add(state.total_principal_forfeited, forfeit.principal)?;
        state.total_rewards_forfeited =
            math::checked_add(state.total_rewards_forfeited, forfeit.reward)?;

        msg!(
            "Stake {} ended: {} principal, {} reward returned",
            stake_id,
            closed.principal_returned,
            closed.reward_returned
        );
        if !forfeit.is_zero() {
            msg!(
                "Early exit penalty: {} principal, {} reward forfeited",
                forfeit.principal,
                forfeit.reward
            );
        }

        Ok(EndStakeReceipt {
            stake_id,
            principal_returned: closed.principal_returned,
            reward_returned: closed.reward_returned,
            principal_forfeited: forfeit.principal,
            reward_forfeited: forfeit.reward,
            penalty_applied: !forfeit.is_zero(),
        })
    })
}

/// In-memory staking pool: one `PoolState` plus one `StakeLedger` per account.
///
/// Every mutating call takes `&mut self`, so operations on the pool are
/// serialized by the borrow checker.
#[derive(Clone, Debug)]
pub struct PoolEngine<F = ShareCurve, P = PenaltyConfig> {
    config: PoolConfig,
    share_formula: F,
    penalty_policy: P,
    reward_source: Pubkey,
    state: PoolState,
    positions: BTreeMap<Pubkey, StakeLedger>,
}

impl PoolEngine {
    /// Creates a pool using the share curve and penalty chosen in `config`.
    pub fn new(config: PoolConfig, reward_source: Pubkey, now: i64) -> Result<Self> {
        Self::with_policies(
            config,
            config.share_curve,
            config.penalty,
            reward_source,
            now,
        )
    }
}

impl<F: ShareFormula, P: PenaltyPolicy> PoolEngine<F, P> {
    /// Creates a pool with custom share and penalty policies. The curve and
    /// penalty stored in `config` are ignored.
    pub fn with_policies(
        config: PoolConfig,
        share_formula: F,
        penalty_policy: P,
        reward_source: Pubkey,
        now: i64,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            share_formula,
            penalty_policy,
            reward_source,
            state: PoolState::new(config.rewards_per_second, now),
            positions: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn stake(&mut self, owner: Pubkey, amount: u64, duration_days: u32, now: i64) -> Result<u64> {
        let mut ledger = self.positions.get(&owner).cloned().unwrap_or_default();
        let stake_id = apply_stake(
            &self.config,
            &self.share_formula,
            &mut self.state,
            &mut ledger,
            amount,
            duration_days,
            now,
        )?;
        self.positions.insert(owner, ledger);
        Ok(stake_id)
    }

    pub fn add_stake(&mut self, owner: Pubkey, stake_id: u64, amount: u64, now: i64) -> Result<()> {
        let ledger = self
            .positions
            .get_mut(&owner)
            .ok_or(StakingError::StakeNotFound)?;
        apply_add_stake(
            &self.config,
            &self.share_formula,
            &mut self.state,
            ledger,
            stake_id,
            amount,
            now,
        )
    }

    pub fn end_stake(&mut self, owner: Pubkey, stake_id: u64, now: i64) -> Result<EndStakeReceipt> {
        let ledger = self
            .positions
            .get_mut(&owner)
            .ok_or(StakingError::StakeNotFound)?;
        let receipt = apply_end_stake(
            &self.config,
            &self.penalty_policy,
            &mut self.state,
            ledger,
            stake_id,
            now,
        )?;
        if receipt.reward_returned > 0 {
            msg!(
                "Reward {} paid to {} from {}",
                receipt.reward_returned,
                owner,
                self.reward_source
            );
        }
        Ok(receipt)
    }

    /// Records `amount` deposited into the reward source.
    pub fn fund_rewards(&mut self, amount: u64) -> Result<()> {
        self.state.record_funding(amount)?;
        msg!(
            "Reward source {} funded with {}, {} unpaid",
            self.reward_source,
            amount,
            self.state.unpaid_funding()
        );
        Ok(())
    }

    pub fn get_user_position(&self, owner: &Pubkey) -> Option<&StakeLedger> {
        self.positions.get(owner)
    }

    /// Pool totals as of the last settlement.
    pub fn get_virtual_pool(&self) -> VirtualPool {
        self.state.virtual_pool()
    }

    /// Pool totals as they would be after settling at `now`.
    pub fn get_projected_pool(&self, now: i64) -> Result<VirtualPool> {
        Ok(VirtualPool {
            acc_reward_per_share: self.state.projected_acc_reward_per_share(now)?,
            last_update_time: now,
            ..self.state.virtual_pool()
        })
    }

    /// Reward `stake_id` would pay if it were ended at `now` without penalty.
    pub fn pending_reward(&self, owner: &Pubkey, stake_id: u64, now: i64) -> Result<u64> {
        let ledger = self
            .positions
            .get(owner)
            .ok_or(StakingError::StakeNotFound)?;
        ledger.projected_reward(stake_id, self.state.projected_acc_reward_per_share(now)?)
    }

    /// Checks pool totals against the sum of all positions.
    pub fn verify_invariants(&self) -> Result<()> {
        let mut pooled = 0u64;
        let mut shares = 0u128;
        for ledger in self.positions.values() {
            ledger.check_totals()?;
            pooled = math::checked_add(pooled, ledger.total_amount)?;
            shares = math::checked_add(shares, ledger.stake_shares_total)?;
        }
        require!(
            pooled == self.state.total_pooled && shares == self.state.total_shares,
            StakingError::InvariantViolation
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{constants::SECONDS_PER_DAY, policy::DurationBounds, state::Stake},
    };

    const T0: i64 = 1_700_000_000;
    const DAY: i64 = SECONDS_PER_DAY;

    fn get_fixture_engine() -> PoolEngine {
        let config = PoolConfig {
            rewards_per_second: 1_000,
            ..PoolConfig::default()
        };
        PoolEngine::new(config, Pubkey::new_unique(), T0).unwrap()
    }

    #[test]
    fn test_validation_happens_before_mutation() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();

        assert_eq!(
            engine.stake(alice, 0, 100, T0 + 5),
            Err(StakingError::ZeroAmount.into())
        );
        assert_eq!(
            engine.stake(alice, 100, 27, T0 + 5),
            Err(StakingError::DurationOutOfRange.into())
        );
        assert_eq!(
            engine.stake(alice, 100, 2889, T0 + 5),
            Err(StakingError::DurationOutOfRange.into())
        );

        // nothing was settled or created
        assert_eq!(engine.state().last_update_time, T0);
        assert!(engine.get_user_position(&alice).is_none());
    }

    #[test]
    fn test_failed_operation_rolls_back() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        engine.stake(alice, 1_000, 100, T0).unwrap();
        let state_before = engine.state().clone();
        let ledger_before = engine.get_user_position(&alice).unwrap().clone();

        // time travel is detected inside the staged transaction
        assert_eq!(
            engine.stake(alice, 1_000, 100, T0 - 1),
            Err(StakingError::InvalidTimestamp.into())
        );
        assert_eq!(engine.state(), &state_before);
        assert_eq!(engine.get_user_position(&alice).unwrap(), &ledger_before);
    }

    #[test]
    fn test_unknown_owner_or_stake() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        engine.stake(alice, 1_000, 100, T0).unwrap();

        // bob cannot reach alice's stake
        assert_eq!(
            engine.end_stake(bob, 1, T0 + DAY),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(
            engine.add_stake(bob, 1, 10, T0 + DAY),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(
            engine.add_stake(alice, 2, 10, T0 + DAY),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(
            engine.add_stake(alice, 1, 0, T0 + DAY),
            Err(StakingError::ZeroAmount.into())
        );
    }

    #[test]
    fn test_virtual_pool_is_not_advanced_by_reads() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        engine.stake(alice, 1_000, 28, T0).unwrap();

        let projected = engine.get_projected_pool(T0 + 100).unwrap();
        assert!(projected.acc_reward_per_share > 0);
        assert_eq!(engine.get_virtual_pool().acc_reward_per_share, 0);
        assert_eq!(engine.get_virtual_pool().last_update_time, T0);
        assert_eq!(engine.pending_reward(&alice, 1, T0 + 100).unwrap(), 100_000);
        assert_eq!(engine.get_virtual_pool().acc_reward_per_share, 0);
    }

    #[test]
    fn test_add_stake_keeps_duration_and_unlock_time() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        engine.stake(alice, 1_000, 100, T0).unwrap();
        let before = engine.get_user_position(&alice).unwrap().stakes[0].clone();

        engine.add_stake(alice, 1, 1_000, T0 + 50 * DAY).unwrap();
        let after = &engine.get_user_position(&alice).unwrap().stakes[0];
        assert_eq!(after.principal, 2_000);
        assert_eq!(after.duration_days, before.duration_days);
        assert_eq!(after.unlock_time, before.unlock_time);
        assert_eq!(after.start_time, before.start_time);
        assert_eq!(
            after.shares,
            ShareCurve::default()
                .shares(2_000, 100, &engine.config().bounds())
                .unwrap()
        );
        assert_eq!(engine.state().total_shares, after.shares);
        engine.verify_invariants().unwrap();
    }

    #[test]
    fn test_end_stake_twice_fails() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        engine.stake(alice, 1_000, 28, T0).unwrap();

        let receipt = engine.end_stake(alice, 1, T0 + 28 * DAY).unwrap();
        assert_eq!(receipt.principal_returned, 1_000);
        assert_eq!(receipt.reward_returned, 28 * DAY as u64 * 1_000);
        assert!(!receipt.penalty_applied);

        let paid = engine.state().total_rewards_paid;
        assert_eq!(
            engine.end_stake(alice, 1, T0 + 29 * DAY),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(engine.state().total_rewards_paid, paid);
    }

    #[test]
    fn test_funding_and_payouts_share_books() {
        let mut engine = get_fixture_engine();
        let alice = Pubkey::new_unique();
        engine.fund_rewards(5_000_000_000).unwrap();
        engine.stake(alice, 1_000, 28, T0).unwrap();

        let receipt = engine.end_stake(alice, 1, T0 + 28 * DAY).unwrap();
        assert_eq!(receipt.reward_returned, 2_419_200_000);
        assert_eq!(engine.state().total_rewards_funded, 5_000_000_000);
        assert_eq!(engine.state().unpaid_funding(), 2_580_800_000);
        assert_eq!(
            engine.fund_rewards(0),
            Err(StakingError::ZeroAmount.into())
        );
    }

    #[test]
    fn test_custom_policies_are_injected() {
        // every stake weighs the same regardless of amount or duration
        struct FlatShares;
        impl ShareFormula for FlatShares {
            fn shares(&self, _amount: u64, _days: u32, _bounds: &DurationBounds) -> Result<u128> {
                Ok(1_000)
            }
        }
        struct NoPenalty;
        impl PenaltyPolicy for NoPenalty {
            fn penalty(&self, _stake: &Stake, _reward: u64, _now: i64, _min: i64) -> Result<Forfeit> {
                Ok(Forfeit::default())
            }
        }

        let config = PoolConfig {
            rewards_per_second: 10,
            ..PoolConfig::default()
        };
        let mut engine =
            PoolEngine::with_policies(config, FlatShares, NoPenalty, Pubkey::new_unique(), T0)
                .unwrap();
        let small = Pubkey::new_unique();
        let large = Pubkey::new_unique();
        engine.stake(small, 1, 28, T0).unwrap();
        engine.stake(large, 1_000_000, 2888, T0).unwrap();

        let a = engine.end_stake(small, 1, T0 + 100).unwrap();
        let b = engine.end_stake(large, 1, T0 + 100).unwrap();
        assert_eq!(a.reward_returned, 500);
        assert_eq!(b.reward_returned, 500);
        assert!(!a.penalty_applied);
    }
}
