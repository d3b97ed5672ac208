//! Per-account stake ledger.
//!
//! A ledger holds every stake an account ever opened, in creation order, plus
//! cached aggregates over the open ones. Closed stakes stay in place as an
//! audit trail and are skipped by every aggregate.
//!
//! Reward settlement happens at the position level: `stake_shares_total *
//! acc_reward_per_share - reward_debt` is everything the position earned since
//! it was last touched. Because every change to the set of open stakes settles
//! first, the open stakes and their shares were constant over that interval, so
//! the amount is split among them pro rata by shares and credited to each
//! stake's `accrued_reward` until the stake is closed.

use {
    crate::{
        constants::{MAX_STAKES_PER_POSITION, REWARD_SCALE},
        error::StakingError,
        math,
        policy::Forfeit,
    },
    anchor_lang::prelude::*,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct Stake {
    pub id: u64,
    pub principal: u64,
    pub shares: u128,
    pub start_time: i64,
    pub duration_days: u32,
    pub unlock_time: i64,
    // settled but not yet paid out
    pub accrued_reward: u64,
    pub closed: bool,
    pub closed_at: i64,
    pub principal_returned: u64,
    pub reward_returned: u64,
}

impl Stake {
    pub const LEN: usize = 8 + 8 + 16 + 8 + 4 + 8 + 8 + 1 + 8 + 8 + 8;

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Whether the stake has been open long enough to close without penalty.
    pub fn is_mature(&self, now: i64, min_maturity_secs: i64) -> bool {
        now.saturating_sub(self.start_time) >= min_maturity_secs
    }

    pub fn has_ended(&self, now: i64) -> bool {
        now >= self.unlock_time
    }
}

/// Result of closing a stake.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClosedStake {
    pub stake_id: u64,
    pub principal: u64,
    pub shares: u128,
    pub principal_returned: u64,
    pub reward_returned: u64,
    pub forfeit: Forfeit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, AnchorSerialize, AnchorDeserialize)]
pub struct StakeLedger {
    pub total_amount: u64,
    pub stake_shares_total: u128,
    pub reward_debt: u128,
    pub last_stake_id: u64,
    pub stakes: Vec<Stake>,
}

impl StakeLedger {
    /// Serialized size of a ledger holding `capacity` stakes.
    pub const fn space(capacity: usize) -> usize {
        8 + 16 + 16 + 8 + 4 + capacity * Stake::LEN
    }

    pub fn open_stakes(&self) -> impl Iterator<Item = &Stake> {
        self.stakes.iter().filter(|stake| stake.is_open())
    }

    /// Looks up an open stake by id.
    pub fn find_open(&self, stake_id: u64) -> Result<&Stake> {
        self.stakes
            .iter()
            .find(|stake| stake.id == stake_id && stake.is_open())
            .ok_or_else(|| StakingError::StakeNotFound.into())
    }

    fn find_open_index(&self, stake_id: u64) -> Result<usize> {
        self.stakes
            .iter()
            .position(|stake| stake.id == stake_id && stake.is_open())
            .ok_or_else(|| StakingError::StakeNotFound.into())
    }

    /// Reward earned by the position since its last settlement.
    pub fn unsettled_reward(&self, acc_reward_per_share: u128) -> Result<u64> {
        let accrued =
            math::checked_mul_div(self.stake_shares_total, acc_reward_per_share, REWARD_SCALE)?;
        match accrued.checked_sub(self.reward_debt) {
            Some(pending) => math::checked_as_u64(pending),
            None => {
                msg!(
                    "Anomaly: reward debt {} exceeds accrued reward {}",
                    self.reward_debt,
                    accrued
                );
                if cfg!(debug_assertions) {
                    return err!(StakingError::InvariantViolation);
                }
                Ok(0)
            }
        }
    }

    /// Splits `pending` over the open stakes by shares. The rounding remainder
    /// goes to the last open stake so the parts always sum to `pending`.
    fn allocate(&self, pending: u64) -> Result<Vec<(usize, u64)>> {
        let open: Vec<usize> = self
            .stakes
            .iter()
            .enumerate()
            .filter(|(_, stake)| stake.is_open())
            .map(|(index, _)| index)
            .collect();

        let mut parts = Vec::with_capacity(open.len());
        if pending == 0 || open.is_empty() {
            return Ok(parts);
        }

        let mut remaining = pending;
        for (n, &index) in open.iter().enumerate() {
            let part = if n + 1 == open.len() {
                remaining
            } else {
                math::checked_as_u64(math::checked_mul_div(
                    pending as u128,
                    self.stakes[index].shares,
                    self.stake_shares_total,
                )?)?
            };
            remaining = math::checked_sub(remaining, part)?;
            parts.push((index, part));
        }
        Ok(parts)
    }

    /// Credits everything earned since the last settlement to the open stakes
    /// and moves the debt baseline to `acc_reward_per_share`.
    pub fn settle(&mut self, acc_reward_per_share: u128) -> Result<u64> {
        let pending = self.unsettled_reward(acc_reward_per_share)?;
        for (index, part) in self.allocate(pending)? {
            let stake = &mut self.stakes[index];
            stake.accrued_reward = math::checked_add(stake.accrued_reward, part)?;
        }
        self.rebase_debt(acc_reward_per_share)?;
        Ok(pending)
    }

    fn rebase_debt(&mut self, acc_reward_per_share: u128) -> Result<()> {
        self.reward_debt =
            math::checked_mul_div(self.stake_shares_total, acc_reward_per_share, REWARD_SCALE)?;
        Ok(())
    }

    /// Reward a stake would receive if the position were settled at
    /// `acc_reward_per_share`. Nothing is persisted.
    pub fn projected_reward(&self, stake_id: u64, acc_reward_per_share: u128) -> Result<u64> {
        let index = self.find_open_index(stake_id)?;
        let pending = self.unsettled_reward(acc_reward_per_share)?;
        let share = self
            .allocate(pending)?
            .into_iter()
            .find(|(i, _)| *i == index)
            .map(|(_, part)| part)
            .unwrap_or(0);
        math::checked_add(self.stakes[index].accrued_reward, share)
    }

    /// Appends a new stake and returns its id.
    pub fn open_stake(
        &mut self,
        amount: u64,
        duration_days: u32,
        shares: u128,
        unlock_time: i64,
        now: i64,
        acc_reward_per_share: u128,
    ) -> Result<u64> {
        require!(
            self.stakes.len() < MAX_STAKES_PER_POSITION,
            StakingError::TooManyStakes
        );

        // earnings so far belong to the stakes that were open until now
        self.settle(acc_reward_per_share)?;

        let id = math::checked_add(self.last_stake_id, 1)?;
        self.stakes.push(Stake {
            id,
            principal: amount,
            shares,
            start_time: now,
            duration_days,
            unlock_time,
            ..Stake::default()
        });
        self.last_stake_id = id;
        self.total_amount = math::checked_add(self.total_amount, amount)?;
        self.stake_shares_total = math::checked_add(self.stake_shares_total, shares)?;
        self.rebase_debt(acc_reward_per_share)?;

        Ok(id)
    }

    /// Adds principal to an open stake and replaces its shares with
    /// `new_shares`. Returns the shares the stake held before.
    pub fn add_to_stake(
        &mut self,
        stake_id: u64,
        extra_amount: u64,
        new_shares: u128,
        acc_reward_per_share: u128,
    ) -> Result<u128> {
        let index = self.find_open_index(stake_id)?;
        self.settle(acc_reward_per_share)?;

        let stake = &mut self.stakes[index];
        let old_shares = stake.shares;
        require!(new_shares >= old_shares, StakingError::InvariantViolation);
        stake.principal = math::checked_add(stake.principal, extra_amount)?;
        stake.shares = new_shares;

        self.total_amount = math::checked_add(self.total_amount, extra_amount)?;
        self.stake_shares_total = math::checked_add(
            self.stake_shares_total,
            math::checked_sub(new_shares, old_shares)?,
        )?;
        self.rebase_debt(acc_reward_per_share)?;

        Ok(old_shares)
    }

    /// Marks a stake closed, pays out its principal and accrued reward minus
    /// `forfeit`, and removes it from the aggregates.
    pub fn close_stake(
        &mut self,
        stake_id: u64,
        forfeit: Forfeit,
        now: i64,
        acc_reward_per_share: u128,
    ) -> Result<ClosedStake> {
        let index = self.find_open_index(stake_id)?;
        self.settle(acc_reward_per_share)?;

        let stake = &mut self.stakes[index];
        let principal_returned = math::checked_sub(stake.principal, forfeit.principal)?;
        let reward_returned = math::checked_sub(stake.accrued_reward, forfeit.reward)?;

        stake.closed = true;
        stake.closed_at = now;
        stake.accrued_reward = 0;
        stake.principal_returned = principal_returned;
        stake.reward_returned = reward_returned;

        let closed = ClosedStake {
            stake_id,
            principal: stake.principal,
            shares: stake.shares,
            principal_returned,
            reward_returned,
            forfeit,
        };

        self.total_amount = self
            .total_amount
            .checked_sub(closed.principal)
            .ok_or(StakingError::InvariantViolation)?;
        self.stake_shares_total = self
            .stake_shares_total
            .checked_sub(closed.shares)
            .ok_or(StakingError::InvariantViolation)?;
        self.rebase_debt(acc_reward_per_share)?;

        Ok(closed)
    }

    /// Checks the cached aggregates against the open stakes.
    pub fn check_totals(&self) -> Result<()> {
        let mut amount = 0u64;
        let mut shares = 0u128;
        for stake in self.open_stakes() {
            amount = math::checked_add(amount, stake.principal)?;
            shares = math::checked_add(shares, stake.shares)?;
        }
        require!(
            amount == self.total_amount && shares == self.stake_shares_total,
            StakingError::InvariantViolation
        );
        require!(
            self.last_stake_id == self.stakes.len() as u64,
            StakingError::InvariantViolation
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn index(reward: u128, shares: u128) -> u128 {
        reward * REWARD_SCALE / shares
    }

    #[test]
    fn test_open_stake_assigns_sequential_ids() {
        let mut ledger = StakeLedger::default();
        assert_eq!(ledger.open_stake(100, 30, 100, T0, T0, 0).unwrap(), 1);
        assert_eq!(ledger.open_stake(50, 60, 70, T0, T0, 0).unwrap(), 2);

        assert_eq!(ledger.total_amount, 150);
        assert_eq!(ledger.stake_shares_total, 170);
        assert_eq!(ledger.last_stake_id, 2);
        assert_eq!(ledger.reward_debt, 0);
        ledger.check_totals().unwrap();
    }

    #[test]
    fn test_new_shares_do_not_earn_past_rewards() {
        let mut ledger = StakeLedger::default();
        ledger.open_stake(100, 30, 100, T0, T0, 0).unwrap();

        // 500 reward over 100 shares, then a second stake joins
        let acc = index(500, 100);
        ledger.open_stake(300, 30, 300, T0, T0 + 10, acc).unwrap();
        assert_eq!(ledger.stakes[0].accrued_reward, 500);
        assert_eq!(ledger.stakes[1].accrued_reward, 0);
        assert_eq!(ledger.reward_debt, 400 * acc / REWARD_SCALE);
        assert_eq!(ledger.unsettled_reward(acc).unwrap(), 0);

        // 400 more over 400 shares, split 1:3
        let acc = acc + index(400, 400);
        assert_eq!(ledger.unsettled_reward(acc).unwrap(), 400);
        assert_eq!(ledger.projected_reward(1, acc).unwrap(), 600);
        assert_eq!(ledger.projected_reward(2, acc).unwrap(), 300);
        ledger.settle(acc).unwrap();
        assert_eq!(ledger.stakes[0].accrued_reward, 600);
        assert_eq!(ledger.stakes[1].accrued_reward, 300);
    }

    #[test]
    fn test_allocation_remainder_goes_to_last_stake() {
        let mut ledger = StakeLedger::default();
        ledger.open_stake(1, 30, 1, T0, T0, 0).unwrap();
        ledger.open_stake(1, 30, 1, T0, T0, 0).unwrap();
        ledger.open_stake(1, 30, 1, T0, T0, 0).unwrap();

        // rounds up so the position is owed exactly 10
        let acc = 10 * REWARD_SCALE / 3 + 1;
        let pending = ledger.settle(acc).unwrap();
        let credited: u64 = ledger.stakes.iter().map(|s| s.accrued_reward).sum();
        assert_eq!(pending, credited);
        assert_eq!(ledger.stakes[0].accrued_reward, 3);
        assert_eq!(ledger.stakes[2].accrued_reward, 4);
    }

    #[test]
    fn test_add_to_stake_keeps_earlier_reward() {
        let mut ledger = StakeLedger::default();
        ledger.open_stake(100, 30, 100, T0, T0, 0).unwrap();

        let acc = index(250, 100);
        let old = ledger.add_to_stake(1, 100, 200, acc).unwrap();
        assert_eq!(old, 100);
        assert_eq!(ledger.stakes[0].principal, 200);
        assert_eq!(ledger.stakes[0].shares, 200);
        assert_eq!(ledger.stakes[0].accrued_reward, 250);
        assert_eq!(ledger.total_amount, 200);
        assert_eq!(ledger.stake_shares_total, 200);
        assert_eq!(ledger.unsettled_reward(acc).unwrap(), 0);
        ledger.check_totals().unwrap();
    }

    #[test]
    fn test_close_stake_pays_and_removes() {
        let mut ledger = StakeLedger::default();
        ledger.open_stake(100, 30, 100, T0, T0, 0).unwrap();
        ledger.open_stake(100, 30, 100, T0, T0, 0).unwrap();

        let acc = index(1_000, 200);
        let forfeit = Forfeit {
            principal: 10,
            reward: 100,
        };
        let closed = ledger.close_stake(1, forfeit, T0 + 99, acc).unwrap();
        assert_eq!(closed.principal_returned, 90);
        assert_eq!(closed.reward_returned, 400);
        assert_eq!(closed.forfeit, forfeit);

        let stake = &ledger.stakes[0];
        assert!(stake.closed);
        assert_eq!(stake.closed_at, T0 + 99);
        assert_eq!(stake.accrued_reward, 0);
        assert_eq!(ledger.stakes[1].accrued_reward, 500);
        assert_eq!(ledger.total_amount, 100);
        assert_eq!(ledger.stake_shares_total, 100);
        assert_eq!(ledger.stakes.len(), 2);
        ledger.check_totals().unwrap();

        // closed ids cannot be touched again
        assert_eq!(
            ledger.close_stake(1, Forfeit::default(), T0 + 100, acc),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(
            ledger.add_to_stake(1, 5, 5, acc),
            Err(StakingError::StakeNotFound.into())
        );
        assert_eq!(
            ledger.find_open(9).unwrap_err(),
            StakingError::StakeNotFound.into()
        );
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut ledger = StakeLedger::default();
        for _ in 0..MAX_STAKES_PER_POSITION {
            ledger.open_stake(1, 30, 1, T0, T0, 0).unwrap();
        }
        assert_eq!(
            ledger.open_stake(1, 30, 1, T0, T0, 0),
            Err(StakingError::TooManyStakes.into())
        );
    }

    #[test]
    fn test_stake_maturity() {
        let stake = Stake {
            start_time: T0,
            unlock_time: T0 + 100,
            ..Stake::default()
        };
        assert!(!stake.is_mature(T0 + 49, 50));
        assert!(stake.is_mature(T0 + 50, 50));
        assert!(!stake.has_ended(T0 + 99));
        assert!(stake.has_ended(T0 + 100));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_negative_pending_is_reported() {
        let ledger = StakeLedger {
            stake_shares_total: 100,
            reward_debt: 1_000,
            ..StakeLedger::default()
        };
        assert_eq!(
            ledger.unsettled_reward(0),
            Err(StakingError::InvariantViolation.into())
        );
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_negative_pending_is_clamped() {
        let mut ledger = StakeLedger {
            total_amount: 100,
            stake_shares_total: 100,
            reward_debt: 1_000,
            last_stake_id: 1,
            stakes: vec![Stake {
                id: 1,
                principal: 100,
                shares: 100,
                accrued_reward: 7,
                ..Stake::default()
            }],
        };
        assert_eq!(ledger.unsettled_reward(0), Ok(0));

        // 100 shares at index 5 is worth 500, still below the recorded debt
        assert_eq!(ledger.settle(5 * REWARD_SCALE), Ok(0));
        assert_eq!(ledger.stakes[0].accrued_reward, 7);
        assert_eq!(ledger.reward_debt, 500);
        ledger.check_totals().unwrap();
    }
}
