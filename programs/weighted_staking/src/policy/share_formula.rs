//! Stake share formulas.
//!
//! A stake's share is its principal scaled by a duration bonus: a stake at the
//! minimum duration earns exactly its principal in shares, longer locks earn
//! more, up to a bounded multiplier at the maximum duration.

use {
    crate::{
        constants::{BASIS_POINTS_DENOMINATOR, DEFAULT_MAX_SHARE_BONUS_BPS, MAX_SHARE_BONUS_BPS},
        math,
    },
    anchor_lang::prelude::{borsh, *},
};

/// Accepted lock durations, in days, inclusive on both ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DurationBounds {
    pub min_stake_days: u32,
    pub max_stake_days: u32,
}

impl DurationBounds {
    pub fn contains(&self, duration_days: u32) -> bool {
        duration_days >= self.min_stake_days && duration_days <= self.max_stake_days
    }

    fn clamp(&self, duration_days: u32) -> u32 {
        duration_days.clamp(self.min_stake_days, self.max_stake_days)
    }
}

/// Maps (amount, duration) to a share quantity.
///
/// Implementations must be pure, non-decreasing in both arguments, return at
/// least `amount` at the minimum duration and stay bounded at the maximum.
pub trait ShareFormula {
    fn shares(&self, amount: u64, duration_days: u32, bounds: &DurationBounds) -> Result<u128>;
}

#[derive(Copy, Clone, PartialEq, Eq, AnchorSerialize, AnchorDeserialize, Debug)]
pub enum ShareCurve {
    /// Bonus grows linearly from 0 at the minimum duration to
    /// `max_bonus_bps` at the maximum.
    Linear { max_bonus_bps: u32 },
    /// Bonus grows with the square root of the elapsed duration range,
    /// front-loading most of the bonus on shorter locks.
    SquareRoot { max_bonus_bps: u32 },
}

impl Default for ShareCurve {
    fn default() -> Self {
        Self::Linear {
            max_bonus_bps: DEFAULT_MAX_SHARE_BONUS_BPS,
        }
    }
}

// fixed-point scale used to take the square root of a [0, 1] fraction
const SQRT_FRACTION_SCALE: u128 = 1_000_000_000_000;
const SQRT_FRACTION_ROOT: u128 = 1_000_000;

impl ShareCurve {
    pub const LEN: usize = 1 + 4;

    pub fn max_bonus_bps(&self) -> u32 {
        match self {
            ShareCurve::Linear { max_bonus_bps } | ShareCurve::SquareRoot { max_bonus_bps } => {
                *max_bonus_bps
            }
        }
    }

    pub fn validate(&self) -> bool {
        self.max_bonus_bps() <= MAX_SHARE_BONUS_BPS
    }

    fn bonus(&self, amount: u64, duration_days: u32, bounds: &DurationBounds) -> Result<u128> {
        let max_bonus =
            math::checked_mul(amount as u128, self.max_bonus_bps() as u128)?;
        let span = (bounds.max_stake_days - bounds.min_stake_days) as u128;
        if span == 0 {
            // single admissible duration: it is the maximum
            return math::checked_div(max_bonus, BASIS_POINTS_DENOMINATOR as u128);
        }
        let elapsed = (bounds.clamp(duration_days) - bounds.min_stake_days) as u128;

        match self {
            ShareCurve::Linear { .. } => math::checked_div(
                math::checked_mul(max_bonus, elapsed)?,
                math::checked_mul(span, BASIS_POINTS_DENOMINATOR as u128)?,
            ),
            ShareCurve::SquareRoot { .. } => {
                let fraction = math::checked_mul_div(elapsed, SQRT_FRACTION_SCALE, span)?;
                math::checked_div(
                    math::checked_mul(max_bonus, math::isqrt(fraction))?,
                    SQRT_FRACTION_ROOT * BASIS_POINTS_DENOMINATOR as u128,
                )
            }
        }
    }
}

impl ShareFormula for ShareCurve {
    fn shares(&self, amount: u64, duration_days: u32, bounds: &DurationBounds) -> Result<u128> {
        math::checked_add(amount as u128, self.bonus(amount, duration_days, bounds)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ONE_M: u64 = 1_000_000_000_000_000; // 1M tokens, 9 decimals

    fn bounds() -> DurationBounds {
        DurationBounds {
            min_stake_days: 28,
            max_stake_days: 2888,
        }
    }

    fn curves() -> [ShareCurve; 2] {
        [
            ShareCurve::Linear {
                max_bonus_bps: 20_000,
            },
            ShareCurve::SquareRoot {
                max_bonus_bps: 20_000,
            },
        ]
    }

    #[test]
    fn test_minimum_duration_earns_principal() {
        for curve in curves() {
            assert_eq!(curve.shares(ONE_M, 28, &bounds()).unwrap(), ONE_M as u128);
        }
    }

    #[test]
    fn test_maximum_duration_is_bounded() {
        for curve in curves() {
            assert_eq!(
                curve.shares(ONE_M, 2888, &bounds()).unwrap(),
                3 * ONE_M as u128
            );
            // past the maximum nothing more is granted
            assert_eq!(
                curve.shares(ONE_M, 5000, &bounds()).unwrap(),
                3 * ONE_M as u128
            );
        }
    }

    #[test]
    fn test_linear_curve_value() {
        // 100 days: bonus = 2.0 * 72 / 2860
        let shares = ShareCurve::default().shares(ONE_M, 100, &bounds()).unwrap();
        assert_eq!(
            shares,
            ONE_M as u128 + (ONE_M as u128 * 2 * 72) / 2860
        );
    }

    #[test]
    fn test_square_root_front_loads_bonus() {
        let linear = ShareCurve::Linear {
            max_bonus_bps: 20_000,
        };
        let sqrt = ShareCurve::SquareRoot {
            max_bonus_bps: 20_000,
        };
        for days in [29, 100, 365, 1000, 2000] {
            assert!(
                sqrt.shares(ONE_M, days, &bounds()).unwrap()
                    >= linear.shares(ONE_M, days, &bounds()).unwrap()
            );
        }
        // a quarter of the range earns half of the bonus
        let quarter = 28 + 2860 / 4;
        assert_eq!(
            sqrt.shares(ONE_M, quarter, &bounds()).unwrap(),
            2 * ONE_M as u128
        );
    }

    #[test]
    fn test_monotonic_in_both_arguments() {
        for curve in curves() {
            let mut previous = 0;
            for days in (28..=2888).step_by(37) {
                let shares = curve.shares(ONE_M, days, &bounds()).unwrap();
                assert!(shares >= previous);
                previous = shares;
            }
            let mut previous = 0;
            for amount in [1, 2, 10, 999, 1_000, ONE_M] {
                let shares = curve.shares(amount, 365, &bounds()).unwrap();
                assert!(shares >= previous);
                assert!(shares >= amount as u128);
                previous = shares;
            }
        }
    }

    #[test]
    fn test_single_duration_range() {
        let bounds = DurationBounds {
            min_stake_days: 90,
            max_stake_days: 90,
        };
        let shares = ShareCurve::default().shares(1_000, 90, &bounds).unwrap();
        assert_eq!(shares, 3_000);
    }

    #[test]
    fn test_validate() {
        assert!(ShareCurve::default().validate());
        assert!(!ShareCurve::Linear {
            max_bonus_bps: MAX_SHARE_BONUS_BPS + 1
        }
        .validate());
    }
}
