//! Checked arithmetic helpers.
//!
//! Every helper logs the operands of a failed operation before returning the
//! matching program error, so a failing transaction shows what overflowed.

use {
    crate::error::StakingError,
    anchor_lang::prelude::*,
    primitive_types::U256,
    std::fmt::Display,
};

pub fn checked_add<T>(arg1: T, arg2: T) -> Result<T>
where
    T: num_traits::PrimInt + Display,
{
    if let Some(res) = arg1.checked_add(&arg2) {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} + {}", arg1, arg2);
        err!(StakingError::MathOverflow)
    }
}

pub fn checked_sub<T>(arg1: T, arg2: T) -> Result<T>
where
    T: num_traits::PrimInt + Display,
{
    if let Some(res) = arg1.checked_sub(&arg2) {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} - {}", arg1, arg2);
        err!(StakingError::MathOverflow)
    }
}

pub fn checked_mul<T>(arg1: T, arg2: T) -> Result<T>
where
    T: num_traits::PrimInt + Display,
{
    if let Some(res) = arg1.checked_mul(&arg2) {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} * {}", arg1, arg2);
        err!(StakingError::MathOverflow)
    }
}

pub fn checked_div<T>(arg1: T, arg2: T) -> Result<T>
where
    T: num_traits::PrimInt + Display,
{
    if arg2.is_zero() {
        msg!("Error: Division by zero in {} / {}", arg1, arg2);
        return err!(StakingError::DivisionByZero);
    }
    if let Some(res) = arg1.checked_div(&arg2) {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} / {}", arg1, arg2);
        err!(StakingError::MathOverflow)
    }
}

/// `arg1 * arg2 / denominator`, rounded down. The product is taken in 256 bits,
/// so only a quotient that does not fit in `u128` is an overflow.
pub fn checked_mul_div(arg1: u128, arg2: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        msg!("Error: Division by zero in {} * {} / 0", arg1, arg2);
        return err!(StakingError::DivisionByZero);
    }
    let quotient = U256::from(arg1)
        .full_mul(U256::from(arg2))
        .checked_div(U256::from(denominator).into());
    match quotient {
        Some(res) if res.bits() <= 128 => Ok(res.low_u128()),
        _ => {
            msg!("Error: Overflow in {} * {} / {}", arg1, arg2, denominator);
            err!(StakingError::MathOverflow)
        }
    }
}

/// Applies a basis-point ratio to `amount`, rounded down.
pub fn checked_bps(amount: u64, bps: u64) -> Result<u64> {
    checked_as_u64(checked_mul_div(
        amount as u128,
        bps as u128,
        crate::constants::BASIS_POINTS_DENOMINATOR as u128,
    )?)
}

pub fn checked_as_u64<T>(arg: T) -> Result<u64>
where
    T: Display + num_traits::ToPrimitive + Clone,
{
    let option: Option<u64> = num_traits::NumCast::from(arg.clone());
    if let Some(res) = option {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} as u64", arg);
        err!(StakingError::ConversionOverflow)
    }
}

pub fn checked_as_i64<T>(arg: T) -> Result<i64>
where
    T: Display + num_traits::ToPrimitive + Clone,
{
    let option: Option<i64> = num_traits::NumCast::from(arg.clone());
    if let Some(res) = option {
        Ok(res)
    } else {
        msg!("Error: Overflow in {} as i64", arg);
        err!(StakingError::ConversionOverflow)
    }
}

/// Integer square root, rounded down.
pub fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    // Newton iteration from an upper bound; converges monotonically downwards.
    let mut x = 1u128 << ((128 - value.leading_zeros()) / 2 + 1);
    loop {
        let y = (x + value / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}
