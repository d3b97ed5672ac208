//! Error types for the Weighted Staking program.
//!
//! This module defines all custom error codes that can be returned by the program.
//! Each error has a unique code and descriptive message.
//!
//! ## Error Code Ranges
//! - 6000-6002: Input validation errors
//! - 6003-6006: Ledger state errors
//! - 6007: Time errors
//! - 6008-6010: Math/overflow errors
//! - 6011-6014: Account validation errors

use anchor_lang::prelude::*;

/// Custom error codes for the Weighted Staking program.
///
/// Error codes start at 6000 (Anchor's custom error offset).
#[error_code]
pub enum StakingError {
    // ========== Input Validation Errors (6000-6002) ==========

    /// [6000] Cannot stake, add or fund with zero amount.
    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    /// [6001] Lock duration below the configured minimum or above the maximum.
    #[msg("Stake duration is outside the allowed range")]
    DurationOutOfRange,

    /// [6002] Pool configuration rejected at initialization.
    #[msg("Invalid pool configuration")]
    InvalidPoolConfig,

    // ========== Ledger State Errors (6003-6006) ==========

    /// [6003] Stake id is unknown for this position or already closed.
    #[msg("Stake not found or already closed")]
    StakeNotFound,

    /// [6004] The position account holds the maximum number of stakes.
    #[msg("Position cannot hold more stakes")]
    TooManyStakes,

    /// [6005] Internal accounting no longer balances (negative pending reward,
    /// share totals out of sync).
    #[msg("Ledger invariant violated")]
    InvariantViolation,

    /// [6006] The treasury does not have enough funds for the reward payout.
    #[msg("Insufficient treasury funds for reward payout")]
    InsufficientTreasuryFunds,

    // ========== Time Errors (6007) ==========

    /// [6007] Supplied time is earlier than the last accumulator update.
    #[msg("Timestamp is earlier than the last pool update")]
    InvalidTimestamp,

    // ========== Math/Overflow Errors (6008-6010) ==========

    /// [6008] Arithmetic overflow occurred during calculation.
    #[msg("Arithmetic overflow occurred during calculation")]
    MathOverflow,

    /// [6009] Integer conversion failed (value out of range).
    #[msg("Integer conversion failed - value out of range")]
    ConversionOverflow,

    /// [6010] Division by zero attempted.
    #[msg("Division by zero attempted")]
    DivisionByZero,

    // ========== Account Validation Errors (6011-6014) ==========

    /// [6011] The provided mint does not match the pool's staking token.
    #[msg("Token mint mismatch - wrong token for this pool")]
    MintMismatch,

    /// [6012] The provided vault does not match the pool's staking vault.
    #[msg("Staking vault address mismatch")]
    VaultMismatch,

    /// [6013] The provided treasury does not match the pool's treasury vault.
    #[msg("Treasury vault address mismatch")]
    TreasuryMismatch,

    /// [6014] Signer does not own the position or token account.
    #[msg("Unauthorized: cannot modify another user's stake")]
    UnauthorizedStakeAccess,
}
