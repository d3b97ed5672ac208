//! Instruction handlers for the Weighted Staking program.
//!
//! This module contains all instruction implementations.

pub mod add_stake;
pub mod end_stake;
pub mod fund_treasury;
pub mod initialize;
pub mod stake;

pub use add_stake::*;
pub use end_stake::*;
pub use fund_treasury::*;
pub use initialize::*;
pub use stake::*;
