//! Swappable pricing policies: how shares are minted and how early exits are
//! penalized.

pub mod penalty;
pub mod share_formula;

pub use penalty::*;
pub use share_formula::*;
