//! State structures for the Weighted Staking program.
//!
//! `StakePool` and `UserPosition` are the on-chain accounts; the ledger types
//! they embed (`PoolState`, `StakeLedger`) carry the accounting and are shared
//! with the in-memory engine.

pub mod pool_config;
pub mod pool_state;
pub mod stake_ledger;
pub mod stake_pool;
pub mod user_position;

pub use pool_config::*;
pub use pool_state::*;
pub use stake_ledger::*;
pub use stake_pool::*;
pub use user_position::*;
