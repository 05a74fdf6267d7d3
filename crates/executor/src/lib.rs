//! Deterministic command execution over the world state view.
//!
//! The executor applies one command at a time against a store transaction.
//! With validation enabled it performs permission and precondition checks;
//! with validation disabled (block replay) it trusts the caller and only
//! keeps the checks that guard state integrity (existence of touched
//! entities, arithmetic).
//!
//! [`BlockApplier`] drives whole blocks: one store transaction per block, one
//! savepoint per member transaction. A failing transaction rolls back to its
//! savepoint and is recorded as rejected; the block still commits.

mod access;
mod applier;
mod error;
mod executor;
mod presence;

pub use access::{DbContext, DbOp, Expect};
pub use applier::{read_ledger_state, read_peers, ApplyError, BlockApplier};
pub use error::{codes, CommandError, DbError};
pub use executor::CommandExecutor;
pub use presence::StorePresenceCache;
