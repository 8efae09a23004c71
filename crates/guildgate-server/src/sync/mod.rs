//! Replay and sweep of stored credentials into communities.

mod engine;
mod pacing;
mod report;


pub use engine::{SyncEngine, SyncError};
pub use pacing::{FixedPacer, Pacer};
pub use report::{Failure, OutcomeResult, SyncOutcome, SyncReport};

#[cfg(test)]
pub(crate) use pacing::testing::CountingPacer;
