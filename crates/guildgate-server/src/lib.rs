//! guildgate server library
//!
//! OAuth2 verification relay for a community chat platform:
//! - SQLite credential store with tokens sealed at rest
//! - Platform REST client (token exchange, membership, roles, messages)
//! - Replay and sweep engine for re-joining stored identities
//! - Verification callback pipeline and webhook notifications
//! - axum HTTP surface with operator pages

pub mod notify;
pub mod platform;
pub mod server;
pub mod storage;
pub mod sync;
pub mod verify;

#[cfg(test)]
mod test_helpers;
