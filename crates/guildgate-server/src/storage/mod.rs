//! SQLite storage for verified identities.
//!
//! [`IdentityDatabase`] runs the queries against the `verified_users` table;
//! [`CredentialStore`] wraps it with token sealing so callers only ever hand
//! in and reveal plaintext tokens through one place.

mod db;
mod models;
mod queries;
mod store;


pub use db::IdentityDatabase;
pub use guildgate_core::db::DatabaseError;
pub use models::{NewIdentity, StoredCredential, VerifiedIdentity};
pub use store::CredentialStore;
