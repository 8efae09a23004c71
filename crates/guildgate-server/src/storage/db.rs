//! SQLite database handle for the identity store.

use std::fmt;

guildgate_core::define_database!(IdentityDatabase, "Identity database migrations complete");

impl fmt::Debug for IdentityDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityDatabase")
            .field("connections", &self.pool().size())
            .finish()
    }
}
