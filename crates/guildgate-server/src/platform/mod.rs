//! Chat platform integration.
//!
//! Provides a reqwest-based client for the platform's OAuth2 token endpoint,
//! identity endpoint, membership/role endpoints, and channel messages.

mod client;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{PlatformClient, PlatformError};
pub use types::{Announcement, JoinResult, PlatformUser, TokenGrant};
