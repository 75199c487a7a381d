//! Caller identity.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → authentication middleware → Authenticator::authenticate
//!     → Principal in request extensions (absent when missing or invalid)
//!     → handlers decide 401/403 per route
//! ```

pub mod identity;
pub mod token;

pub use identity::{Principal, ADMINISTRATOR_ROLES, MODERATOR_ROLES, OWNER_ROLES};
pub use token::{AuthError, Authenticator};
