//! Command validation.
//!
//! # Data Flow
//! ```text
//! bound + authorized command
//!     → ValidatorResolver::validate (all validators for the command type)
//!     → [] → dispatch   [violations] → 400, nothing dispatched
//! ```

pub mod resolver;
pub mod validator;

pub use resolver::{ValidatorRegistry, ValidatorResolver};
pub use validator::{Validator, Violation};
