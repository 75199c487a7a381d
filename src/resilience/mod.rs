//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Command publish:
//!     → On failure: retries.rs (check if retryable, attempts left)
//!     → backoff.rs (jittered exponential delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries reuse the correlation id so the bus can drop duplicates
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;
