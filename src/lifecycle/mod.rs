//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build state → Spawn background tasks → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → server drains, reaper/sweeper/loopback exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
