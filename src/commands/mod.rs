//! Command side of the gateway.
//!
//! # Data Flow
//! ```text
//! command handler
//!     → CommandDispatcher::dispatch
//!         → PendingOperations::register(request id)
//!         → CommandBus::publish (channel or HTTP adapter)
//!     ← POST /operations callback / loopback consumer
//!         → PendingOperations::complete → Outcome
//! ```
//!
//! # Design Decisions
//! - The request id is the correlation id end to end
//! - At most one logical publish per request; transport retries reuse the id
//! - A dispatch wait is always bounded

pub mod bus;
pub mod command;
pub mod dispatcher;
pub mod outcome;
pub mod pending;

pub use bus::{BusError, ChannelBus, CommandBus, HttpCommandBus};
pub use command::{BusMessage, Command, FilePayload, Request};
pub use dispatcher::CommandDispatcher;
pub use outcome::{OperationUpdate, Outcome};
pub use pending::{PendingGuard, PendingOperations};
