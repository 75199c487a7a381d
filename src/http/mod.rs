//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, layers: request id, trace, timeout, body limit)
//!     → middleware/authentication.rs (bearer token → Principal)
//!     → request.rs (RequestContext + RequestInput extractors)
//!     → routes → pipeline
//!     → response.rs (JSON, paged, attachment, operation acknowledgement)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, RequestInput, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
