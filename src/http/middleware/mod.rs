pub mod authentication;

pub use authentication::{authentication_middleware, bearer_token};
