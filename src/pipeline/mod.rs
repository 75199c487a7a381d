//! Request-handling pipeline.
//!
//! # Data Flow
//! ```text
//! route handler (RequestContext + RequestInput)
//!     → Pipeline::command / for_moderator / for_administrator / for_owner
//!         → CommandRequestHandler::dispatch → bind, authorize, validate, dispatch
//!     → Pipeline::fetch
//!         → FetchRequestHandler::handle* → bind, authorize, fetch, filter
//!     → Response (success body, or PipelineError mapped to a status + code)
//! ```
//!
//! # Design Decisions
//! - Route handlers stay declarative; every request runs the same stages
//! - Role tiers are explicit role sets checked by exact membership
//! - Registries are resolved per request from read-only shared state

pub mod binding;
pub mod command_handler;
pub mod error;
pub mod fetch_handler;

use crate::auth::{Principal, ADMINISTRATOR_ROLES, MODERATOR_ROLES, OWNER_ROLES};
use crate::commands::{Command, CommandDispatcher};
use crate::http::request::{RequestContext, RequestInput};
use crate::queries::{FilterResolver, Query};
use crate::validation::ValidatorResolver;

pub use command_handler::{CommandRequestHandler, CommandStage};
pub use error::{ErrorBody, PipelineError};
pub use fetch_handler::FetchRequestHandler;

/// Shared pipeline dependencies. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    dispatcher: CommandDispatcher,
    validators: ValidatorResolver,
    filters: FilterResolver,
    await_outcome: bool,
}

impl Pipeline {
    pub fn new(
        dispatcher: CommandDispatcher,
        validators: ValidatorResolver,
        filters: FilterResolver,
        await_outcome: bool,
    ) -> Self {
        Self {
            dispatcher,
            validators,
            filters,
            await_outcome,
        }
    }

    /// Handler for a command open to anyone, unless the command itself
    /// requires authentication.
    pub fn command<C: Command>(&self, ctx: RequestContext, input: RequestInput) -> CommandRequestHandler<C> {
        CommandRequestHandler::new(self.clone(), ctx, input, None)
    }

    pub fn for_moderator<C: Command>(&self, ctx: RequestContext, input: RequestInput) -> CommandRequestHandler<C> {
        CommandRequestHandler::new(self.clone(), ctx, input, Some(MODERATOR_ROLES))
    }

    pub fn for_administrator<C: Command>(&self, ctx: RequestContext, input: RequestInput) -> CommandRequestHandler<C> {
        CommandRequestHandler::new(self.clone(), ctx, input, Some(ADMINISTRATOR_ROLES))
    }

    pub fn for_owner<C: Command>(&self, ctx: RequestContext, input: RequestInput) -> CommandRequestHandler<C> {
        CommandRequestHandler::new(self.clone(), ctx, input, Some(OWNER_ROLES))
    }

    pub fn fetch<Q: Query>(&self, ctx: RequestContext, input: RequestInput) -> FetchRequestHandler<Q> {
        FetchRequestHandler::new(self.clone(), ctx, input)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn validators(&self) -> &ValidatorResolver {
        &self.validators
    }

    pub fn filters(&self) -> &FilterResolver {
        &self.filters
    }

    pub fn await_outcome(&self) -> bool {
        self.await_outcome
    }
}

/// Require a principal and, when `roles` is given, membership in it.
pub fn authorize<'a>(
    principal: Option<&'a Principal>,
    roles: Option<&[&str]>,
) -> Result<&'a Principal, PipelineError> {
    let principal = principal.ok_or(PipelineError::Unauthenticated)?;
    match roles {
        Some(roles) if !principal.has_any_role(roles) => Err(PipelineError::Forbidden),
        _ => Ok(principal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{ADMINISTRATOR, MODERATOR};

    #[test]
    fn test_authorize() {
        assert!(matches!(authorize(None, None), Err(PipelineError::Unauthenticated)));
        assert!(matches!(
            authorize(None, Some(ADMINISTRATOR_ROLES)),
            Err(PipelineError::Unauthenticated)
        ));

        let moderator = Principal::new("m", MODERATOR, "active");
        let administrator = Principal::new("a", ADMINISTRATOR, "active");
        assert!(matches!(
            authorize(Some(&moderator), Some(ADMINISTRATOR_ROLES)),
            Err(PipelineError::Forbidden)
        ));
        assert_eq!(authorize(Some(&administrator), Some(ADMINISTRATOR_ROLES)).unwrap().user_id, "a");
        assert!(authorize(Some(&moderator), None).is_ok());
    }
}
