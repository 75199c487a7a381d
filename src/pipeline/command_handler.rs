//! Command-request handler.
//!
//! # Data Flow
//! ```text
//! Bound → Authorized → Validated → Dispatched → Resolved
//!   │         │             │            │            └─ 200/202 + Location
//!   400      401/403       400      504/503/409
//! ```
//!
//! Nothing is published unless binding, authorization and validation all pass.

use axum::{http::StatusCode, response::Response};
use std::fmt;
use std::marker::PhantomData;

use crate::commands::{Command, Outcome, Request};
use crate::http::request::{RequestContext, RequestInput};
use crate::http::response;
use crate::observability::metrics;
use crate::pipeline::{binding, authorize, Pipeline, PipelineError};

/// Stage a command request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStage {
    Received,
    Bound,
    Authorized,
    Validated,
    Dispatched,
    Resolved,
}

impl fmt::Display for CommandStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Bound => "bound",
            Self::Authorized => "authorized",
            Self::Validated => "validated",
            Self::Dispatched => "dispatched",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Drives one command request through the pipeline.
pub struct CommandRequestHandler<C> {
    pipeline: Pipeline,
    ctx: RequestContext,
    input: RequestInput,
    required_roles: Option<&'static [&'static str]>,
    await_outcome: bool,
    stage: CommandStage,
    _command: PhantomData<fn() -> C>,
}

impl<C: Command> CommandRequestHandler<C> {
    pub(crate) fn new(
        pipeline: Pipeline,
        ctx: RequestContext,
        input: RequestInput,
        required_roles: Option<&'static [&'static str]>,
    ) -> Self {
        let await_outcome = pipeline.await_outcome();
        Self {
            pipeline,
            ctx,
            input,
            required_roles,
            await_outcome,
            stage: CommandStage::Received,
            _command: PhantomData,
        }
    }

    /// Answer 202 right after publishing instead of waiting for the outcome.
    pub fn fire_and_forget(mut self) -> Self {
        self.await_outcome = false;
        self
    }

    pub fn stage(&self) -> CommandStage {
        self.stage
    }

    /// Run the request to completion and produce the response.
    pub async fn dispatch(mut self) -> Response {
        let result = self.run().await;
        let request_id = self.ctx.request_id;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(
                    request_id = %request_id,
                    trace_id = ?self.ctx.trace_id,
                    command = C::NAME,
                    stage = %self.stage,
                    status = error.status().as_u16(),
                    error = %error,
                    "Command request failed"
                );
                error.into_response_with_id(Some(request_id))
            }
        };

        metrics::record_request(
            self.ctx.method.as_str(),
            response.status().as_u16(),
            "command",
            self.ctx.started_at,
        );
        response
    }

    async fn run(&mut self) -> Result<Response, PipelineError> {
        let mut command: C = binding::bind_command(&self.input)?;
        self.advance(CommandStage::Bound);

        if C::REQUIRES_AUTH || self.required_roles.is_some() {
            let principal = authorize(self.ctx.principal.as_ref(), self.required_roles)?;
            command.set_user_id(principal.user_id.clone());
        }
        self.advance(CommandStage::Authorized);

        let violations = self.pipeline.validators().validate(&command);
        if !violations.is_empty() {
            return Err(PipelineError::ValidationFailed(violations));
        }
        self.advance(CommandStage::Validated);

        let request = Request::new(
            self.ctx.request_id,
            C::NAME,
            self.ctx.path.clone(),
            self.ctx.culture.clone(),
        );
        let dispatcher = self.pipeline.dispatcher();
        let outcome = if self.await_outcome {
            dispatcher.dispatch(&request, &command).await
        } else {
            dispatcher.publish(&request, &command).await
        };
        self.advance(CommandStage::Dispatched);

        let response = match outcome {
            Outcome::Completed { .. } => response::operation(StatusCode::OK, request.id),
            Outcome::Accepted => response::operation(StatusCode::ACCEPTED, request.id),
            Outcome::Rejected { code, message } => return Err(PipelineError::Rejected { code, message }),
            Outcome::Timeout => return Err(PipelineError::Timeout),
            Outcome::DispatchFailed(reason) => return Err(PipelineError::Dispatch(reason)),
        };
        self.advance(CommandStage::Resolved);
        Ok(response)
    }

    fn advance(&mut self, stage: CommandStage) {
        tracing::debug!(request_id = %self.ctx.request_id, command = C::NAME, stage = %stage, "Command stage");
        self.stage = stage;
    }
}
