//! Validator trait and violation type.

use serde::Serialize;
use std::fmt;

/// One rule a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Offending field, when the rule is about a single field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Checks a command before it is dispatched. An empty result means valid.
pub trait Validator<C>: Send + Sync {
    fn validate(&self, command: &C) -> Vec<Violation>;
}

impl<C, F> Validator<C> for F
where
    F: Fn(&C) -> Vec<Violation> + Send + Sync,
{
    fn validate(&self, command: &C) -> Vec<Violation> {
        self(command)
    }
}
