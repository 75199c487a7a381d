//! Registry of validators per command type.
//!
//! # Design Decisions
//! - A command type may have any number of validators, including none
//! - Every validator runs; violations are concatenated in registration order

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::validation::validator::{Validator, Violation};

/// Validators registered for one command type.
pub type ValidatorList<C> = Vec<Arc<dyn Validator<C>>>;

/// Startup-time collection of validators, keyed by command type.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator for commands of type `C`.
    pub fn register<C, V>(&mut self, validator: V) -> &mut Self
    where
        C: 'static,
        V: Validator<C> + 'static,
    {
        let validator: Arc<dyn Validator<C>> = Arc::new(validator);
        let entry = self
            .validators
            .entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(ValidatorList::<C>::new()));
        if let Some(list) = entry.downcast_mut::<ValidatorList<C>>() {
            list.push(validator);
        }
        self
    }

    /// Number of command types with at least one validator.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Shared, read-only view over a [`ValidatorRegistry`].
#[derive(Clone, Default)]
pub struct ValidatorResolver {
    registry: Arc<ValidatorRegistry>,
}

impl ValidatorResolver {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// All validators registered for `C`, possibly none.
    pub fn resolve<C: 'static>(&self) -> ValidatorList<C> {
        self.registry
            .validators
            .get(&TypeId::of::<C>())
            .and_then(|list| list.downcast_ref::<ValidatorList<C>>())
            .cloned()
            .unwrap_or_default()
    }

    /// Run every validator for `C` and collect all violations.
    pub fn validate<C: 'static>(&self, command: &C) -> Vec<Violation> {
        self.resolve::<C>()
            .iter()
            .flat_map(|validator| validator.validate(command))
            .collect()
    }
}
