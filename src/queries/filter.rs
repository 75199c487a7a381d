//! Post-fetch filters and their resolver.
//!
//! # Responsibilities
//! - Hold the filters registered at startup, keyed by (result, query) type pair
//! - Resolve the filter for a pair, falling back to the identity filter
//!
//! # Design Decisions
//! - Registry is built once and shared read-only behind an `Arc`
//! - Lookup is a `TypeId` pair, no runtime type inspection of values

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Transformation applied to fetched items before they are returned.
pub trait Filter<R, Q>: Send + Sync {
    fn apply(&self, values: Vec<R>, query: &Q) -> Vec<R>;
}

/// Filter used when nothing is registered for a pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter;

impl<R, Q> Filter<R, Q> for IdentityFilter {
    fn apply(&self, values: Vec<R>, _query: &Q) -> Vec<R> {
        values
    }
}

impl<R, Q, F> Filter<R, Q> for F
where
    F: Fn(Vec<R>, &Q) -> Vec<R> + Send + Sync,
{
    fn apply(&self, values: Vec<R>, query: &Q) -> Vec<R> {
        self(values, query)
    }
}

type FilterKey = (TypeId, TypeId);

/// Startup-time collection of filters.
#[derive(Default)]
pub struct FilterRegistry {
    filters: HashMap<FilterKey, Box<dyn Any + Send + Sync>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `filter` for results of type `R` fetched with query `Q`.
    /// A later registration for the same pair replaces the earlier one.
    pub fn register<R, Q, F>(&mut self, filter: F) -> &mut Self
    where
        R: 'static,
        Q: 'static,
        F: Filter<R, Q> + 'static,
    {
        let filter: Arc<dyn Filter<R, Q>> = Arc::new(filter);
        self.filters
            .insert((TypeId::of::<R>(), TypeId::of::<Q>()), Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Shared, read-only view over a [`FilterRegistry`].
#[derive(Clone, Default)]
pub struct FilterResolver {
    registry: Arc<FilterRegistry>,
}

impl FilterResolver {
    pub fn new(registry: FilterRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Resolve the filter for `(R, Q)`; identity when none was registered.
    pub fn resolve<R: 'static, Q: 'static>(&self) -> Arc<dyn Filter<R, Q>> {
        self.registry
            .filters
            .get(&(TypeId::of::<R>(), TypeId::of::<Q>()))
            .and_then(|filter| filter.downcast_ref::<Arc<dyn Filter<R, Q>>>())
            .cloned()
            .unwrap_or_else(|| Arc::new(IdentityFilter))
    }
}
