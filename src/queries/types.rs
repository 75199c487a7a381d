//! Query-side value types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Page size used when a query asks for zero results per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A value of type `T`, or legitimately nothing.
///
/// Absence is not a failure: lookups that can fail carry `Maybe<T>` inside a
/// `Result`, so "not found" and "could not ask" never share a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Maybe<T>(Option<T>);

impl<T> Maybe<T> {
    /// Wrap a present value.
    pub fn some(value: T) -> Self {
        Self(Some(value))
    }

    /// The empty value.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn has_value(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the value if present.
    pub fn value(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn into_option(self) -> Option<T> {
        self.0
    }

    /// Transform the value, keeping absence as absence.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Maybe<U> {
        Maybe(self.0.map(f))
    }
}

impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T> From<Maybe<T>> for Option<T> {
    fn from(value: Maybe<T>) -> Self {
        value.0
    }
}

/// Paging parameters carried by paged queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub results: u32,
}

impl Paging {
    pub fn new(page: u32, results: u32) -> Self {
        Self { page, results }
    }

    /// Clamp page to at least 1 and replace a zero page size with the default.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            results: if self.results == 0 { DEFAULT_PAGE_SIZE } else { self.results },
        }
    }

    /// Number of items preceding this page.
    pub fn offset(&self) -> usize {
        let normalized = self.normalized();
        (normalized.page as usize - 1) * normalized.results as usize
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self { page: 1, results: DEFAULT_PAGE_SIZE }
    }
}

/// One page of a collection plus metadata about the whole collection.
///
/// Storage services answer collection requests with `{items, totalCount}`;
/// the remaining metadata is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// Count of the whole collection, ignoring paging.
    #[serde(default)]
    pub total_count: u64,
}

impl<T> PagedResult<T> {
    /// Build a page out of a complete in-memory collection.
    pub fn paginate(all: Vec<T>, paging: Paging) -> Self {
        let paging = paging.normalized();
        let total_count = all.len() as u64;
        let total_pages = total_count.div_ceil(u64::from(paging.results)) as u32;
        let items = all
            .into_iter()
            .skip(paging.offset())
            .take(paging.results as usize)
            .collect();

        Self {
            items,
            current_page: paging.page,
            results_per_page: paging.results,
            total_pages,
            total_count,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            results_per_page: DEFAULT_PAGE_SIZE,
            total_pages: 0,
            total_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fill paging metadata the storage service left out.
    pub fn with_paging_defaults(mut self, paging: Paging) -> Self {
        let paging = paging.normalized();
        if self.current_page == 0 {
            self.current_page = paging.page;
        }
        if self.results_per_page == 0 {
            self.results_per_page = paging.results;
        }
        if self.total_pages == 0 && self.total_count > 0 {
            self.total_pages = self.total_count.div_ceil(u64::from(self.results_per_page)) as u32;
        }
        self
    }
}

/// A request to read state, bound from path and query-string parameters.
///
/// Query types must have a `Default`: a request with no parameters binds to
/// it. Authenticated queries set `REQUIRES_AUTH` and receive the caller's id
/// through `set_user_id`.
pub trait Query: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    const REQUIRES_AUTH: bool = false;

    fn set_user_id(&mut self, _user_id: String) {}
}

/// A query over a collection that supports paging.
pub trait PagedQuery: Query {
    fn paging(&self) -> Paging;
}
