//! Query-side building blocks.
//!
//! # Data Flow
//! ```text
//! query string + path params
//!     → Query type (bound by the fetch handler)
//!     → query_string.rs (rendered into a storage endpoint)
//!     → storage client → Maybe<T> / Maybe<PagedResult<T>>
//!     → filter.rs (resolved per result/query pair)
//! ```

pub mod filter;
pub mod query_string;
pub mod types;

pub use filter::{Filter, FilterRegistry, FilterResolver, IdentityFilter};
pub use query_string::{query_pairs, with_query};
pub use types::{Maybe, PagedQuery, PagedResult, Paging, Query, DEFAULT_PAGE_SIZE};
