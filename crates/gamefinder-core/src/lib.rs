pub mod codec;
pub mod cursor;
pub mod errors;
pub mod filter;
pub mod model;
pub mod page;
pub mod pager;
pub mod query;

pub use errors::*;
pub use filter::*;
pub use model::*;
pub use page::*;
pub use pager::{ClientPager, Completion, LoadKind, PageRequest, PagerState};
pub use query::{compile, sort_spec, Clause, Order, SortField, SortSpec, SortTarget, StructuredQuery};
