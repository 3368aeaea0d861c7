//! Generic resource engine: typed CRUD, version history and search over any
//! [`carebridge_storage::ResourceStore`].
//!
//! One [`ResourceProvider`] serves one resource kind. Search follows the
//! filter → sort → paginate pipeline with navigation links rebuilt from the
//! original query.

pub mod links;
pub mod provider;
pub mod search;

// Element-shape checks apply to every kind a provider can serve.
pub use carebridge_core::element::{
    is_valid_coded_concept, is_valid_identifier, is_valid_reference, reference_target,
};
pub use links::add_navigation_links;
pub use provider::ResourceProvider;
pub use search::{DatePrefix, SearchParams, SortKey, matches, sort_resources};
