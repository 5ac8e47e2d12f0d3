//! # attrlist-sources - Pluggable Data Sources
//!
//! Holds the loader contract every attribute list source implements, the
//! registry the engine dispatches through, and the transport seam for
//! backend-backed sources.
//!
//! Depends on [`attrlist_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Loader Contract (`loader`)
//! - [`DataLoader`] - Required operations (features, export, unique values)
//! - [`RowExpansion`] - Optional expandable-row capability
//!
//! ### Registry (`registry`)
//! - [`SourceRegistry`] - Source id to loader mapping with loader-absent defaults
//! - [`Source`] - A loader plus the tab descriptors it contributes
//!
//! ### Transport (`api`, `fixture`)
//! - [`AttributeListApi`] - Injected backend operations
//! - [`ApiDataLoader`] - Adapts an [`AttributeListApi`] into a [`DataLoader`]
//! - [`FixtureApi`] - Serves a JSON fixture document

pub mod api;
pub mod fixture;
pub mod loader;
pub mod registry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use api::{ApiDataLoader, AttributeListApi, LocalAttributeListApi};
pub use fixture::{Fixture, FixtureApi, FixtureLayer};
pub use loader::{DataLoader, LoaderFuture, RowExpansion};
pub use registry::{Source, SourceRegistry, DEFAULT_SOURCE_ID};
