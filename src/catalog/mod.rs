//! In-memory catalog of candidate objects and its lifecycle.

pub mod generator;
pub mod query;
mod source;
pub mod store;
mod types;

pub use generator::{MissionProfile, RecordGenerator};
pub use query::{DEFAULT_LIST_LIMIT, ListQuery, MAX_LIST_LIMIT};
pub use source::RecordSource;
pub use store::{
    AnnotationSummary, CatalogSnapshot, CatalogState, CatalogStore, RefreshError, RefreshOutcome,
    StoreOptions,
};
pub use types::{Annotation, CatalogRecord, Mission, Status};
