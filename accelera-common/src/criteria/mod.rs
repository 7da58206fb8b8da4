//! Evaluation criteria: data model, normalization, store and scoping
//!
//! Data flow: feeds -> `CriteriaStore::ingest_*` -> `normalize` -> unified
//! collection -> `select_for_program` -> consumers.

mod model;
mod normalize;
mod program;
mod raw;
mod scope;
mod store;

pub use model::Criterion;
pub use normalize::{
    normalize, DEFAULT_COLOR, DEFAULT_DESCRIPTION, DEFAULT_IMPORTANCE, DEFAULT_NAME,
    DEFAULT_WEIGHT,
};
pub use program::{CriterionId, ProgramId};
pub use raw::{parse_raw_list, raw_list_from_value, FeedSource, RawCriterion};
pub use scope::select_for_program;
pub use store::{CriteriaStore, IngestReport};
