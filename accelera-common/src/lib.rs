//! # Accelera Common Library
//!
//! Shared code for the Accelera criteria services including:
//! - Criterion data model and normalization
//! - The reconciling criteria store and program scoping
//! - Change notification (CriterionCreated fan-out)
//! - Configuration loading
//! - Error types

pub mod config;
pub mod criteria;
pub mod error;
pub mod events;

pub use criteria::{
    normalize, select_for_program, CriteriaStore, Criterion, CriterionId, FeedSource,
    IngestReport, ProgramId, RawCriterion,
};
pub use error::{Error, Result};
pub use events::{ChangeNotifier, CriterionCreated, Subscription};
