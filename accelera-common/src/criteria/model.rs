//! Canonical criterion record

use super::program::{CriterionId, ProgramId};
use serde::{Deserialize, Serialize};

/// Evaluation dimension attached to a program, fully populated
///
/// Only `normalize` builds these from feed data, so every field is present
/// and within bounds: `weight` is finite, `importance` is in 1..=5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    pub description: String,
    /// Percentage weight (expected 0-100)
    pub weight: f64,
    /// Star rating 1-5
    pub importance: u8,
    pub color: String,
    /// Owning program; `None` means unscoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
}

impl Criterion {
    /// Whether this criterion belongs to `program`
    ///
    /// Unscoped criteria belong to no program.
    pub fn belongs_to(&self, program: &ProgramId) -> bool {
        self.program_id
            .as_ref()
            .is_some_and(|owner| owner.matches(program))
    }
}
