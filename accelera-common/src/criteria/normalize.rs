//! Criterion normalization
//!
//! Fills every field of a raw record with a safe value. Total: never fails,
//! whatever the input looks like.

use super::model::Criterion;
use super::program::{CriterionId, ProgramId};
use super::raw::RawCriterion;
use serde_json::Value;

pub const DEFAULT_NAME: &str = "Untitled Criterion";
pub const DEFAULT_DESCRIPTION: &str = "No description provided";
pub const DEFAULT_WEIGHT: f64 = 10.0;
pub const DEFAULT_IMPORTANCE: u8 = 3;
/// Indigo display token
pub const DEFAULT_COLOR: &str = "#6366f1";

const MIN_IMPORTANCE: f64 = 1.0;
const MAX_IMPORTANCE: f64 = 5.0;

/// Convert a raw record into a canonical `Criterion`
///
/// | Field         | Kept when                                   | Otherwise                 |
/// |---------------|---------------------------------------------|---------------------------|
/// | `id`          | number or non-blank string                  | random `criterion-<uuid>` |
/// | `name`        | non-empty string                            | `"Untitled Criterion"`    |
/// | `description` | non-empty string                            | `"No description provided"` |
/// | `weight`      | finite number                               | `10`                      |
/// | `importance`  | integral number in 1..=5                    | `3`                       |
/// | `color`       | non-empty string                            | `#6366f1`                 |
/// | `programId`   | number or string (passed through)           | unscoped                  |
///
/// Deterministic except for the id fallback.
///
/// # Examples
///
/// ```
/// use accelera_common::criteria::{normalize, RawCriterion};
/// use serde_json::json;
///
/// let raw: RawCriterion = serde_json::from_value(json!({"id": "x"})).unwrap();
/// let criterion = normalize(&raw);
/// assert_eq!(criterion.name, "Untitled Criterion");
/// assert_eq!(criterion.weight, 10.0);
/// assert_eq!(criterion.importance, 3);
/// ```
pub fn normalize(raw: &RawCriterion) -> Criterion {
    Criterion {
        id: raw.criterion_id().unwrap_or_else(CriterionId::synthesize),
        name: text_or(raw.name.as_ref(), DEFAULT_NAME),
        description: text_or(raw.description.as_ref(), DEFAULT_DESCRIPTION),
        weight: weight(raw.weight.as_ref()),
        importance: importance(raw.importance.as_ref()),
        color: text_or(raw.color.as_ref(), DEFAULT_COLOR),
        program_id: raw.program_id.as_ref().and_then(ProgramId::from_value),
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn weight(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|w| w.is_finite())
        .unwrap_or(DEFAULT_WEIGHT)
}

fn importance(value: Option<&Value>) -> u8 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .filter(|v| (MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(v))
        .map(|v| v as u8)
        .unwrap_or(DEFAULT_IMPORTANCE)
}
