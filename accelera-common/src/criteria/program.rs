//! Program and criterion identifiers
//!
//! Program ids reach the service as JSON numbers from some callers and as
//! strings from others (`42` vs `"42"`). `ProgramId` keeps whatever
//! representation arrived and compares under both string and numeric
//! coercion.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Identifier of the program that owns a criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramId {
    /// Arrived as a JSON number
    Number(Number),
    /// Arrived as text
    Text(String),
}

impl ProgramId {
    /// Interpret a raw JSON value as a program id
    ///
    /// Numbers and strings are accepted. `null`, booleans, arrays and
    /// objects mean "no program".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Canonical string form (`42` and `"42"` both yield `"42"`)
    pub fn canonical(&self) -> String {
        match self {
            Self::Number(n) => canonical_number(n),
            Self::Text(s) => s.clone(),
        }
    }

    /// Numeric form, if the id is a finite number or text that parses as one
    ///
    /// Blank text is not numeric.
    pub fn as_number(&self) -> Option<f64> {
        let parsed = match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        };
        parsed.filter(|v| v.is_finite())
    }

    /// Whether two ids name the same program
    ///
    /// True when the canonical strings are equal, or when both sides are
    /// numeric and numerically equal (`"42.0"` matches `42`).
    pub fn matches(&self, other: &ProgramId) -> bool {
        if self.canonical() == other.canonical() {
            return true;
        }
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Shortest decimal form of a JSON number
///
/// Integers print as-is. Floats print without a trailing `.0` when whole
/// (`1.0` becomes `"1"`, `7.5` stays `"7.5"`), and `-0.0` prints as `"0"`.
fn canonical_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        // f64's Display is the shortest round-trip form and omits `.0`
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<i64> for ProgramId {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for ProgramId {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i32> for ProgramId {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for ProgramId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ProgramId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Canonical criterion identifier
///
/// Numeric ids are stored in their JSON string form, so `1` and `"1"`
/// address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionId(String);

impl CriterionId {
    /// Interpret a raw JSON value as a criterion id
    ///
    /// Accepts numbers and non-blank strings; anything else is "no id".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(canonical_number(n))),
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    /// Random fallback id for display-only records
    ///
    /// Not stable across calls. Records that need identity must carry
    /// their own id; the store never reaches this path.
    pub fn synthesize() -> Self {
        Self(format!("criterion-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CriterionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CriterionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CriterionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
