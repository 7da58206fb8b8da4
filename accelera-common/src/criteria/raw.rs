//! Raw criterion records as they arrive from feeds
//!
//! Each origin (local cache, remote API, in-memory list, creation event)
//! produces loosely-typed JSON. `RawCriterion` accepts any value in any
//! field; `normalize` turns it into a canonical `Criterion`.

use super::model::Criterion;
use super::program::CriterionId;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Origin of a batch of raw criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Persisted local key-value cache
    Cache,
    /// Remote API fetch
    Remote,
    /// Explicitly injected in-memory list
    Memory,
    /// Creation event from the criterion builder
    Event,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Remote => "remote",
            Self::Memory => "memory",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Criterion-like record with no guarantees about field types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCriterion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    #[serde(default, alias = "program_id", skip_serializing_if = "Option::is_none")]
    pub program_id: Option<Value>,
}

impl RawCriterion {
    /// Canonical id, if the record carries a usable one
    pub fn criterion_id(&self) -> Option<CriterionId> {
        self.id.as_ref().and_then(CriterionId::from_value)
    }

    pub fn has_id(&self) -> bool {
        self.criterion_id().is_some()
    }

    /// Whether the record names an owning program
    pub fn has_program(&self) -> bool {
        self.program_id
            .as_ref()
            .and_then(super::ProgramId::from_value)
            .is_some()
    }
}

impl From<&Criterion> for RawCriterion {
    fn from(criterion: &Criterion) -> Self {
        Self {
            id: Some(Value::String(criterion.id.to_string())),
            name: Some(Value::String(criterion.name.clone())),
            description: Some(Value::String(criterion.description.clone())),
            weight: serde_json::Number::from_f64(criterion.weight).map(Value::Number),
            importance: Some(Value::from(criterion.importance)),
            color: Some(Value::String(criterion.color.clone())),
            program_id: criterion
                .program_id
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
        }
    }
}

/// Extract raw criteria from a feed payload
///
/// Accepts a bare array or an object wrapping one under `criteria`.
/// Elements that are not JSON objects are skipped. Any other payload
/// shape yields no records.
pub fn raw_list_from_value(payload: Value) -> Vec<RawCriterion> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("criteria") {
            Some(Value::Array(items)) => items,
            _ => {
                debug!("Criteria payload object has no criteria array");
                return Vec::new();
            }
        },
        Value::Null => return Vec::new(),
        other => {
            debug!("Ignoring criteria payload of unexpected shape: {}", other);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                debug!("Skipping non-object criteria entry: {}", item);
                return None;
            }
            serde_json::from_value::<RawCriterion>(item)
                .map_err(|e| debug!("Skipping unreadable criteria entry: {}", e))
                .ok()
        })
        .collect()
}

/// Parse a JSON document into raw criteria (see `raw_list_from_value`)
///
/// Fails only if the text is not JSON at all.
pub fn parse_raw_list(json: &str) -> Result<Vec<RawCriterion>> {
    let payload: Value = serde_json::from_str(json)?;
    Ok(raw_list_from_value(payload))
}
