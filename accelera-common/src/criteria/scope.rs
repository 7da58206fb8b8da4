//! Program scoping

use super::model::Criterion;
use super::program::ProgramId;

/// Select the criteria that belong to `target`
///
/// - `None` (no program selected) returns `all` unchanged.
/// - Otherwise keeps criteria whose `program_id` matches `target` under
///   string or numeric comparison (see `ProgramId::matches`). Unscoped
///   criteria are excluded.
///
/// Input order is preserved.
///
/// # Examples
///
/// ```
/// use accelera_common::criteria::{normalize, select_for_program, ProgramId, RawCriterion};
/// use serde_json::json;
///
/// let all: Vec<_> = [json!({"id": 1, "programId": "42"}), json!({"id": 2, "programId": 43})]
///     .into_iter()
///     .map(|v| normalize(&serde_json::from_value::<RawCriterion>(v).unwrap()))
///     .collect();
///
/// let scoped = select_for_program(&all, Some(&ProgramId::from(42)));
/// assert_eq!(scoped.len(), 1);
/// assert_eq!(scoped[0].id.as_str(), "1");
/// ```
pub fn select_for_program(all: &[Criterion], target: Option<&ProgramId>) -> Vec<Criterion> {
    match target {
        None => all.to_vec(),
        Some(program) => all
            .iter()
            .filter(|c| c.belongs_to(program))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{normalize, RawCriterion};
    use serde_json::{json, Value};

    fn criteria(values: Vec<Value>) -> Vec<Criterion> {
        values
            .into_iter()
            .map(|v| normalize(&serde_json::from_value::<RawCriterion>(v).unwrap()))
            .collect()
    }

    fn ids(criteria: &[Criterion]) -> Vec<&str> {
        criteria.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_cross_type_program_match() {
        let all = criteria(vec![
            json!({"id": 1, "programId": "42"}),
            json!({"id": 2, "programId": 42}),
            json!({"id": 3, "programId": "43"}),
        ]);

        let scoped = select_for_program(&all, Some(&ProgramId::from(42)));
        assert_eq!(ids(&scoped), vec!["1", "2"]);

        let scoped = select_for_program(&all, Some(&ProgramId::from("42")));
        assert_eq!(ids(&scoped), vec!["1", "2"]);
    }

    #[test]
    fn test_no_target_returns_everything() {
        let all = criteria(vec![
            json!({"id": "b", "programId": 1}),
            json!({"id": "a"}),
            json!({"id": "c", "programId": "2"}),
        ]);

        let scoped = select_for_program(&all, None);
        assert_eq!(scoped, all);
    }

    #[test]
    fn test_unscoped_criteria_excluded_for_concrete_target() {
        let all = criteria(vec![json!({"id": "global"}), json!({"id": "p7", "programId": 7})]);
        let scoped = select_for_program(&all, Some(&ProgramId::from("7")));
        assert_eq!(ids(&scoped), vec!["p7"]);
    }

    #[test]
    fn test_order_preserved() {
        let all = criteria(vec![
            json!({"id": "z", "programId": 5}),
            json!({"id": "x", "programId": 6}),
            json!({"id": "a", "programId": "5"}),
            json!({"id": "m", "programId": 5.0}),
        ]);
        let scoped = select_for_program(&all, Some(&ProgramId::from(5)));
        assert_eq!(ids(&scoped), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_no_match_yields_empty() {
        let all = criteria(vec![json!({"id": 1, "programId": "alpha"})]);
        assert!(select_for_program(&all, Some(&ProgramId::from(1))).is_empty());
        assert!(select_for_program(&[], Some(&ProgramId::from(1))).is_empty());
    }
}
