//! Choosing which migrations to run.

use std::collections::{HashMap, HashSet};

use crate::migration::{Direction, Migration, compare_ids};

/// A migration selected for execution in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMigration {
    pub migration: Migration,
    pub direction: Direction,
    /// The statements to run, in order.
    pub queries: Vec<String>,
    /// Informational; see [`Migration::disable_transaction_up`].
    pub disable_transaction: bool,
}

impl PlannedMigration {
    fn new(migration: &Migration, direction: Direction) -> Self {
        Self {
            migration: migration.clone(),
            direction,
            queries: migration.statements(direction).to_vec(),
            disable_transaction: migration.disable_transaction(direction),
        }
    }

    pub fn id(&self) -> &str {
        &self.migration.id
    }
}

/// Builds the ordered plan for `direction`.
///
/// `applied` is the ledger in application order. Going up, every known
/// migration missing from the ledger is planned in id order. Going down,
/// ledger entries that still have a known migration are planned most
/// recently applied first. `max` truncates the plan.
pub fn plan_migrations(
    known: &[Migration],
    applied: &[String],
    direction: Direction,
    max: Option<usize>,
) -> Vec<PlannedMigration> {
    let mut plan: Vec<PlannedMigration> = match direction {
        Direction::Up => {
            let applied: HashSet<&str> = applied.iter().map(String::as_str).collect();
            let mut pending: Vec<&Migration> = known
                .iter()
                .filter(|m| !applied.contains(m.id.as_str()))
                .collect();
            pending.sort_by(|a, b| compare_ids(&a.id, &b.id));
            pending
                .into_iter()
                .map(|m| PlannedMigration::new(m, direction))
                .collect()
        }
        Direction::Down => {
            let by_id: HashMap<&str, &Migration> =
                known.iter().map(|m| (m.id.as_str(), m)).collect();
            applied
                .iter()
                .rev()
                .filter_map(|id| by_id.get(id.as_str()))
                .map(|m| PlannedMigration::new(m, direction))
                .collect()
        }
    };

    if let Some(max) = max {
        plan.truncate(max);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(ids: &[&str]) -> Vec<Migration> {
        ids.iter()
            .map(|id| Migration::new(*id).with_up([format!("UP {id}")]).with_down([format!("DOWN {id}")]))
            .collect()
    }

    fn applied(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn ids(plan: &[PlannedMigration]) -> Vec<&str> {
        plan.iter().map(PlannedMigration::id).collect()
    }

    #[test]
    fn test_up_plans_unapplied_in_order() {
        let plan = plan_migrations(
            &known(&["alpha", "10_x", "2_y", "1_a"]),
            &applied(&["1_a"]),
            Direction::Up,
            None,
        );
        assert_eq!(ids(&plan), ["2_y", "10_x", "alpha"]);
        assert_eq!(plan[0].queries, ["UP 2_y"]);
        assert_eq!(plan[0].direction, Direction::Up);
    }

    #[test]
    fn test_down_reverses_application_order() {
        let plan = plan_migrations(
            &known(&["1_a", "2_b", "3_c"]),
            &applied(&["1_a", "3_c", "2_b"]),
            Direction::Down,
            None,
        );
        assert_eq!(ids(&plan), ["2_b", "3_c", "1_a"]);
        assert_eq!(plan[0].queries, ["DOWN 2_b"]);
    }

    #[test]
    fn test_down_skips_unknown_ledger_entries() {
        let plan = plan_migrations(
            &known(&["1_a"]),
            &applied(&["1_a", "9_gone"]),
            Direction::Down,
            None,
        );
        assert_eq!(ids(&plan), ["1_a"]);
    }

    #[test]
    fn test_max_truncates() {
        let all = known(&["1", "2", "3"]);
        assert_eq!(ids(&plan_migrations(&all, &[], Direction::Up, Some(2))), ["1", "2"]);
        assert!(plan_migrations(&all, &[], Direction::Up, Some(0)).is_empty());
        assert_eq!(plan_migrations(&all, &[], Direction::Up, Some(10)).len(), 3);
    }

    #[test]
    fn test_notransaction_carried_into_plan() {
        let mut m = Migration::new("1").with_down(["X"]);
        m.disable_transaction_down = true;
        let plan = plan_migrations(&[m], &applied(&["1"]), Direction::Down, None);
        assert!(plan[0].disable_transaction);
    }
}
