//! Plan records and their lifecycle bookkeeping.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use praxis_plan::{ActionDef, Goal, SearchResult, State};

/// Unique plan identifier, `plan-` followed by 12 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    fn fresh() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        PlanId(format!("plan-{}", &hex[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `Pending -> InProgress -> {Completed, Failed}`; terminal states have no
/// outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Failed)
    }
}

/// A created plan: goal, initial state, and steps are snapshots frozen at
/// creation; only `status` and `current_step` change afterwards, and always
/// together under the record's lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub goal: Goal,
    pub initial_state: State,
    pub steps: Vec<ActionDef>,
    pub total_cost: f64,
    pub status: PlanStatus,
    pub current_step: usize,
}

/// Step-level outcome reported by the execution environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("plan '{0}' not found")]
    PlanNotFound(PlanId),

    #[error("plan '{id}' cannot transition from {from:?}")]
    InvalidTransition { id: PlanId, from: PlanStatus },
}

/// Process-lifetime bookkeeping of created plans.
///
/// Each record sits behind its own lock so `status`/`current_step` updates
/// are atomic with respect to readers: `get` clones the record under that
/// lock and can never observe a half-applied transition.
#[derive(Debug, Default)]
pub struct PlanStore {
    plans: RwLock<HashMap<PlanId, Arc<Mutex<Plan>>>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful search as a fresh `Pending` plan.
    pub fn insert(&self, goal: Goal, initial_state: State, result: SearchResult) -> PlanId {
        let id = PlanId::fresh();
        let plan = Plan {
            id: id.clone(),
            goal,
            initial_state,
            steps: result.steps,
            total_cost: result.total_cost,
            status: PlanStatus::Pending,
            current_step: 0,
        };
        tracing::info!(
            plan = %id,
            steps = plan.steps.len(),
            cost = plan.total_cost,
            "plan created"
        );

        let mut plans = self
            .plans
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        plans.insert(id.clone(), Arc::new(Mutex::new(plan)));
        id
    }

    pub fn get(&self, id: &PlanId) -> Option<Plan> {
        let record = self.record(id).ok()?;
        let plan = record.lock().unwrap_or_else(PoisonError::into_inner);
        Some(plan.clone())
    }

    pub fn status_of(&self, id: &PlanId) -> Option<PlanStatus> {
        let record = self.record(id).ok()?;
        let plan = record.lock().unwrap_or_else(PoisonError::into_inner);
        Some(plan.status)
    }

    /// `Pending -> InProgress`. Any other starting status is rejected.
    pub fn execute(&self, id: &PlanId) -> Result<(), StoreError> {
        let record = self.record(id)?;
        let mut plan = record.lock().unwrap_or_else(PoisonError::into_inner);
        match plan.status {
            PlanStatus::Pending => {
                plan.status = PlanStatus::InProgress;
                tracing::info!(plan = %id, "plan execution started");
                Ok(())
            }
            from => Err(StoreError::InvalidTransition {
                id: id.clone(),
                from,
            }),
        }
    }

    /// Apply a step outcome reported by the execution environment.
    ///
    /// `Succeeded` advances the cursor; completing the final step moves the
    /// plan to `Completed`. `Failed` moves it to `Failed`. Both are only
    /// legal while the plan is `InProgress`. The status/cursor pair is
    /// updated under the record lock, so a concurrent reader sees either the
    /// old pair or the new one, never a mix.
    pub fn report_step(&self, id: &PlanId, outcome: StepOutcome) -> Result<PlanStatus, StoreError> {
        let record = self.record(id)?;
        let mut plan = record.lock().unwrap_or_else(PoisonError::into_inner);
        if plan.status != PlanStatus::InProgress {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: plan.status,
            });
        }

        match outcome {
            StepOutcome::Succeeded => {
                if plan.current_step < plan.steps.len() {
                    plan.current_step += 1;
                }
                if plan.current_step >= plan.steps.len() {
                    plan.status = PlanStatus::Completed;
                    tracing::info!(plan = %id, "plan completed");
                }
            }
            StepOutcome::Failed => {
                plan.status = PlanStatus::Failed;
                tracing::warn!(plan = %id, step = plan.current_step, "plan step failed");
            }
        }
        Ok(plan.status)
    }

    pub fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &PlanId) -> Result<Arc<Mutex<Plan>>, StoreError> {
        let plans = self.plans.read().unwrap_or_else(PoisonError::into_inner);
        plans
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::PlanNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_plan::ActionDef;

    fn stored_plan(store: &PlanStore, steps: Vec<ActionDef>) -> PlanId {
        let cost = steps.iter().map(|s| s.cost).sum();
        store.insert(
            Goal::new("goal", State::from_iter(["done"])),
            State::new(),
            SearchResult {
                steps,
                total_cost: cost,
            },
        )
    }

    #[test]
    fn fresh_plans_are_pending_at_step_zero() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a")]);

        let plan = store.get(&id).unwrap();
        assert!(plan.id.as_str().starts_with("plan-"));
        assert_eq!(plan.status, PlanStatus::Pending);
        assert_eq!(plan.current_step, 0);
        assert_eq!(store.status_of(&id), Some(PlanStatus::Pending));
    }

    #[test]
    fn execute_transitions_pending_to_in_progress_once() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a")]);

        store.execute(&id).unwrap();
        assert_eq!(store.status_of(&id), Some(PlanStatus::InProgress));

        let err = store.execute(&id).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidTransition {
                id: id.clone(),
                from: PlanStatus::InProgress,
            }
        );
        // A rejected transition leaves the record untouched.
        assert_eq!(store.status_of(&id), Some(PlanStatus::InProgress));
    }

    #[test]
    fn execute_unknown_plan_is_not_found() {
        let store = PlanStore::new();
        let missing = PlanId("plan-000000000000".to_string());
        assert_eq!(
            store.execute(&missing),
            Err(StoreError::PlanNotFound(missing.clone()))
        );
        assert!(store.get(&missing).is_none());
    }

    #[test]
    fn step_outcomes_drive_completion() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a"), ActionDef::new("b")]);
        store.execute(&id).unwrap();

        assert_eq!(
            store.report_step(&id, StepOutcome::Succeeded).unwrap(),
            PlanStatus::InProgress
        );
        let plan = store.get(&id).unwrap();
        assert_eq!(plan.current_step, 1);

        assert_eq!(
            store.report_step(&id, StepOutcome::Succeeded).unwrap(),
            PlanStatus::Completed
        );
        let plan = store.get(&id).unwrap();
        assert_eq!(plan.current_step, 2);
        assert!(plan.status.is_terminal());

        // Terminal plans accept no further reports.
        assert!(store.report_step(&id, StepOutcome::Succeeded).is_err());
    }

    #[test]
    fn a_failed_step_fails_the_plan() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a"), ActionDef::new("b")]);
        store.execute(&id).unwrap();
        store.report_step(&id, StepOutcome::Succeeded).unwrap();

        assert_eq!(
            store.report_step(&id, StepOutcome::Failed).unwrap(),
            PlanStatus::Failed
        );
        let plan = store.get(&id).unwrap();
        assert_eq!(plan.status, PlanStatus::Failed);
        assert_eq!(plan.current_step, 1);
    }

    #[test]
    fn reports_against_pending_plans_are_rejected() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a")]);
        assert!(store.report_step(&id, StepOutcome::Succeeded).is_err());
        assert_eq!(store.status_of(&id), Some(PlanStatus::Pending));
    }

    #[test]
    fn empty_plans_complete_on_first_report() {
        let store = PlanStore::new();
        let id = stored_plan(&store, Vec::new());
        store.execute(&id).unwrap();
        assert_eq!(
            store.report_step(&id, StepOutcome::Succeeded).unwrap(),
            PlanStatus::Completed
        );
    }

    #[test]
    fn snapshots_are_independent_of_the_store() {
        let store = PlanStore::new();
        let id = stored_plan(&store, vec![ActionDef::new("a")]);

        let mut snapshot = store.get(&id).unwrap();
        snapshot.status = PlanStatus::Failed;
        snapshot.current_step = 99;

        let fresh = store.get(&id).unwrap();
        assert_eq!(fresh.status, PlanStatus::Pending);
        assert_eq!(fresh.current_step, 0);
    }

    #[test]
    fn concurrent_creation_yields_distinct_ids() {
        let store = PlanStore::new();
        let ids = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..16)
                            .map(|_| stored_plan(&store, vec![ActionDef::new("a")]))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 8 * 16);
        assert_eq!(store.len(), 8 * 16);
    }
}
