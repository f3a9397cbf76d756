//! Facade tying the action domain, search engine, and plan store together.

use std::sync::{PoisonError, RwLock};

use praxis_plan::{
    ActionDef, ActionGate, Constraints, Domain, Goal, InvalidActionDefinition, SearchEngine,
    SearchFailure, State,
};

use crate::store::{Plan, PlanId, PlanStatus, PlanStore, StepOutcome, StoreError};

/// Entry point for callers: register actions, create and track plans.
///
/// Registration takes the domain's write lock; every search runs against a
/// read-locked snapshot, so a registration is never partially visible
/// mid-search and concurrent searches do not block each other.
pub struct PlanService {
    domain: RwLock<Domain>,
    store: PlanStore,
    gate: Option<Box<dyn ActionGate + Send + Sync>>,
    defaults: Constraints,
}

impl PlanService {
    pub fn new() -> Self {
        Self {
            domain: RwLock::new(Domain::new()),
            store: PlanStore::new(),
            gate: None,
            defaults: Constraints::default(),
        }
    }

    /// Constraints used by [`PlanService::create_plan_with_defaults`].
    pub fn with_defaults(mut self, defaults: Constraints) -> Self {
        self.defaults = defaults;
        self
    }

    /// Install a governance gate consulted for every candidate action.
    pub fn with_gate(mut self, gate: impl ActionGate + Send + Sync + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    pub fn register_action(
        &self,
        id: impl Into<String>,
        action: ActionDef,
    ) -> Result<(), InvalidActionDefinition> {
        self.domain
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(id, action)
    }

    pub fn create_plan(
        &self,
        goal: Goal,
        initial_state: State,
        constraints: &Constraints,
    ) -> Result<PlanId, SearchFailure> {
        let domain = self.domain.read().unwrap_or_else(PoisonError::into_inner);
        let mut engine = SearchEngine::new(&domain);
        if let Some(gate) = self.gate.as_deref() {
            engine = engine.with_gate(gate);
        }

        match engine.search(&goal, &initial_state, constraints) {
            Ok(result) => {
                drop(domain);
                Ok(self.store.insert(goal, initial_state, result))
            }
            Err(failure) => {
                tracing::warn!(goal = %goal.description, %failure, "failed to create plan");
                Err(failure)
            }
        }
    }

    pub fn create_plan_with_defaults(
        &self,
        goal: Goal,
        initial_state: State,
    ) -> Result<PlanId, SearchFailure> {
        let constraints = self.defaults.clone();
        self.create_plan(goal, initial_state, &constraints)
    }

    pub fn execute_plan(&self, id: &PlanId) -> Result<(), StoreError> {
        self.store.execute(id)
    }

    pub fn get_plan(&self, id: &PlanId) -> Option<Plan> {
        self.store.get(id)
    }

    pub fn get_plan_status(&self, id: &PlanId) -> Option<PlanStatus> {
        self.store.status_of(id)
    }

    pub fn report_step(&self, id: &PlanId, outcome: StepOutcome) -> Result<PlanStatus, StoreError> {
        self.store.report_step(id, outcome)
    }

    pub fn plan_count(&self) -> usize {
        self.store.len()
    }
}

impl Default for PlanService {
    fn default() -> Self {
        Self::new()
    }
}
