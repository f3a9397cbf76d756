//! Action definitions and the registration-ordered action domain.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::{Fact, State};

/// A signed fact: positive effects add, negative effects remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Add(Fact),
    Remove(Fact),
}

impl Effect {
    pub fn fact(&self) -> &Fact {
        match self {
            Effect::Add(fact) | Effect::Remove(fact) => fact,
        }
    }
}

/// A parameterized operation transforming one state into another, at a cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,

    /// Opaque caller-supplied payload; the planner never interprets it.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    #[serde(default)]
    pub preconditions: State,

    /// Applied in order; a later effect on the same fact wins.
    #[serde(default)]
    pub effects: Vec<Effect>,

    #[serde(default = "default_cost")]
    pub cost: f64,
}

fn default_cost() -> f64 {
    1.0
}

impl ActionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
            preconditions: State::new(),
            effects: Vec::new(),
            cost: default_cost(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn requires(mut self, fact: impl Into<Fact>) -> Self {
        self.preconditions = self.preconditions.inserted(fact.into());
        self
    }

    pub fn adds(mut self, fact: impl Into<Fact>) -> Self {
        self.effects.push(Effect::Add(fact.into()));
        self
    }

    pub fn removes(mut self, fact: impl Into<Fact>) -> Self {
        self.effects.push(Effect::Remove(fact.into()));
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn is_applicable(&self, state: &State) -> bool {
        state.includes(&self.preconditions)
    }

    fn validate(&self) -> Result<(), InvalidActionDefinition> {
        if self.cost < 0.0 || !self.cost.is_finite() {
            return Err(InvalidActionDefinition::InvalidCost {
                action: self.name.clone(),
                cost: self.cost,
            });
        }

        let mut added: BTreeSet<&Fact> = BTreeSet::new();
        let mut removed: BTreeSet<&Fact> = BTreeSet::new();
        for effect in &self.effects {
            match effect {
                Effect::Add(fact) => {
                    added.insert(fact);
                }
                Effect::Remove(fact) => {
                    removed.insert(fact);
                }
            }
        }
        if let Some(fact) = added.intersection(&removed).next() {
            return Err(InvalidActionDefinition::ConflictingEffects {
                action: self.name.clone(),
                fact: (*fact).clone(),
            });
        }

        Ok(())
    }
}

/// Rejected at registration; the registry is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidActionDefinition {
    #[error("action '{action}' both adds and removes fact '{fact}'")]
    ConflictingEffects { action: String, fact: Fact },

    #[error("action '{action}' has invalid cost {cost}")]
    InvalidCost { action: String, cost: f64 },
}

/// The authoritative registry of actions available to every search.
///
/// Registration order is a correctness contract: `applicable_actions` yields
/// actions in the order their identifiers were first registered, and the
/// search's default selection policy is defined in terms of that order.
/// Re-registering an identifier overwrites the definition in place without
/// moving it.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    actions: Vec<(String, ActionDef)>,
    index: HashMap<String, usize>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        action: ActionDef,
    ) -> Result<(), InvalidActionDefinition> {
        action.validate()?;

        let id = id.into();
        match self.index.get(&id).copied() {
            Some(position) => {
                tracing::info!(action = %id, position, "action redefined");
                self.actions[position].1 = action;
            }
            None => {
                tracing::debug!(action = %id, "action registered");
                self.index.insert(id.clone(), self.actions.len());
                self.actions.push((id, action));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ActionDef> {
        self.index.get(id).map(|&position| &self.actions[position].1)
    }

    /// Every registered action whose preconditions hold in `state`, in
    /// registration order, paired with its registration index.
    pub fn applicable_actions<'a>(
        &'a self,
        state: &'a State,
    ) -> impl Iterator<Item = (usize, &'a ActionDef)> + 'a {
        self.actions
            .iter()
            .enumerate()
            .filter(move |(_, (_, action))| action.is_applicable(state))
            .map(|(position, (_, action))| (position, action))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionDef)> {
        self.actions.iter().map(|(id, action)| (id.as_str(), action))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn action_at(&self, position: usize) -> &ActionDef {
        &self.actions[position].1
    }
}
