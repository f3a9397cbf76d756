//! Facts, world states, and goals.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{ActionDef, Effect};

/// An atomic proposition token, e.g. `"hand_empty"`.
///
/// Facts are opaque to the planner: equality is structural and no internal
/// structure is interpreted. The token is interned behind an `Arc` so states
/// can share it cheaply.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fact(Arc<str>);

impl Fact {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fact {
    fn from(token: &str) -> Self {
        Fact(Arc::from(token))
    }
}

impl From<String> for Fact {
    fn from(token: String) -> Self {
        Fact(Arc::from(token.as_str()))
    }
}

impl Borrow<str> for Fact {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({})", self.0)
    }
}

impl Serialize for Fact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Fact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Fact::from)
    }
}

/// An immutable set of facts describing the world at a point in time.
///
/// The backing `BTreeSet` keeps facts in a canonical (lexical) order, so two
/// states holding the same facts hash and compare equal regardless of how
/// they were built. Derivations always produce a new value; earlier states
/// stay valid for visited-state tracking.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    facts: BTreeSet<Fact>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    pub fn has(&self, token: &str) -> bool {
        self.facts.contains(token)
    }

    /// True iff every fact of `other` is present in `self`.
    pub fn includes(&self, other: &State) -> bool {
        other.facts.is_subset(&self.facts)
    }

    /// True iff `goal.conditions` is a subset of this state.
    pub fn satisfies(&self, goal: &Goal) -> bool {
        self.includes(&goal.conditions)
    }

    /// Apply an action's effects, producing a new state.
    ///
    /// Effects are applied in list order; a later effect on the same fact
    /// wins. The receiver is never mutated.
    pub fn apply(&self, action: &ActionDef) -> State {
        let mut facts = self.facts.clone();
        for effect in &action.effects {
            match effect {
                Effect::Add(fact) => {
                    facts.insert(fact.clone());
                }
                Effect::Remove(fact) => {
                    facts.remove(fact);
                }
            }
        }
        State { facts }
    }

    /// A copy of this state with `fact` present.
    pub fn inserted(&self, fact: Fact) -> State {
        let mut facts = self.facts.clone();
        facts.insert(fact);
        State { facts }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl<F: Into<Fact>> FromIterator<F> for State {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        State {
            facts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.facts.iter()).finish()
    }
}

/// A set of facts that must hold in the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    pub conditions: State,
    /// Informational only: callers may order goals by priority, the
    /// single-goal search ignores it.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    1
}

impl Goal {
    pub fn new(description: impl Into<String>, conditions: State) -> Self {
        Self {
            description: description.into(),
            conditions,
            priority: default_priority(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
