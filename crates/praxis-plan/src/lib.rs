//! Deterministic symbolic action planning: facts, states, domains, and search.

#![forbid(unsafe_code)]

pub mod domain;
pub mod search;
pub mod state;

pub use domain::{ActionDef, Domain, Effect, InvalidActionDefinition};
pub use search::{
    ActionGate, Constraints, SearchEngine, SearchFailure, SearchResult, SelectionPolicy,
};
pub use state::{Fact, Goal, State};
