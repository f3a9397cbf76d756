//! Frontier-based state-space search over an action domain.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ActionDef, Domain};
use crate::state::{Goal, State};

/// External allow/deny decision consulted before an action is considered.
///
/// Actions the gate refuses are filtered out of `applicable_actions` before
/// selection, under either policy.
pub trait ActionGate {
    fn permits(&self, action: &ActionDef) -> bool;
}

impl<T: ActionGate + ?Sized> ActionGate for std::sync::Arc<T> {
    fn permits(&self, action: &ActionDef) -> bool {
        (**self).permits(action)
    }
}

/// How the engine picks among applicable actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Greedy: commit to the first applicable action (in registration order)
    /// whose resulting state is unvisited. Single-path, no backtracking
    /// across committed steps; a dead end fails the search outright.
    #[default]
    FirstApplicable,

    /// Uniform-cost frontier: expand the cheapest unvisited node first and
    /// return the minimum-cost plan found within the bound.
    LowestCost,
}

/// Caller-supplied resource limits for a single search.
#[derive(Debug, Clone)]
pub struct Constraints {
    pub max_depth: usize,
    pub max_expansions: Option<usize>,
    pub policy: SelectionPolicy,
    pub deadline: Option<Instant>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_expansions: None,
            policy: SelectionPolicy::default(),
            deadline: None,
        }
    }
}

impl Constraints {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A plan that cannot be found is an expected outcome, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchFailure {
    /// The reachable space (within bounds) was explored without satisfying
    /// the goal.
    #[error("no plan found")]
    NoPlanFound,

    /// Depth or expansion budget reached first; more search might have
    /// succeeded.
    #[error("search budget exhausted")]
    Exhausted,

    /// The externally supplied deadline elapsed mid-search.
    #[error("search deadline elapsed")]
    Timeout,
}

/// A successful search: the action sequence and its accumulated cost.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub steps: Vec<ActionDef>,
    pub total_cost: f64,
}

/// Searches a read-only domain snapshot for a costed action sequence.
///
/// The engine is a pure, synchronous computation: repeated invocations with
/// the same domain, goal, state, and constraints produce identical results.
/// No choice depends on an unordered container's iteration order.
pub struct SearchEngine<'d> {
    domain: &'d Domain,
    gate: Option<&'d dyn ActionGate>,
}

impl<'d> SearchEngine<'d> {
    pub fn new(domain: &'d Domain) -> Self {
        Self { domain, gate: None }
    }

    pub fn with_gate(mut self, gate: &'d dyn ActionGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn search(
        &self,
        goal: &Goal,
        initial: &State,
        constraints: &Constraints,
    ) -> Result<SearchResult, SearchFailure> {
        // Must precede any expansion: an already-satisfied goal is an empty
        // plan with cost zero.
        if initial.satisfies(goal) {
            return Ok(SearchResult {
                steps: Vec::new(),
                total_cost: 0.0,
            });
        }

        tracing::debug!(
            goal = %goal.description,
            policy = ?constraints.policy,
            max_depth = constraints.max_depth,
            "search started"
        );

        let outcome = match constraints.policy {
            SelectionPolicy::FirstApplicable => self.first_applicable(goal, initial, constraints),
            SelectionPolicy::LowestCost => self.lowest_cost(goal, initial, constraints),
        };

        match &outcome {
            Ok(result) => tracing::debug!(
                goal = %goal.description,
                steps = result.steps.len(),
                cost = result.total_cost,
                "search succeeded"
            ),
            Err(failure) => tracing::debug!(goal = %goal.description, %failure, "search failed"),
        }

        outcome
    }

    fn permitted<'s>(
        &'s self,
        state: &'s State,
    ) -> impl Iterator<Item = (usize, &'s ActionDef)> + 's {
        self.domain
            .applicable_actions(state)
            .filter(move |(_, action)| self.gate.map_or(true, |gate| gate.permits(action)))
    }

    fn first_applicable(
        &self,
        goal: &Goal,
        initial: &State,
        constraints: &Constraints,
    ) -> Result<SearchResult, SearchFailure> {
        let mut visited: HashSet<State> = HashSet::new();
        visited.insert(initial.clone());

        let mut state = initial.clone();
        let mut steps: Vec<ActionDef> = Vec::new();
        let mut total_cost = 0.0;
        let mut expansions = 0usize;

        while steps.len() < constraints.max_depth {
            if deadline_elapsed(constraints) {
                return Err(SearchFailure::Timeout);
            }
            expansions += 1;
            if constraints.max_expansions.is_some_and(|max| expansions > max) {
                return Err(SearchFailure::Exhausted);
            }

            let chosen = self.permitted(&state).find_map(|(_, action)| {
                let next = state.apply(action);
                if visited.contains(&next) {
                    None
                } else {
                    Some((action, next))
                }
            });

            // Dead end: no applicable action leads anywhere new, and committed
            // steps are never retried.
            let Some((action, next)) = chosen else {
                return Err(SearchFailure::NoPlanFound);
            };

            total_cost += action.cost;
            steps.push(action.clone());
            visited.insert(next.clone());
            state = next;

            if state.satisfies(goal) {
                return Ok(SearchResult { steps, total_cost });
            }
        }

        Err(SearchFailure::Exhausted)
    }

    fn lowest_cost(
        &self,
        goal: &Goal,
        initial: &State,
        constraints: &Constraints,
    ) -> Result<SearchResult, SearchFailure> {
        struct OpenNode {
            g: f64,
            // Registration index of the most recently applied action.
            last_action: usize,
            depth: usize,
            tie: u64,
            state: State,
            path: Vec<usize>,
        }

        impl OpenNode {
            fn cmp_key(&self, other: &Self) -> Ordering {
                self.g
                    .total_cmp(&other.g)
                    .then_with(|| self.last_action.cmp(&other.last_action))
                    .then_with(|| self.depth.cmp(&other.depth))
                    .then_with(|| self.tie.cmp(&other.tie))
            }
        }

        impl PartialEq for OpenNode {
            fn eq(&self, other: &Self) -> bool {
                self.cmp_key(other) == Ordering::Equal
            }
        }

        impl Eq for OpenNode {}

        impl Ord for OpenNode {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse ordering to make BinaryHeap behave like a min-heap.
                other.cmp_key(self)
            }
        }

        impl PartialOrd for OpenNode {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut open = BinaryHeap::<OpenNode>::new();
        let mut g_score: HashMap<State, f64> = HashMap::new();
        let mut tie: u64 = 0;
        let mut expansions = 0usize;
        let mut truncated = false;

        g_score.insert(initial.clone(), 0.0);
        open.push(OpenNode {
            g: 0.0,
            last_action: 0,
            depth: 0,
            tie,
            state: initial.clone(),
            path: Vec::new(),
        });
        tie += 1;

        while let Some(node) = open.pop() {
            if deadline_elapsed(constraints) {
                return Err(SearchFailure::Timeout);
            }

            // Goal test on pop: the first goal node popped from a
            // uniform-cost frontier carries the minimum cost.
            if node.state.satisfies(goal) {
                let steps: Vec<ActionDef> = node
                    .path
                    .iter()
                    .map(|&position| self.domain.action_at(position).clone())
                    .collect();
                return Ok(SearchResult {
                    steps,
                    total_cost: node.g,
                });
            }

            let best_g = g_score.get(&node.state).copied();
            if best_g.is_some_and(|best| node.g.total_cmp(&best) == Ordering::Greater) {
                continue; // stale heap entry
            }

            expansions += 1;
            if constraints.max_expansions.is_some_and(|max| expansions > max) {
                return Err(SearchFailure::Exhausted);
            }

            if node.depth >= constraints.max_depth {
                // Depth-pruned nodes mean an empty frontier no longer proves
                // the goal unreachable.
                let cut_short = self
                    .permitted(&node.state)
                    .any(|(_, action)| node.state.apply(action) != node.state);
                truncated = truncated || cut_short;
                continue;
            }

            for (position, action) in self.permitted(&node.state) {
                let next = node.state.apply(action);
                if next == node.state {
                    continue;
                }

                let next_g = node.g + action.cost;
                let prev_best = g_score.get(&next).copied();
                if prev_best.is_some_and(|prev| next_g.total_cmp(&prev) != Ordering::Less) {
                    continue;
                }

                g_score.insert(next.clone(), next_g);
                let mut path = node.path.clone();
                path.push(position);
                open.push(OpenNode {
                    g: next_g,
                    last_action: position,
                    depth: node.depth + 1,
                    tie,
                    state: next,
                    path,
                });
                tie += 1;
            }
        }

        if truncated {
            Err(SearchFailure::Exhausted)
        } else {
            Err(SearchFailure::NoPlanFound)
        }
    }
}

fn deadline_elapsed(constraints: &Constraints) -> bool {
    constraints
        .deadline
        .is_some_and(|deadline| Instant::now() >= deadline)
}
