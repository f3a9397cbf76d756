//! Governance policies gating which actions a search may use.
//!
//! Policies are evaluated against action definitions at the search boundary:
//! an action a rule denies (or flags for review) never reaches the selection
//! step. Every evaluation lands in the audit trail.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use praxis_plan::{ActionDef, ActionGate};

use crate::audit::AuditLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny,
    RequiresReview,
}

/// A single rule. Every present condition must match for the rule to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    pub decision: PolicyDecision,

    /// Restrict the rule to these action names.
    #[serde(default)]
    pub action_names: Option<Vec<String>>,

    /// Require these parameter values on the action.
    #[serde(default)]
    pub parameter_equals: Option<BTreeMap<String, Value>>,
}

impl PolicyRule {
    pub fn new(name: impl Into<String>, decision: PolicyDecision) -> Self {
        Self {
            name: name.into(),
            decision,
            action_names: None,
            parameter_equals: None,
        }
    }

    pub fn for_actions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn when_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameter_equals
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    fn matches(&self, action: &ActionDef) -> bool {
        if let Some(names) = &self.action_names {
            if !names.iter().any(|name| name == &action.name) {
                return false;
            }
        }
        if let Some(parameters) = &self.parameter_equals {
            for (key, expected) in parameters {
                if action.parameters.get(key) != Some(expected) {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub rules: Vec<PolicyRule>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Ordered policy registry with an audit trail.
///
/// Evaluation walks policies in insertion order; the first matching rule
/// decides. With no match the default is `Allow`.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    policies: RwLock<Vec<(String, Policy)>>,
    audit: AuditLog,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a policy. Replacement keeps the original position.
    pub fn add_policy(&self, id: impl Into<String>, rules: Vec<PolicyRule>) {
        let id = id.into();
        let policy = Policy {
            rules,
            enabled: true,
            created_at: Utc::now(),
        };

        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match policies.iter_mut().find(|(existing, _)| existing == &id) {
            Some((_, slot)) => *slot = policy,
            None => policies.push((id.clone(), policy)),
        }
        drop(policies);

        tracing::info!(policy = %id, "policy added");
        self.audit.record("policy_added", json!({ "policy_id": id }));
    }

    pub fn remove_policy(&self, id: &str) -> bool {
        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = policies.len();
        policies.retain(|(existing, _)| existing != id);
        let removed = policies.len() != before;
        drop(policies);

        if removed {
            tracing::info!(policy = %id, "policy removed");
            self.audit
                .record("policy_removed", json!({ "policy_id": id }));
        }
        removed
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut policies = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match policies.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, policy)) => {
                policy.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn evaluate(&self, action: &ActionDef) -> PolicyDecision {
        let policies = self.policies.read().unwrap_or_else(PoisonError::into_inner);
        for (policy_id, policy) in policies.iter() {
            if !policy.enabled {
                continue;
            }
            for rule in &policy.rules {
                if rule.matches(action) {
                    self.audit.record(
                        "action_evaluated",
                        json!({
                            "action": action.name,
                            "policy_id": policy_id,
                            "rule": rule.name,
                            "decision": rule.decision,
                        }),
                    );
                    return rule.decision;
                }
            }
        }

        self.audit.record(
            "action_evaluated",
            json!({ "action": action.name, "decision": PolicyDecision::Allow }),
        );
        PolicyDecision::Allow
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}

impl ActionGate for PolicyEngine {
    /// Anything short of an explicit `Allow` keeps the action out of a
    /// fully-automated search.
    fn permits(&self, action: &ActionDef) -> bool {
        matches!(self.evaluate(action), PolicyDecision::Allow)
    }
}
