//! Planner configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use praxis_plan::{Constraints, SelectionPolicy};

/// Default search limits, loaded from `praxis.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum plan length.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Optional cap on node expansions per search.
    #[serde(default)]
    pub max_expansions: Option<usize>,

    /// Selection policy for searches that don't override it.
    #[serde(default)]
    pub selection: SelectionPolicy,
}

fn default_max_depth() -> usize {
    10
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_expansions: None,
            selection: SelectionPolicy::default(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from a directory (looks for `praxis.yaml`), falling back to
    /// defaults when the file is absent.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join("praxis.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// The default constraints this configuration describes.
    pub fn constraints(&self) -> Constraints {
        let mut constraints = Constraints::default()
            .with_max_depth(self.max_depth)
            .with_policy(self.selection);
        if let Some(max_expansions) = self.max_expansions {
            constraints = constraints.with_max_expansions(max_expansions);
        }
        constraints
    }
}
