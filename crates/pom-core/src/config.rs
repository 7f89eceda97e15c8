//! Resolver options.
//!
//! Every field has a default, so a JSON options file only needs the keys it
//! changes:
//!
//! ```json
//! { "max_depth": 8, "fetch_failure": "mark_unresolved", "active_profiles": ["ci"] }
//! ```

use crate::error::{PomError, Result};
use crate::properties::PropertyTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What to do when the POM of a transitive dependency cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Abort the whole analysis.
    #[default]
    Fail,
    /// Keep going and mark the branch as unresolved in the graph.
    MarkUnresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deepest allowed tree depth, direct dependencies being depth 0.
    pub max_depth: Option<usize>,
    /// Total number of nodes the tree may hold.
    pub max_nodes: Option<usize>,
    pub fetch_failure: FetchFailurePolicy,
    /// Property overrides with the highest precedence.
    pub system_properties: BTreeMap<String, String>,
    pub active_profiles: Vec<String>,
    /// Sibling POM fetches in flight at once.
    pub concurrency: usize,
    /// Skip `test` and `provided` declarations of dependency POMs.
    pub prune_non_transitive_scopes: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(64),
            max_nodes: Some(10_000),
            fetch_failure: FetchFailurePolicy::Fail,
            system_properties: BTreeMap::new(),
            active_profiles: Vec::new(),
            concurrency: 8,
            prune_non_transitive_scopes: false,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        tracing::debug!("loaded resolver config from {}", path.display());
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(PomError::Config {
                message: "concurrency must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub const fn is_lenient(&self) -> bool {
        matches!(self.fetch_failure, FetchFailurePolicy::MarkUnresolved)
    }

    pub fn overrides(&self) -> PropertyTable {
        self.system_properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
