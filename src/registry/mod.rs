//! Desired-state sources for backend membership.
//!
//! # Data Flow
//! ```text
//! NodeRegistry::nodes()
//!     → active nodes only
//!     → ServerSpec (name defaults to `node_<address>`)
//!     → compare with servers configured in the backend block
//!     → engine.apply(Add) for each missing node
//!     → SyncReport {added, skipped, failed}
//! ```
//!
//! # Design Decisions
//! - Sync only adds; nodes that disappear from the registry are left for an
//!   operator to remove
//! - One failed node never aborts the rest of the sync

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{ReconcileError, ReconciliationEngine};
use crate::model::{normalize_server_name, BackendName, ModelError, Mutation, ServerSpec};

fn default_active() -> bool {
    true
}

fn default_weight() -> u32 {
    crate::model::server::DEFAULT_WEIGHT
}

/// A node advertised by a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryNode {
    /// Server name; derived from the address when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub address: String,
    pub port: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl RegistryNode {
    pub fn new(address: impl Into<String>, port: u32) -> Self {
        Self {
            name: None,
            address: address.into(),
            port,
            weight: default_weight(),
            active: true,
        }
    }

    pub fn server_name(&self) -> String {
        match &self.name {
            Some(name) => normalize_server_name(name),
            None => format!("node_{}", self.address.replace(['.', ':', '-'], "_")),
        }
    }

    pub fn to_spec(&self) -> Result<ServerSpec, ModelError> {
        ServerSpec::new(self.server_name(), self.address.clone(), self.port)?.with_weight(self.weight)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("cannot read backend servers: {0}")]
    Backend(#[from] ReconcileError),
}

#[async_trait]
pub trait NodeRegistry: Send + Sync {
    async fn nodes(&self) -> Result<Vec<RegistryNode>, RegistryError>;
}

/// Fixed node list from the settings file.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    nodes: Vec<RegistryNode>,
}

impl StaticRegistry {
    pub fn new(nodes: Vec<RegistryNode>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NodeRegistry for StaticRegistry {
    async fn nodes(&self) -> Result<Vec<RegistryNode>, RegistryError> {
        Ok(self.nodes.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub server: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

/// Add every active registry node missing from `backend`.
pub async fn sync_backend(
    engine: &ReconciliationEngine,
    registry: &dyn NodeRegistry,
    backend: &BackendName,
) -> Result<SyncReport, RegistryError> {
    let nodes = registry.nodes().await?;
    let mut present: HashSet<String> = engine
        .servers(backend)
        .await?
        .into_iter()
        .map(|entry| normalize_server_name(&entry.name))
        .collect();

    let mut report = SyncReport::default();
    for node in nodes.iter().filter(|n| n.active) {
        let name = node.server_name();
        if present.contains(&name) {
            report.skipped.push(name);
            continue;
        }

        let spec = match node.to_spec() {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(server = %name, error = %e, "Skipping invalid registry node");
                report.failed.push(SyncFailure {
                    server: name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let outcome = engine.apply(Mutation::add(backend.clone(), spec)).await;
        if outcome.success {
            present.insert(name.clone());
            report.added.push(name);
        } else {
            report.failed.push(SyncFailure {
                server: name,
                reason: outcome.diagnostics,
            });
        }
    }

    tracing::info!(
        backend = %backend,
        added = report.added.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Registry sync finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_and_normalized_names() {
        assert_eq!(RegistryNode::new("10.1.0.20", 80).server_name(), "node_10_1_0_20");

        let named = RegistryNode {
            name: Some("ddc-node-7".into()),
            ..RegistryNode::new("10.1.0.21", 80)
        };
        assert_eq!(named.server_name(), "ddc_node_7");
    }

    #[test]
    fn test_invalid_node_is_rejected_at_spec_time() {
        assert!(RegistryNode::new("10.1.0.20", 0).to_spec().is_err());
        let heavy = RegistryNode {
            weight: 1000,
            ..RegistryNode::new("10.1.0.20", 80)
        };
        assert!(heavy.to_spec().is_err());
    }

    #[test]
    fn test_node_defaults_from_toml() {
        let node: RegistryNode = toml::from_str("address = \"10.1.0.20\"\nport = 80\n").unwrap();
        assert!(node.active);
        assert_eq!(node.weight, 100);
        assert_eq!(node.name, None);
    }
}
