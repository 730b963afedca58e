//! Backend reconciliation engine.
//!
//! # Data Flow
//! ```text
//! apply(mutation)
//!     → runtime/ (typed command over the admin socket)
//!         ok  → outcome {Runtime}
//!         err → store lock
//!               → store/ read + patch
//!               → validator/ check candidate
//!               → store/ write (hash-checked promote)
//!               → reload/ trigger
//!               → outcome {FilePatch}
//!     → changelog/ append (always)
//! ```
//!
//! # Design Decisions
//! - The runtime path is always tried first; it is cheap and takes effect
//!   immediately but does not survive a restart
//! - The fallback holds the store lock from read to reload, so two writers
//!   never interleave their read-modify-write cycles
//! - A failed validation never reaches the live file
//! - Audit failures are logged and never change the outcome

pub mod error;
pub mod state;

pub use error::ReconcileError;
pub use state::ApplyState;

use std::sync::Arc;
use std::time::Instant;

use crate::changelog::{AuditSink, ChangeLogError, ChangeRecord};
use crate::model::{BackendName, Mutation, PathUsed, ReconciliationOutcome};
use crate::observability::metrics;
use crate::reload::{ReloadReport, Reloader};
use crate::runtime::{self, parse_stat_csv, ChannelError, RuntimeChannel, RuntimeCommand, ServerStat};
use crate::store::{patch, ConfigSnapshot, ConfigStore, ServerEntry, StoreError};
use crate::validator::{ValidationResult, Validator};

use state::StateTracker;

/// Orchestrates runtime changes with a durable file-patch fallback.
pub struct ReconciliationEngine {
    channel: Arc<dyn RuntimeChannel>,
    store: Arc<ConfigStore>,
    validator: Arc<dyn Validator>,
    reloader: Arc<dyn Reloader>,
    audit: Arc<dyn AuditSink>,
}

impl ReconciliationEngine {
    pub fn new(
        channel: Arc<dyn RuntimeChannel>,
        store: Arc<ConfigStore>,
        validator: Arc<dyn Validator>,
        reloader: Arc<dyn Reloader>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            channel,
            store,
            validator,
            reloader,
            audit,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Whether the runtime socket looks reachable without connecting.
    pub fn runtime_present(&self) -> bool {
        self.channel.is_present()
    }

    /// Apply one mutation and record it.
    #[tracing::instrument(
        name = "apply",
        skip_all,
        fields(action = mutation.action(), backend = %mutation.backend(), server = %mutation.server_name())
    )]
    pub async fn apply(&self, mutation: Mutation) -> ReconciliationOutcome {
        let started = Instant::now();
        let outcome = self.reconcile(&mutation).await;

        metrics::record_apply(outcome.path_used, outcome.success, started.elapsed());
        if outcome.success {
            tracing::info!(path = %outcome.path_used, "Mutation applied");
        } else {
            tracing::warn!(
                path = %outcome.path_used,
                diagnostics = %outcome.diagnostics,
                "Mutation failed"
            );
        }

        let record = ChangeRecord::new(mutation, outcome.clone());
        if let Err(e) = self.audit.append(&record).await {
            tracing::error!(record = %record.id, error = %e, "Failed to append change record");
        }

        outcome
    }

    async fn reconcile(&self, mutation: &Mutation) -> ReconciliationOutcome {
        let mut tracker = StateTracker::new();

        tracker.enter(ApplyState::AttemptingRuntime);
        let command = RuntimeCommand::for_mutation(mutation);
        let runtime_error = match runtime::send_checked(self.channel.as_ref(), &command).await {
            Ok(reply) => {
                tracker.enter(ApplyState::Succeeded);
                return ReconciliationOutcome::succeeded(PathUsed::Runtime, reply.trim());
            }
            Err(e) => {
                tracing::info!(error = %e, "Runtime path failed, falling back to file patch");
                e
            }
        };

        tracker.enter(ApplyState::AttemptingFilePatch);
        let outcome = match self.patch_and_reload(mutation).await {
            Ok(report) => {
                tracker.enter(ApplyState::Succeeded);
                ReconciliationOutcome::succeeded(
                    PathUsed::FilePatch,
                    format!(
                        "runtime: {}; configuration patched and reloaded{}",
                        runtime_error,
                        tail(&report.output)
                    ),
                )
            }
            Err(e) => {
                tracker.enter(ApplyState::Failed);
                let path = if e.is_request_error() {
                    PathUsed::None
                } else {
                    PathUsed::FilePatch
                };
                ReconciliationOutcome::failed(path, e.to_string())
            }
        };
        debug_assert!(tracker.state().is_terminal());
        outcome
    }

    async fn patch_and_reload(&self, mutation: &Mutation) -> Result<ReloadReport, ReconcileError> {
        let _guard = self.store.lock().await;

        let snapshot = self.store.read().await?;
        let candidate = match mutation {
            Mutation::Add { backend, server } => {
                patch::patch_add_server(&snapshot.content, backend, server)?
            }
            Mutation::Remove { backend, server } => {
                patch::patch_remove_server(&snapshot.content, backend, server)?
            }
        };

        let verdict = self.validator.validate(&candidate).await;
        if !verdict.valid {
            return Err(ReconcileError::ValidationFailed {
                diagnostics: verdict_diagnostics(&verdict),
            });
        }

        self.store.write(&snapshot, &candidate).await?;

        let report = self.reloader.reload().await;
        if !report.success {
            return Err(ReconcileError::ReloadFailed {
                diagnostics: report.errors.trim().to_string(),
            });
        }
        Ok(report)
    }

    pub async fn read(&self) -> Result<ConfigSnapshot, StoreError> {
        self.store.read().await
    }

    /// Check arbitrary configuration text without touching the live file.
    pub async fn validate(&self, config_text: &str) -> ValidationResult {
        self.validator.validate(config_text).await
    }

    /// Reload the proxy, serialized with file-patch writers.
    pub async fn reload(&self) -> ReloadReport {
        let _guard = self.store.lock().await;
        self.reloader.reload().await
    }

    /// Servers configured in the file for `backend`.
    pub async fn servers(&self, backend: &BackendName) -> Result<Vec<ServerEntry>, ReconcileError> {
        let snapshot = self.store.read().await?;
        Ok(patch::list_servers(&snapshot.content, backend)?)
    }

    /// Live per-server statistics from the runtime socket.
    pub async fn stats(&self) -> Result<Vec<ServerStat>, ChannelError> {
        let reply = runtime::send_checked(self.channel.as_ref(), &RuntimeCommand::ShowStat).await?;
        parse_stat_csv(&reply)
    }

    pub async fn recent_changes(&self, limit: usize) -> Result<Vec<ChangeRecord>, ChangeLogError> {
        self.audit.recent(limit).await
    }
}

fn verdict_diagnostics(verdict: &ValidationResult) -> String {
    let errors = verdict.errors.trim();
    if errors.is_empty() {
        verdict.output.trim().to_string()
    } else {
        errors.to_string()
    }
}

fn tail(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!(": {}", output)
    }
}
