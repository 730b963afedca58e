//! Proxy reload trigger.
//!
//! The reload is a black box: run the configured command, report whether it
//! exited successfully along with whatever it printed.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;

use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadReport {
    pub success: bool,
    pub output: String,
    pub errors: String,
    pub timestamp: DateTime<Utc>,
}

impl ReloadReport {
    fn failed(errors: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            errors,
            timestamp: Utc::now(),
        }
    }
}

/// Makes an on-disk configuration change take effect.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> ReloadReport;
}

/// Runs a reload command (argv, no shell) with a deadline.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandReloader {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

#[async_trait]
impl Reloader for CommandReloader {
    async fn reload(&self) -> ReloadReport {
        let Some((program, args)) = self.argv.split_first() else {
            return ReloadReport::failed("no reload command configured".to_string());
        };

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let report = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => ReloadReport {
                success: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                errors: String::from_utf8_lossy(&output.stderr).into_owned(),
                timestamp: Utc::now(),
            },
            Ok(Err(e)) => ReloadReport::failed(format!("failed to run {}: {}", program, e)),
            Err(_) => ReloadReport::failed(format!(
                "{} did not finish within {:?}",
                program, self.timeout
            )),
        };

        if report.success {
            tracing::info!(command = %program, "Proxy reloaded");
        } else {
            tracing::error!(command = %program, errors = %report.errors, "Proxy reload failed");
        }
        metrics::record_reload(report.success);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_successful_reload_captures_output() {
        let reloader = CommandReloader::new(
            argv(&["sh", "-c", "echo reloaded"]),
            Duration::from_secs(5),
        );
        let report = reloader.reload().await;
        assert!(report.success);
        assert_eq!(report.output.trim(), "reloaded");
    }

    #[tokio::test]
    async fn test_failed_reload() {
        let reloader = CommandReloader::new(
            argv(&["sh", "-c", "echo 'no pid file' >&2; exit 3"]),
            Duration::from_secs(5),
        );
        let report = reloader.reload().await;
        assert!(!report.success);
        assert!(report.errors.contains("no pid file"));
    }

    #[tokio::test]
    async fn test_missing_and_empty_command() {
        let report = CommandReloader::new(argv(&["/nonexistent/reload.sh"]), Duration::from_secs(1))
            .reload()
            .await;
        assert!(!report.success);
        assert!(report.errors.contains("failed to run"));

        let report = CommandReloader::new(Vec::new(), Duration::from_secs(1)).reload().await;
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_reload_timeout() {
        let reloader = CommandReloader::new(argv(&["sleep", "5"]), Duration::from_millis(100));
        let report = reloader.reload().await;
        assert!(!report.success);
        assert!(report.errors.contains("did not finish"));
    }
}
