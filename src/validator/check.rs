//! Validation through the proxy binary's check mode.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::validator::{DisposableFile, ValidationResult, Validator};

/// Placeholder replaced by the disposable file path in `args`.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// Runs `<binary> <args...>` against a disposable copy of the config.
#[derive(Debug, Clone)]
pub struct CheckCommandValidator {
    binary: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl CheckCommandValidator {
    /// `haproxy -c -f {config}` style validator.
    pub fn new(binary: impl Into<String>, scratch_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            args: default_check_args(),
            scratch_dir: scratch_dir.into(),
            timeout,
        }
    }

    /// Replace the argument template; `{config}` marks the file path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    async fn run(&self, file: &DisposableFile) -> ValidationResult {
        let path = file.path().to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(CONFIG_PLACEHOLDER, &path))
            .collect();

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => ValidationResult {
                valid: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                errors: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => {
                tracing::error!(binary = %self.binary, error = %e, "Failed to start config checker");
                ValidationResult::invocation_error(format!(
                    "failed to run {}: {}",
                    self.binary, e
                ))
            }
            Err(_) => {
                tracing::error!(binary = %self.binary, timeout = ?self.timeout, "Config checker timed out");
                ValidationResult::invocation_error(format!(
                    "{} did not finish within {:?}",
                    self.binary, self.timeout
                ))
            }
        }
    }
}

pub fn default_check_args() -> Vec<String> {
    vec!["-c".to_string(), "-f".to_string(), CONFIG_PLACEHOLDER.to_string()]
}

#[async_trait]
impl Validator for CheckCommandValidator {
    async fn validate(&self, config_text: &str) -> ValidationResult {
        let result = match DisposableFile::create(&self.scratch_dir, "haproxy_check", config_text).await {
            Ok(file) => self.run(&file).await,
            Err(e) => ValidationResult::invocation_error(format!(
                "failed to write disposable config in {}: {}",
                self.scratch_dir.display(),
                e
            )),
        };

        tracing::debug!(valid = result.valid, "Configuration validated");
        metrics::record_validation(result.valid);
        result
    }
}
