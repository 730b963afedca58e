//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check registry nodes against the same rules as API requests
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ControlPlaneConfig;
use crate::model::BackendName;
use crate::runtime::SocketEndpoint;

/// A single semantic problem, tagged with the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let haproxy = &config.haproxy;
    if haproxy.config_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("haproxy.config_path", "must not be empty"));
    }
    if haproxy.binary.trim().is_empty() {
        errors.push(ValidationError::new("haproxy.binary", "must not be empty"));
    }
    if haproxy.validate_timeout_secs == 0 {
        errors.push(ValidationError::new("haproxy.validate_timeout_secs", "must be > 0"));
    }
    if haproxy
        .reload_command
        .first()
        .map_or(true, |program| program.trim().is_empty())
    {
        errors.push(ValidationError::new("haproxy.reload_command", "must name a program"));
    }
    if haproxy.reload_timeout_secs == 0 {
        errors.push(ValidationError::new("haproxy.reload_timeout_secs", "must be > 0"));
    }

    if let Err(e) = config.runtime.socket.parse::<SocketEndpoint>() {
        errors.push(ValidationError::new("runtime.socket", e));
    }
    if config.runtime.timeout_secs == 0 {
        errors.push(ValidationError::new("runtime.timeout_secs", "must be > 0"));
    }

    if config.changelog.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("changelog.path", "must not be empty"));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
        if config.admin.request_timeout_secs == 0 {
            errors.push(ValidationError::new("admin.request_timeout_secs", "must be > 0"));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if let Err(e) = BackendName::new(config.registry.backend.as_str()) {
        errors.push(ValidationError::new("registry.backend", e.to_string()));
    }
    for (i, node) in config.registry.nodes.iter().enumerate() {
        if let Err(e) = node.to_spec() {
            errors.push(ValidationError::new(format!("registry.nodes[{}]", i), e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
