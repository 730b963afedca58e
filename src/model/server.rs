//! Server specification.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::model::{ModelError, ServerName};

/// Default server weight.
pub const DEFAULT_WEIGHT: u32 = 100;

/// Largest weight the proxy accepts.
pub const MAX_WEIGHT: u32 = 256;

/// A server to be placed in a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServerSpec", into = "RawServerSpec")]
pub struct ServerSpec {
    name: ServerName,
    address: String,
    port: u16,
    weight: u32,
    backup: bool,
    health_check: bool,
}

impl ServerSpec {
    /// Create a spec with default weight, not backup, health checks on.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u32,
    ) -> Result<Self, ModelError> {
        let name = ServerName::new(name)?;
        let address = address.into();
        validate_address(&address)?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ModelError::InvalidPort(port))?;

        Ok(Self {
            name,
            address,
            port,
            weight: DEFAULT_WEIGHT,
            backup: false,
            health_check: true,
        })
    }

    pub fn with_weight(mut self, weight: u32) -> Result<Self, ModelError> {
        if weight == 0 || weight > MAX_WEIGHT {
            return Err(ModelError::InvalidWeight(weight));
        }
        self.weight = weight;
        Ok(self)
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn name(&self) -> &ServerName {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn is_backup(&self) -> bool {
        self.backup
    }

    pub fn health_check(&self) -> bool {
        self.health_check
    }

    /// `address:port` as written in directives and commands.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

fn validate_address(address: &str) -> Result<(), ModelError> {
    if address.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let valid_hostname = !address.is_empty()
        && address.len() <= 253
        && !address.starts_with(['-', '.'])
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    if valid_hostname {
        Ok(())
    } else {
        Err(ModelError::InvalidAddress(address.to_string()))
    }
}

/// Wire form of [`ServerSpec`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawServerSpec {
    pub name: String,
    pub address: String,
    pub port: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub backup: bool,
    #[serde(default = "default_health_check", alias = "check")]
    pub health_check: bool,
}

fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}

fn default_health_check() -> bool {
    true
}

impl TryFrom<RawServerSpec> for ServerSpec {
    type Error = ModelError;

    fn try_from(raw: RawServerSpec) -> Result<Self, Self::Error> {
        Ok(ServerSpec::new(raw.name, raw.address, raw.port)?
            .with_weight(raw.weight)?
            .with_backup(raw.backup)
            .with_health_check(raw.health_check))
    }
}

impl From<ServerSpec> for RawServerSpec {
    fn from(spec: ServerSpec) -> Self {
        Self {
            name: spec.name.into(),
            address: spec.address,
            port: u32::from(spec.port),
            weight: spec.weight,
            backup: spec.backup,
            health_check: spec.health_check,
        }
    }
}
