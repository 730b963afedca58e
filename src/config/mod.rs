//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (HAPROXY_* / ADMIN_API_KEY environment overrides)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → main.rs builds the engine's collaborators from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_default, ConfigError};
pub use schema::{
    AdminConfig, ChangeLogConfig, ControlPlaneConfig, HaproxyConfig, LogFormat,
    ObservabilityConfig, RegistryConfig, RuntimeConfig,
};
