//! Validated identifiers for backends and servers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Name of a backend section in the proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackendName(String);

impl BackendName {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        check_identifier("backend", &name, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
        })?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a server inside a backend.
///
/// Hyphens are rewritten to underscores before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerName(String);

impl ServerName {
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = normalize_server_name(&name.into());
        check_identifier("server", &name, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':')
        })?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Apply the server-name rewrite without validating the result.
pub fn normalize_server_name(raw: &str) -> String {
    raw.replace('-', "_")
}

fn check_identifier(
    field: &'static str,
    value: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<(), ModelError> {
    if value.is_empty() {
        return Err(ModelError::EmptyName(field));
    }
    if let Some(character) = value.chars().find(|c| !allowed(*c)) {
        return Err(ModelError::IllegalCharacter {
            field,
            value: value.to_string(),
            character,
        });
    }
    Ok(())
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl TryFrom<String> for $ty {
            type Error = ModelError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype_impls!(BackendName);
string_newtype_impls!(ServerName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_name_rewrites_hyphens() {
        let name = ServerName::new("eu-backend-3").unwrap();
        assert_eq!(name.as_str(), "eu_backend_3");
    }

    #[test]
    fn test_server_name_rejects_whitespace_and_slash() {
        assert!(matches!(
            ServerName::new("n 1"),
            Err(ModelError::IllegalCharacter { character: ' ', .. })
        ));
        assert!(matches!(
            ServerName::new("pool/n1"),
            Err(ModelError::IllegalCharacter { character: '/', .. })
        ));
        assert_eq!(ServerName::new(""), Err(ModelError::EmptyName("server")));
    }

    #[test]
    fn test_backend_name_keeps_hyphens() {
        let name = BackendName::new("eu-backend").unwrap();
        assert_eq!(name.to_string(), "eu-backend");
        assert!(BackendName::new("pool;reload").is_err());
    }

    #[test]
    fn test_serde_goes_through_validation() {
        let name: ServerName = serde_json::from_str("\"node-7\"").unwrap();
        assert_eq!(name.as_str(), "node_7");

        let bad: Result<BackendName, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
