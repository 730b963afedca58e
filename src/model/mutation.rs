//! Desired changes to a backend.

use serde::{Deserialize, Serialize};

use crate::model::{BackendName, ServerName, ServerSpec};

/// One desired change to backend membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Mutation {
    Add {
        backend: BackendName,
        server: ServerSpec,
    },
    Remove {
        backend: BackendName,
        server: ServerName,
    },
}

impl Mutation {
    pub fn add(backend: BackendName, server: ServerSpec) -> Self {
        Mutation::Add { backend, server }
    }

    pub fn remove(backend: BackendName, server: ServerName) -> Self {
        Mutation::Remove { backend, server }
    }

    pub fn backend(&self) -> &BackendName {
        match self {
            Mutation::Add { backend, .. } | Mutation::Remove { backend, .. } => backend,
        }
    }

    pub fn server_name(&self) -> &ServerName {
        match self {
            Mutation::Add { server, .. } => server.name(),
            Mutation::Remove { server, .. } => server,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Mutation::Add { .. } => "add",
            Mutation::Remove { .. } => "remove",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json_shape() {
        let mutation = Mutation::remove(
            BackendName::new("pool_a").unwrap(),
            ServerName::new("n2").unwrap(),
        );
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["action"], "remove");
        assert_eq!(json["backend"], "pool_a");
        assert_eq!(json["server"], "n2");

        let add: Mutation = serde_json::from_str(
            r#"{"action": "add", "backend": "pool_a",
                "server": {"name": "n-3", "address": "10.0.0.5", "port": 8080}}"#,
        )
        .unwrap();
        assert_eq!(add.action(), "add");
        assert_eq!(add.server_name().as_str(), "n_3");
    }
}
