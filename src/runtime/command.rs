//! Typed runtime commands.
//!
//! Every field is a validated model type, so rendering is plain
//! formatting: nothing can inject a second command or a shell metacharacter.

use std::fmt;

use crate::model::{BackendName, Mutation, ServerName, ServerSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    AddServer {
        backend: BackendName,
        server: ServerSpec,
    },
    DelServer {
        backend: BackendName,
        server: ServerName,
    },
    ShowStat,
}

impl RuntimeCommand {
    pub fn for_mutation(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::Add { backend, server } => RuntimeCommand::AddServer {
                backend: backend.clone(),
                server: server.clone(),
            },
            Mutation::Remove { backend, server } => RuntimeCommand::DelServer {
                backend: backend.clone(),
                server: server.clone(),
            },
        }
    }
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeCommand::AddServer { backend, server } => {
                write!(
                    f,
                    "add server {}/{} {} weight {}",
                    backend,
                    server.name(),
                    server.endpoint(),
                    server.weight()
                )?;
                if server.is_backup() {
                    f.write_str(" backup")?;
                }
                if server.health_check() {
                    f.write_str(" check")?;
                }
                Ok(())
            }
            RuntimeCommand::DelServer { backend, server } => {
                write!(f, "del server {}/{}", backend, server)
            }
            RuntimeCommand::ShowStat => f.write_str("show stat"),
        }
    }
}
