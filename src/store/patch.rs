//! Line-oriented edits of backend blocks.
//!
//! A backend block starts at its `backend <name>` header and runs until a
//! blank line, the next unindented non-comment line, or end of text. Only
//! `server` directives inside that block are ever touched; every other byte
//! of the text is carried over unchanged.

use serde::Serialize;
use thiserror::Error;

use crate::model::{normalize_server_name, BackendName, ServerName, ServerSpec};

/// Health-check parameters written on every checked server directive.
pub const HEALTH_CHECK_PARAMS: &str = "check inter 5s rise 2 fall 3";

const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("backend '{0}' not found in configuration")]
    BackendNotFound(String),

    #[error("server '{server}' not found in backend '{backend}'")]
    ServerNotFound { backend: String, server: String },

    #[error("server '{server}' already exists in backend '{backend}'")]
    DuplicateServer { backend: String, server: String },
}

/// A `server` directive found inside a backend block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEntry {
    pub name: String,
    pub endpoint: String,
    pub options: String,
}

/// Header line index and exclusive end line index of a backend block.
struct Block {
    header: usize,
    end: usize,
}

impl Block {
    fn body(&self) -> std::ops::Range<usize> {
        self.header + 1..self.end
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

fn is_backend_header(line: &str, backend: &str) -> bool {
    let mut tokens = line.split_whitespace();
    tokens.next() == Some("backend")
        && tokens.next() == Some(backend)
        && match tokens.next() {
            None => true,
            Some(token) => token.starts_with('#'),
        }
}

fn ends_block(line: &str) -> bool {
    if line.trim().is_empty() {
        return true;
    }
    let indented = line.starts_with([' ', '\t']);
    !indented && !line.trim_start().starts_with('#')
}

fn find_block(lines: &[&str], backend: &str) -> Result<Block, PatchError> {
    let header = lines
        .iter()
        .position(|line| is_backend_header(line, backend))
        .ok_or_else(|| PatchError::BackendNotFound(backend.to_string()))?;

    let end = lines[header + 1..]
        .iter()
        .position(|line| ends_block(line))
        .map_or(lines.len(), |offset| header + 1 + offset);

    Ok(Block { header, end })
}

/// Name of the server declared on `line`, if it is a server directive.
fn server_name_of(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some("server"), Some(name)) => Some(name),
        _ => None,
    }
}

/// Whether `line` declares `server`, comparing names in normalized form.
fn declares_server(line: &str, server: &ServerName) -> bool {
    server_name_of(line).is_some_and(|name| normalize_server_name(name) == server.as_str())
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Render the directive body (without indentation or line ending).
pub fn server_directive(spec: &ServerSpec) -> String {
    let mut directive = format!("server {} {}", spec.name(), spec.endpoint());
    if spec.health_check() {
        directive.push(' ');
        directive.push_str(HEALTH_CHECK_PARAMS);
    }
    directive.push_str(&format!(" weight {}", spec.weight()));
    if spec.is_backup() {
        directive.push_str(" backup");
    }
    directive
}

/// Insert a server directive after the last server of `backend`.
pub fn patch_add_server(
    text: &str,
    backend: &BackendName,
    spec: &ServerSpec,
) -> Result<String, PatchError> {
    let lines = split_lines(text);
    let block = find_block(&lines, backend.as_str())?;

    let servers: Vec<usize> = block
        .body()
        .filter(|&i| server_name_of(lines[i]).is_some())
        .collect();

    if servers
        .iter()
        .any(|&i| declares_server(lines[i], spec.name()))
    {
        return Err(PatchError::DuplicateServer {
            backend: backend.to_string(),
            server: spec.name().to_string(),
        });
    }

    let (anchor, indent) = match servers.last() {
        Some(&last) => (last, leading_whitespace(lines[last])),
        None => (block.header, DEFAULT_INDENT),
    };

    let directive = server_directive(spec);
    let mut patched = String::with_capacity(text.len() + directive.len() + indent.len() + 2);
    for (i, line) in lines.iter().enumerate() {
        patched.push_str(line);
        if i != anchor {
            continue;
        }
        patched.push_str(indent);
        patched.push_str(&directive);
        if line.ends_with('\n') {
            patched.push_str(line_ending(line));
        } else {
            // Anchor was the unterminated last line: terminate it, keep the
            // new last line unterminated.
            let tail = patched.split_off(patched.len() - indent.len() - directive.len());
            patched.push('\n');
            patched.push_str(&tail);
        }
    }

    Ok(patched)
}

/// Excise the `server <name>` directive from `backend`.
pub fn patch_remove_server(
    text: &str,
    backend: &BackendName,
    server: &ServerName,
) -> Result<String, PatchError> {
    let lines = split_lines(text);
    let block = find_block(&lines, backend.as_str())?;

    let target = block
        .body()
        .find(|&i| declares_server(lines[i], server))
        .ok_or_else(|| PatchError::ServerNotFound {
            backend: backend.to_string(),
            server: server.to_string(),
        })?;

    Ok(lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(_, line)| *line)
        .collect())
}

/// Server directives of `backend`, in file order.
pub fn list_servers(text: &str, backend: &BackendName) -> Result<Vec<ServerEntry>, PatchError> {
    let lines = split_lines(text);
    let block = find_block(&lines, backend.as_str())?;

    Ok(block
        .body()
        .filter_map(|i| {
            let mut tokens = lines[i].split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some("server"), Some(name)) => Some(ServerEntry {
                    name: name.to_string(),
                    endpoint: tokens.next().unwrap_or_default().to_string(),
                    options: tokens.collect::<Vec<_>>().join(" "),
                }),
                _ => None,
            }
        })
        .collect())
}

/// Names of all backend sections, in file order.
pub fn list_backends(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some("backend"), Some(name)) => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
global
    daemon

frontend http_in
    bind *:80
    default_backend pool_a

backend pool_a
    balance roundrobin
    server n1 10.0.0.1:8080 check inter 5s rise 2 fall 3 weight 100
    server n2 10.0.0.2:8080 check inter 5s rise 2 fall 3 weight 100

backend pool_b
    balance leastconn
";

    fn pool(name: &str) -> BackendName {
        BackendName::new(name).unwrap()
    }

    fn n3() -> ServerSpec {
        ServerSpec::new("n3", "10.0.0.5", 8080).unwrap()
    }

    #[test]
    fn test_add_after_last_server() {
        let patched = patch_add_server(CONFIG, &pool("pool_a"), &n3()).unwrap();
        let names: Vec<String> = list_servers(&patched, &pool("pool_a"))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["n1", "n2", "n3"]);

        let expected_line = "    server n3 10.0.0.5:8080 check inter 5s rise 2 fall 3 weight 100\n";
        assert_eq!(patched.matches(expected_line).count(), 1);
        assert_eq!(patched.len(), CONFIG.len() + expected_line.len());

        // Removing the inserted line restores the original byte for byte.
        assert_eq!(patched.replacen(expected_line, "", 1), CONFIG);
    }

    #[test]
    fn test_add_into_empty_backend_uses_header_anchor() {
        let patched = patch_add_server(CONFIG, &pool("pool_b"), &n3()).unwrap();
        assert!(patched.ends_with(
            "backend pool_b\n    server n3 10.0.0.5:8080 check inter 5s rise 2 fall 3 weight 100\n    balance leastconn\n"
        ));
        assert_eq!(list_servers(&patched, &pool("pool_b")).unwrap().len(), 1);
        assert_eq!(list_servers(&patched, &pool("pool_a")).unwrap().len(), 2);
    }

    #[test]
    fn test_add_missing_backend() {
        let err = patch_add_server(CONFIG, &pool("pool_c"), &n3()).unwrap_err();
        assert_eq!(err, PatchError::BackendNotFound("pool_c".into()));
    }

    #[test]
    fn test_header_match_is_exact() {
        let text = "backend pool_ab\n    server x 10.0.0.9:80 weight 100\n";
        assert!(matches!(
            patch_add_server(text, &pool("pool_a"), &n3()),
            Err(PatchError::BackendNotFound(_))
        ));
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let dup = ServerSpec::new("n2", "10.0.0.9", 80).unwrap();
        let err = patch_add_server(CONFIG, &pool("pool_a"), &dup).unwrap_err();
        assert!(matches!(err, PatchError::DuplicateServer { .. }));
    }

    #[test]
    fn test_add_keeps_unterminated_last_line() {
        let text = "backend pool_a\n\tserver n1 10.0.0.1:80 weight 100";
        let patched = patch_add_server(text, &pool("pool_a"), &n3()).unwrap();
        assert_eq!(
            patched,
            "backend pool_a\n\tserver n1 10.0.0.1:80 weight 100\n\tserver n3 10.0.0.5:8080 check inter 5s rise 2 fall 3 weight 100"
        );
    }

    #[test]
    fn test_directive_options() {
        let spec = ServerSpec::new("spare", "10.0.0.7", 81)
            .unwrap()
            .with_weight(5)
            .unwrap()
            .with_backup(true)
            .with_health_check(false);
        assert_eq!(server_directive(&spec), "server spare 10.0.0.7:81 weight 5 backup");
    }

    #[test]
    fn test_remove_server() {
        let n2 = ServerName::new("n2").unwrap();
        let patched = patch_remove_server(CONFIG, &pool("pool_a"), &n2).unwrap();
        assert!(!patched.contains("server n2"));
        assert!(patched.contains("server n1"));
        assert_eq!(
            CONFIG.len() - patched.len(),
            "    server n2 10.0.0.2:8080 check inter 5s rise 2 fall 3 weight 100\n".len()
        );
    }

    #[test]
    fn test_remove_absent_server() {
        let ghost = ServerName::new("ghost").unwrap();
        let err = patch_remove_server(CONFIG, &pool("pool_a"), &ghost).unwrap_err();
        assert_eq!(
            err,
            PatchError::ServerNotFound {
                backend: "pool_a".into(),
                server: "ghost".into()
            }
        );
    }

    #[test]
    fn test_hyphenated_name_in_file_matches_normalized_name() {
        let text = "backend pool_a\n    server web-1 10.0.0.1:80 weight 100\n";

        let dup = ServerSpec::new("web-1", "10.0.0.1", 80).unwrap();
        assert_eq!(
            patch_add_server(text, &pool("pool_a"), &dup).unwrap_err(),
            PatchError::DuplicateServer {
                backend: "pool_a".into(),
                server: "web_1".into()
            }
        );

        let web_1 = ServerName::new("web-1").unwrap();
        let patched = patch_remove_server(text, &pool("pool_a"), &web_1).unwrap();
        assert_eq!(patched, "backend pool_a\n");
    }

    #[test]
    fn test_remove_is_scoped_to_block() {
        let text = "backend pool_a\n    server n1 10.0.0.1:80 weight 100\n\nbackend pool_b\n    server n9 10.0.0.9:80 weight 100\n";
        let n9 = ServerName::new("n9").unwrap();
        assert!(patch_remove_server(text, &pool("pool_a"), &n9).is_err());
        assert!(patch_remove_server(text, &pool("pool_b"), &n9).is_ok());
    }

    #[test]
    fn test_block_ends_at_next_section_without_blank_line() {
        let text = "backend pool_a\n    server n1 10.0.0.1:80 weight 100\nbackend pool_b\n    server n2 10.0.0.2:80 weight 100\n";
        let entries = list_servers(text, &pool("pool_a")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].endpoint, "10.0.0.1:80");
        assert_eq!(entries[0].options, "weight 100");
    }

    #[test]
    fn test_list_backends() {
        assert_eq!(list_backends(CONFIG), ["pool_a", "pool_b"]);
    }
}
