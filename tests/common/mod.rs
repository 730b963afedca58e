//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};

use lb_reconciler::changelog::JsonlChangeLog;
use lb_reconciler::engine::ReconciliationEngine;
use lb_reconciler::reload::{ReloadReport, Reloader};
use lb_reconciler::runtime::{RuntimeChannel, SocketChannel, SocketEndpoint};
use lb_reconciler::store::ConfigStore;
use lb_reconciler::validator::{ValidationResult, Validator};

pub const SAMPLE_CONFIG: &str = "\
global
    daemon
    stats socket /var/run/haproxy.sock mode 660 level admin

defaults
    mode http
    timeout connect 5s

frontend http_in
    bind *:80
    default_backend pool_a

backend pool_a
    balance roundrobin
    server n1 10.0.0.1:8080 check inter 5s rise 2 fall 3 weight 100
    server n2 10.0.0.2:8080 check inter 5s rise 2 fall 3 weight 100

backend pool_b
    balance leastconn
    server m1 10.0.1.1:9000 check inter 5s rise 2 fall 3 weight 50

backend ddc_nodes_http
    balance roundrobin
";

pub const STAT_REPLY: &str = "\
# pxname,svname,qcur,qmax,scur,smax,slim,stot,bin,bout,dreq,dresp,ereq,econ,eresp,wretr,wredis,status,weight
http_in,FRONTEND,,,3,10,2000,120,0,0,0,0,0,,,,,OPEN,
pool_a,n1,0,0,1,4,,60,0,0,,0,,0,0,0,0,UP,100
pool_a,n2,0,0,2,5,,60,0,0,,0,,0,0,0,0,UP,100
pool_a,BACKEND,0,0,3,9,200,120,0,0,0,0,,0,0,0,0,UP,200

";

/// Commands received by a mock runtime socket, in arrival order.
pub type Received = Arc<Mutex<Vec<String>>>;

async fn serve_one<S, F>(stream: S, responder: Arc<F>, received: Received)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
        return;
    }
    let command = line.trim_end().to_string();
    received.lock().unwrap().push(command.clone());

    let reply = responder(&command);
    let stream = reader.get_mut();
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Start a mock runtime API on a Unix socket; one command per connection.
pub fn start_mock_runtime_unix<F>(path: &Path, responder: F) -> Received
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = UnixListener::bind(path).unwrap();
    let responder = Arc::new(responder);
    let received: Received = Arc::default();
    let log = received.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_one(socket, responder.clone(), log.clone()));
        }
    });
    received
}

/// Start a mock runtime API on TCP (like a socket relay).
pub async fn start_mock_runtime_tcp<F>(responder: F) -> (SocketAddr, Received)
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responder = Arc::new(responder);
    let received: Received = Arc::default();
    let log = received.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_one(socket, responder.clone(), log.clone()));
        }
    });
    (addr, received)
}

/// Replies the way HAProxy does to `add server` / `del server` / `show stat`.
pub fn haproxy_like(command: &str) -> String {
    if command.starts_with("add server") {
        "New server registered.\n".to_string()
    } else if command.starts_with("del server") {
        "Server deleted.\n".to_string()
    } else if command == "show stat" {
        STAT_REPLY.to_string()
    } else {
        "Unknown command. Please enter one of the following commands only :\n".to_string()
    }
}

/// Validator double: records every candidate and returns a fixed verdict.
#[derive(Default)]
pub struct StubValidator {
    pub reject: bool,
    pub candidates: Mutex<Vec<String>>,
}

#[async_trait]
impl Validator for StubValidator {
    async fn validate(&self, config_text: &str) -> ValidationResult {
        self.candidates.lock().unwrap().push(config_text.to_string());
        if self.reject {
            ValidationResult {
                valid: false,
                output: String::new(),
                errors: "[ALERT] config : parsing error".to_string(),
            }
        } else {
            ValidationResult {
                valid: true,
                output: "Configuration file is valid".to_string(),
                errors: String::new(),
            }
        }
    }
}

#[derive(Default)]
pub struct StubReloader {
    pub calls: AtomicUsize,
}

impl StubReloader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reloader for StubReloader {
    async fn reload(&self) -> ReloadReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ReloadReport {
            success: true,
            output: "reloaded".to_string(),
            errors: String::new(),
            timestamp: Utc::now(),
        }
    }
}

/// A temp directory holding a live config, a change log and a socket path.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub config_path: PathBuf,
    pub changelog_path: PathBuf,
    pub socket_path: PathBuf,
    pub validator: Arc<StubValidator>,
    pub reloader: Arc<StubReloader>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SAMPLE_CONFIG)
    }

    pub fn with_config(content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("haproxy.cfg");
        std::fs::write(&config_path, content).unwrap();
        Self {
            changelog_path: dir.path().join("changes.jsonl"),
            socket_path: dir.path().join("haproxy.sock"),
            config_path,
            dir,
            validator: Arc::new(StubValidator::default()),
            reloader: Arc::new(StubReloader::default()),
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.validator = Arc::new(StubValidator {
            reject: true,
            ..Default::default()
        });
        self
    }

    /// Socket channel pointed at this fixture's socket path.
    pub fn socket_channel(&self) -> Arc<dyn RuntimeChannel> {
        Arc::new(SocketChannel::new(
            SocketEndpoint::Unix(self.socket_path.clone()),
            Duration::from_secs(2),
        ))
    }

    pub fn engine(&self) -> ReconciliationEngine {
        self.engine_with(self.socket_channel())
    }

    pub fn engine_with(&self, channel: Arc<dyn RuntimeChannel>) -> ReconciliationEngine {
        ReconciliationEngine::new(
            channel,
            Arc::new(ConfigStore::new(&self.config_path)),
            self.validator.clone(),
            self.reloader.clone(),
            Arc::new(JsonlChangeLog::new(&self.changelog_path)),
        )
    }

    pub fn config_text(&self) -> String {
        std::fs::read_to_string(&self.config_path).unwrap()
    }
}
