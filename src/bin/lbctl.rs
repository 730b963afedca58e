use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "lbctl")]
#[command(about = "Management CLI for the load balancer control plane", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081", env = "LBCTL_URL")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION", env = "ADMIN_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check control plane health
    Status,
    /// Show the live configuration
    Config {
        /// Print the raw configuration text only
        #[arg(long)]
        raw: bool,
    },
    /// Check a configuration file without applying it
    Validate { file: PathBuf },
    /// Reload the proxy
    Reload,
    /// Add a server to a backend
    Add {
        backend: String,
        name: String,
        address: String,
        port: u32,
        #[arg(long, default_value_t = 100)]
        weight: u32,
        #[arg(long)]
        backup: bool,
        /// Disable health checks for this server
        #[arg(long)]
        no_check: bool,
    },
    /// Remove a server from a backend
    Remove { backend: String, name: String },
    /// List servers configured in a backend
    Servers { backend: String },
    /// Show runtime statistics
    Stats,
    /// Show recent change records
    Changes {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Add missing registry nodes
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/health", base)),
        Commands::Config { raw } => {
            let res = client.get(format!("{}/api/v1/config", base)).send().await?;
            if raw && res.status().is_success() {
                let json: Value = res.json().await?;
                print!("{}", json["content"].as_str().unwrap_or_default());
                return Ok(());
            }
            return print_response(res).await;
        }
        Commands::Validate { file } => {
            let config = std::fs::read_to_string(&file)?;
            client
                .post(format!("{}/api/v1/config/validate", base))
                .json(&json!({ "config": config }))
        }
        Commands::Reload => client.post(format!("{}/api/v1/config/reload", base)),
        Commands::Add {
            backend,
            name,
            address,
            port,
            weight,
            backup,
            no_check,
        } => client
            .post(format!("{}/api/v1/backends/{}/servers", base, backend))
            .json(&json!({
                "name": name,
                "address": address,
                "port": port,
                "weight": weight,
                "backup": backup,
                "health_check": !no_check,
            })),
        Commands::Remove { backend, name } => {
            client.delete(format!("{}/api/v1/backends/{}/servers/{}", base, backend, name))
        }
        Commands::Servers { backend } => {
            client.get(format!("{}/api/v1/backends/{}/servers", base, backend))
        }
        Commands::Stats => client.get(format!("{}/api/v1/stats", base)),
        Commands::Changes { limit } => client
            .get(format!("{}/api/v1/config/changes", base))
            .query(&[("limit", limit)]),
        Commands::Sync => client.post(format!("{}/api/v1/registry/sync", base)),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", body);
        Ok(())
    } else {
        eprintln!("Error: Admin API returned status {}", status);
        eprintln!("{}", body);
        std::process::exit(1);
    }
}
