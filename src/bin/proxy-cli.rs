use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dashboard_proxy::config::{load_with_overrides, set_primary_port};
use dashboard_proxy::routing::{RouteRequest, RuleSet};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Inspect the dashboard dev-server proxy", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key
    #[arg(short, long, env = "PROXY_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy status over the admin API
    Status,
    /// List the live route table over the admin API
    Routes,
    /// Resolve a path offline against a config file or the built-in table
    Resolve {
        /// Request path, e.g. /api/xamops/user/profile
        path: String,

        /// Treat the request as a WebSocket upgrade
        #[arg(long)]
        websocket: bool,

        /// Config file; the built-in table is used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Primary service port, as the proxy's --primary-port
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        primary_port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Resolve {
            path,
            websocket,
            config,
            primary_port,
        } => return resolve(&path, websocket, config, primary_port),
        Commands::Status => "/admin/status",
        Commands::Routes => "/admin/routes",
    };

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let base: url::Url = cli.url.parse()?;
    let res = client
        .get(base.join(path)?)
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

fn resolve(
    path: &str,
    websocket: bool,
    config: Option<PathBuf>,
    primary_port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_with_overrides(config.as_deref())?;
    if let Some(port) = primary_port {
        set_primary_port(&mut config, port);
    }
    let rules = RuleSet::from_config(&config)?;

    let request = RouteRequest {
        path,
        is_websocket_upgrade: websocket,
    };
    let output = match rules.resolve(&request) {
        Some(decision) => json!({
            "matched": true,
            "rule": decision.rule.name,
            "prefix": decision.rule.prefix(),
            "upstream": decision.endpoint.to_string(),
            "outbound_path": decision.outbound_path,
            "forward_as_websocket": decision.forward_as_websocket,
            "rewrite_cookies": decision.rewrite_response_cookies.is_some(),
            "preserve_host": decision.preserve_host_header,
            "rewrite_ws_origin": decision.rewrite_ws_origin,
        }),
        None => json!({ "matched": false, "path": path }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
