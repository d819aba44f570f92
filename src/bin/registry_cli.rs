use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use graph_registry::registry::GraphRef;

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Management CLI for the federated graph registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4000")]
    url: String,

    #[arg(short, long, default_value = "registry-dev-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a service's schema; composes and publishes on success
    Push {
        /// Graph ref, `graph` or `graph@variant`
        graph_ref: String,
        /// Service name
        service: String,
        /// Address the gateway routes this service's fetches to
        routing_url: String,
        /// Path to the service's SDL file
        schema_file: PathBuf,
    },
    /// Dry-run a candidate schema without mutating anything
    Check {
        graph_ref: String,
        service: String,
        schema_file: PathBuf,
    },
    /// Delete a service; its name is retired for the whole graph
    Delete {
        graph_ref: String,
        service: String,
    },
    /// List the variant's registered services
    List { graph_ref: String },
    /// Check registry server status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Push {
            graph_ref,
            service,
            routing_url,
            schema_file,
        } => {
            let graph_ref: GraphRef = graph_ref.parse()?;
            let schema = std::fs::read_to_string(&schema_file)?;
            let res = client
                .post(format!(
                    "{}/api/graphs/{}/{}/push",
                    cli.url, graph_ref.graph, graph_ref.variant
                ))
                .headers(headers)
                .json(&serde_json::json!({
                    "service": service,
                    "routing_url": routing_url,
                    "schema": schema,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Check {
            graph_ref,
            service,
            schema_file,
        } => {
            let graph_ref: GraphRef = graph_ref.parse()?;
            let schema = std::fs::read_to_string(&schema_file)?;
            let res = client
                .post(format!(
                    "{}/api/graphs/{}/{}/check",
                    cli.url, graph_ref.graph, graph_ref.variant
                ))
                .headers(headers)
                .json(&serde_json::json!({
                    "service": service,
                    "schema": schema,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { graph_ref, service } => {
            let graph_ref: GraphRef = graph_ref.parse()?;
            let res = client
                .delete(format!(
                    "{}/api/graphs/{}/{}/services/{}",
                    cli.url, graph_ref.graph, graph_ref.variant, service
                ))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::List { graph_ref } => {
            let graph_ref: GraphRef = graph_ref.parse()?;
            let res = client
                .get(format!(
                    "{}/api/graphs/{}/{}/services",
                    cli.url, graph_ref.graph, graph_ref.variant
                ))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/status", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: registry returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
