//! Quorum intake server CLI
//!
//! Starts the HTTP server for document uploads and voting.

use quorum_server::{config::ServerConfig, start_server, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using default test configuration");
        eprintln!("Usage: quorum-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default_test_config()
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Quorum Server - Multi-model form extraction with field voting");
    println!();
    println!("USAGE:");
    println!("    quorum-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file should contain:");
    println!("    - bind_address: IP address to bind (e.g., '127.0.0.1')");
    println!("    - bind_port: Port number (e.g., 5006)");
    println!("    - database_path: SQLite file for stored records");
    println!("    - blob_root: Directory for uploads and archives");
    println!("    - ollama_endpoint: Vision model API (default: http://localhost:11434)");
    println!("    - max_upload_bytes: Largest accepted upload (default: 16 MiB)");
    println!("    - [extractor]: models, run_timeout_secs, concurrent_runs, list_policy");
    println!();
    println!("Log verbosity follows RUST_LOG (default: info).");
}
