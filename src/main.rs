//! autoarm CLI
//!
//! Runs the arming agent, or inspects a saved diagnostic dump.

use autoarm::{
    agent::Agent,
    camera::CameraClient,
    cloud::{CloudClient, StopCommand},
    config::Config,
    router::RouterClient,
    station::{connected_addresses, fully_connected_hostnames, parse_report},
    VERSION,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autoarm")]
#[command(version = VERSION)]
#[command(about = "Presence-based arming agent for a home camera system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation loop
    Run,

    /// Parse a saved diagnostic dump and print the stations found
    Parse {
        /// Path to a raw diagnostic dump
        file: PathBuf,
    },

    /// Show the resolved configuration (credentials redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => cmd_run().await,
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Config => cmd_config(),
    }
}

async fn cmd_run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();

    let router = match RouterClient::new(config.router_report_url.clone()) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("Error creating router client: {e}");
            std::process::exit(1);
        }
    };
    let camera = match CameraClient::new(
        config.camera_user.clone(),
        config.camera_pass.clone(),
        config.camera_network.clone(),
    ) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("Error creating camera client: {e}");
            std::process::exit(1);
        }
    };
    let cloud = match CloudClient::new(&config.messaging) {
        Ok(cloud) => cloud,
        Err(e) => {
            eprintln!("Error creating cloud client: {e}");
            std::process::exit(1);
        }
    };

    // Stop commands come from the monitoring endpoint or a local Ctrl-C;
    // both feed the same channel the cycle driver races its wait against.
    let (stop_tx, stop_rx) = mpsc::channel(1);
    cloud.spawn_command_listener(stop_tx.clone());
    spawn_ctrl_c_handler(stop_tx);

    tracing::info!("autoarm v{VERSION} starting");
    let agent = Agent::new(&config, router, camera, cloud);
    agent.run(stop_rx).await;

    Ok(())
}

fn cmd_parse(file: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read(file)?;
    let table = parse_report(&raw);

    println!("Stations: {}", table.values().map(Vec::len).sum::<usize>());
    println!(
        "Fully connected hostnames: {:?}",
        fully_connected_hostnames(&table)
    );
    println!("Connected IPs: {:?}", connected_addresses(&table));
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = load_config();
    println!(
        "{}",
        serde_json::to_string_pretty(&config.redacted()).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}

/// Load configuration or abort with a descriptive message.
fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Treat a local Ctrl-C like an out-of-band stop command.
fn spawn_ctrl_c_handler(stop_tx: mpsc::Sender<StopCommand>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx
                .send(StopCommand {
                    payload: "ctrl-c".to_string(),
                })
                .await;
        }
    });
}
