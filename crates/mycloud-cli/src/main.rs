//! My Cloud Monitor Control Tool
//!
//! CLI for querying the My Cloud Monitor daemon over its web API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mycloud_client::{DaemonClient, DEFAULT_URL};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Shortest poll period the daemon accepts.
const MIN_UPDATE_INTERVAL: u64 = 30;

#[derive(Parser)]
#[command(name = "mycloudctl")]
#[command(about = "Control tool for the My Cloud Monitor daemon")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Daemon web API address
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show coordinator status
    Status,
    /// List devices
    Devices,
    /// List entities with their current states
    Entities {
        /// Only show entities of this device id
        #[arg(long)]
        device: Option<String>,
    },
    /// Show one entity
    Entity {
        /// Entity unique id (e.g., WDNAS001_cpu_usage)
        unique_id: String,
    },
    /// Print the raw latest snapshot as JSON
    Snapshot,
    /// Run a fetch cycle now
    Refresh,
    /// Runtime options
    Options {
        #[command(subcommand)]
        action: OptionsCommands,
    },
}

#[derive(Subcommand)]
enum OptionsCommands {
    /// Show current options
    Show,
    /// Set the poll period
    Interval {
        /// Poll period in seconds (at least 30)
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!("Using daemon at {}", cli.url);
    let client = DaemonClient::new(&cli.url)?;

    match cli.command {
        Commands::Status => handle_status(&client).await,
        Commands::Devices => handle_devices(&client).await,
        Commands::Entities { device } => handle_entities(device.as_deref(), &client).await,
        Commands::Entity { unique_id } => handle_entity(&unique_id, &client).await,
        Commands::Snapshot => handle_snapshot(&client).await,
        Commands::Refresh => handle_refresh(&client).await,
        Commands::Options { action } => handle_options(action, &client).await,
    }
}

async fn handle_status(client: &DaemonClient) -> Result<()> {
    let status = client.status().await?;
    println!("Daemon: running");
    println!(
        "  Last update: {}",
        if status.last_update_success {
            "ok"
        } else {
            "failed"
        }
    );
    if let Some(error) = &status.last_error {
        println!("  Last error: {}", error);
    }
    if let Some(success) = &status.last_success {
        println!("  Last success: {}", success);
    }
    println!("  Cycles: {} ({} failed)", status.cycles, status.failures);
    println!("  Devices: {}", status.device_count);
    println!("  Entities: {}", status.entity_count);
    println!("  Update interval: {}s", status.update_interval);
    Ok(())
}

async fn handle_devices(client: &DaemonClient) -> Result<()> {
    let devices = client.devices().await?;
    println!("Devices:");
    for device in devices {
        println!("  {} - {}", device.id(), device.name);
        println!("      {} {}", device.manufacturer, device.model);
        if let Some(hw) = &device.hw_version {
            println!("      Firmware: {} / {}", device.sw_version, hw);
        } else {
            println!("      Firmware: {}", device.sw_version);
        }
    }
    Ok(())
}

async fn handle_entities(device: Option<&str>, client: &DaemonClient) -> Result<()> {
    let entities = client.entities(device).await?;
    if entities.is_empty() {
        println!("(no entities)");
    }
    for entity in entities {
        println!("  {:<40} {}", entity.name, entity.display_state());
    }
    Ok(())
}

async fn handle_entity(unique_id: &str, client: &DaemonClient) -> Result<()> {
    let Some(entity) = client.entity(unique_id).await? else {
        anyhow::bail!("Unknown entity: {}", unique_id);
    };
    println!("{}", entity.name);
    println!("  Unique id: {}", entity.unique_id);
    println!("  Device: {}", entity.device_id);
    println!("  Platform: {}", entity.platform);
    println!("  State: {}", entity.display_state());
    Ok(())
}

async fn handle_snapshot(client: &DaemonClient) -> Result<()> {
    let snapshot = client.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn handle_refresh(client: &DaemonClient) -> Result<()> {
    let fetched_at = client.refresh().await?;
    println!("Refreshed at: {}", fetched_at);
    Ok(())
}

async fn handle_options(action: OptionsCommands, client: &DaemonClient) -> Result<()> {
    match action {
        OptionsCommands::Show => {
            let options = client.options().await?;
            println!("Update interval: {}s", options.update_interval);
        }
        OptionsCommands::Interval { seconds } => {
            if seconds < MIN_UPDATE_INTERVAL {
                anyhow::bail!(
                    "Update interval must be at least {} seconds",
                    MIN_UPDATE_INTERVAL
                );
            }
            let options = client.set_update_interval(seconds).await?;
            println!("Update interval set to: {}s", options.update_interval);
        }
    }

    Ok(())
}
