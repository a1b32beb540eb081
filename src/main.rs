use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use prometheus::Registry;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dhcpd_pools_exporter::{
    Config, ExporterMetrics, ExporterServer, Poller, Result, StatsChannel,
};

#[derive(Parser)]
#[command(name = "dhcpd-pools-exporter")]
#[command(author, version, about = "Prometheus exporter for ISC DHCP pool utilisation", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "dhcpd-pools-exporter.yaml")]
    config: PathBuf,

    #[arg(short, long)]
    log_level: Option<String>,

    /// Path to the DHCP server's configuration file
    #[arg(long)]
    dhcpd_config: Option<PathBuf>,

    /// Path to the DHCP server's leases file
    #[arg(long)]
    leases: Option<PathBuf>,

    /// Metrics listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Plain-text file holding the configuration file pattern
    #[arg(long)]
    pools_regex: Option<PathBuf>,

    /// Plain-text file holding the leases file pattern
    #[arg(long)]
    lease_regex: Option<PathBuf>,

    /// Poll interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    ShowConfig,
    Stats {
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.dhcpd_config {
            config.dhcpd_config = path.clone();
        }
        if let Some(path) = &self.leases {
            config.leases_file = path.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.pools_regex {
            config.pools_regex = path.clone();
        }
        if let Some(path) = &self.lease_regex {
            config.lease_regex = path.clone();
        }
        if let Some(interval) = self.interval {
            config.poll_interval_seconds = interval;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_create(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("Starting exporter with config: {:?}", cli.config);
            let server = ExporterServer::new(config).await?;

            server
                .run_until(async {
                    if let Err(error) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", error);
                        std::future::pending::<()>().await;
                    }
                    info!("Received shutdown signal, stopping exporter...");
                })
                .await
        }
        Commands::ShowConfig => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Commands::Stats { json } => {
            let metrics = ExporterMetrics::new(&Registry::new())?;
            let poller =
                Poller::from_config(Arc::new(config), Arc::new(StatsChannel::new()), metrics)
                    .await?;
            let stats = poller.compute().await?;
            let sorted: BTreeMap<_, _> = stats.iter().collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&sorted)?);
                return Ok(());
            }

            if sorted.is_empty() {
                println!("No pools found.");
                return Ok(());
            }

            println!(
                "{:<20} {:<20} {:<16} {:>10} {:>10} {:>8}",
                "Pool", "Alias", "Router", "Total", "Reserved", "Usage"
            );
            println!("{}", "-".repeat(89));

            for (name, pool) in sorted {
                println!(
                    "{:<20} {:<20} {:<16} {:>10} {:>10} {:>7.2}%",
                    name, pool.alias, pool.router, pool.total, pool.reserved, pool.percentage
                );
            }

            Ok(())
        }
    }
}
