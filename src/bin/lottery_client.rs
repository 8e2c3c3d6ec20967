//! Lottery client binary
//!
//! Reads bet lines from a CSV file, submits them in bounded batches, then
//! polls the service for the draw results. Ctrl-C requests a cooperative
//! shutdown: the run stops at the next check point without sending again.
//!
//! Usage:
//!   cargo run --bin lottery_client -- --agency-id 1 --file agency.csv

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lottery_protocol::{Client, ClientConfig, ClientOutcome};
use tokio::sync::watch;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "lottery_client")]
#[command(about = "Bet submission client for the lottery aggregation service")]
struct Args {
    /// Agency identifier
    #[arg(short, long)]
    agency_id: String,

    /// Address of the aggregation service
    #[arg(short, long, default_value = "127.0.0.1:12345")]
    server: String,

    /// CSV file with one bet per line
    #[arg(short, long, default_value = "agency.csv")]
    file: String,

    /// Maximum bets per batch
    #[arg(long, default_value_t = 100)]
    batch_max_amount: usize,

    /// Pause between batches, in milliseconds
    #[arg(long, default_value_t = 1000)]
    loop_period_ms: u64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let file = File::open(&args.file)
        .with_context(|| format!("failed to open bet file {}", args.file))?;
    let mut lines = BufReader::new(file).lines();

    let config = ClientConfig {
        agency_id: args.agency_id.clone(),
        server_address: args.server,
        loop_period: Duration::from_millis(args.loop_period_ms),
        batch_max_amount: args.batch_max_amount,
        ..ClientConfig::default()
    };

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, requesting shutdown");
            let _ = cancel_tx.send(true);
        }
    });

    info!("Starting lottery client for agency {}", args.agency_id);
    let client = Client::new(config);
    match client.run(&mut lines, &mut cancel_rx).await {
        Ok(ClientOutcome::Winners(winners)) => {
            info!("Client finished: {} winners", winners.len());
            for winner in winners {
                println!("{}", winner);
            }
            Ok(())
        }
        Ok(ClientOutcome::Cancelled) => {
            info!("Client stopped by shutdown request");
            Ok(())
        }
        Err(e) => {
            error!("Client failed: {}", e);
            Err(e.into())
        }
    }
}
