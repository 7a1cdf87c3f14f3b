//! seat_collector - receive seat status datagrams
//!
//! Listens for "<seat_id>:<code>" datagrams from seat monitors, keeps a
//! bounded seat table and logs it periodically. Runs until Ctrl-C.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use seatwatch::config::CollectorConfig;
use seatwatch::Collector;

#[derive(Parser, Debug)]
#[command(author, version, about = "Collect seat status reports over UDP")]
struct Args {
    /// Seconds between seat table log lines.
    #[arg(long, env = "SEAT_COLLECTOR_TABLE_SECS", default_value = "10")]
    table_secs: u64,

    /// Receive poll timeout in milliseconds.
    #[arg(long, default_value = "100")]
    poll_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = CollectorConfig::load()?;
    let mut collector = Collector::bind(&config, Duration::from_millis(args.poll_ms.max(1)))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let table_every = Duration::from_secs(args.table_secs.max(1));
    let mut last_table_log = Instant::now();

    log::info!("seat_collector running, waiting for status datagrams (Ctrl-C to stop)");
    while !shutdown.load(Ordering::Relaxed) {
        if let Err(err) = collector.poll_once() {
            log::error!("{:#}", err);
            std::thread::sleep(Duration::from_millis(500));
        }

        if last_table_log.elapsed() >= table_every {
            collector.log_table(config.stale_after);
            last_table_log = Instant::now();
        }
    }

    log::info!("shutdown signal received");
    collector.log_table(config.stale_after);
    Ok(())
}
