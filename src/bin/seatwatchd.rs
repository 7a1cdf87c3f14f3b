//! seatwatchd - seat occupancy monitor
//!
//! This daemon:
//! 1. Loads configuration (SEATWATCH_CONFIG file + SEATWATCH_* env)
//! 2. Checks the model artifact and warms up the detector
//! 3. Reduces each frame's detections to presence flags
//! 4. Aggregates flags over a window and classifies the seat status
//! 5. Sends "<seat_id>:<code>" to the collector over UDP once per window
//!
//! Any startup failure parks the process in an idle wait; nothing retries.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, BufReader};
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use seatwatch::config::SeatwatchConfig;
use seatwatch::detect::require_model_artifact;
use seatwatch::{
    halt_idle, Clock, DetectorBackend, MonotonicClock, ReplayBackend, SeatMonitor,
    StatusReporter, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify seat occupancy and report it over UDP")]
struct Args {
    /// Replay detections from a JSON-lines file ("-" reads stdin).
    #[arg(long, env = "SEATWATCH_REPLAY")]
    replay: Option<PathBuf>,

    /// Stop the idle stub detector after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let clock = MonotonicClock::new();
    let mut monitor = match start(&args, &clock) {
        Ok(monitor) => monitor,
        Err(err) => {
            log::error!("startup failed: {:#}", err);
            halt_idle();
        }
    };

    log::info!("===== seatwatchd {} started =====", env!("CARGO_PKG_VERSION"));
    let summary = monitor.run(&clock, &shutdown);
    if let Some(status) = summary.last_status {
        log::info!("last reported status: {} ({})", status, status.description());
    }
    Ok(())
}

fn start(
    args: &Args,
    clock: &MonotonicClock,
) -> Result<SeatMonitor<Box<dyn DetectorBackend>, UdpSocket>> {
    let cfg = SeatwatchConfig::load().context("invalid configuration")?;

    if let Some(model_path) = &cfg.model_path {
        require_model_artifact(model_path)?;
        log::info!("model artifact present: {}", model_path.display());
    }

    let mut detector: Box<dyn DetectorBackend> = match &args.replay {
        Some(path) => {
            let (reader, source): (Box<dyn BufRead>, String) = if path.as_os_str() == "-" {
                (Box::new(BufReader::new(io::stdin())), "stdin".to_string())
            } else {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("failed to open replay {}", path.display()))?;
                (Box::new(BufReader::new(file)), path.display().to_string())
            };
            Box::new(ReplayBackend::new(reader, source))
        }
        None => match args.frames {
            Some(frames) => Box::new(StubBackend::with_frame_limit(frames)),
            None => Box::new(StubBackend::new()),
        },
    };
    detector
        .warm_up()
        .with_context(|| format!("detector {} failed to warm up", detector.name()))?;

    let reporter = StatusReporter::bind(cfg.bind_addr, cfg.dest_addr)?;

    Ok(SeatMonitor::new(
        detector,
        reporter,
        cfg.monitor_settings(),
        clock.now(),
    ))
}
