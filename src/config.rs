use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorSettings;
use crate::window::Tick;

const DEFAULT_SEAT_ID: &str = "A01";
const DEFAULT_DEST_ADDR: &str = "192.168.80.2:8080";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:0";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;
const DEFAULT_WINDOW_MS: u64 = 5000;
const DEFAULT_PERSON_THRESHOLD: u32 = 7;
const DEFAULT_CHECK_INTERVAL_MS: u64 = 1000;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 0;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_SEATS: usize = 2;
const DEFAULT_STALE_SECS: u64 = 30;

#[derive(Debug, Deserialize, Default)]
struct SeatwatchConfigFile {
    seat_id: Option<String>,
    model_path: Option<PathBuf>,
    udp: Option<UdpConfigFile>,
    detection: Option<DetectionConfigFile>,
    window: Option<WindowConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct UdpConfigFile {
    dest_addr: Option<String>,
    bind_addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    frame_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct WindowConfigFile {
    length_ms: Option<u64>,
    check_interval_ms: Option<u64>,
    person_threshold: Option<u32>,
}

/// Monitor daemon configuration.
#[derive(Debug, Clone)]
pub struct SeatwatchConfig {
    pub seat_id: String,
    /// Model file that must exist before the loop starts. `None` skips the check.
    pub model_path: Option<PathBuf>,
    pub dest_addr: SocketAddr,
    pub bind_addr: SocketAddr,
    pub confidence_threshold: f32,
    pub frame_interval: Duration,
    pub window_length: Duration,
    pub check_interval: Duration,
    pub person_threshold: u32,
}

impl SeatwatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SEATWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SeatwatchConfigFile) -> Result<Self> {
        let seat_id = file.seat_id.unwrap_or_else(|| DEFAULT_SEAT_ID.to_string());
        let model_path = file.model_path.filter(|p| !p.as_os_str().is_empty());
        let dest_addr = parse_socket_addr(
            "udp.dest_addr",
            file.udp
                .as_ref()
                .and_then(|udp| udp.dest_addr.as_deref())
                .unwrap_or(DEFAULT_DEST_ADDR),
        )?;
        let bind_addr = parse_socket_addr(
            "udp.bind_addr",
            file.udp
                .as_ref()
                .and_then(|udp| udp.bind_addr.as_deref())
                .unwrap_or(DEFAULT_BIND_ADDR),
        )?;
        let confidence_threshold = file
            .detection
            .as_ref()
            .and_then(|d| d.confidence_threshold)
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        let frame_interval = Duration::from_millis(
            file.detection
                .as_ref()
                .and_then(|d| d.frame_interval_ms)
                .unwrap_or(DEFAULT_FRAME_INTERVAL_MS),
        );
        let window_length = Duration::from_millis(
            file.window
                .as_ref()
                .and_then(|w| w.length_ms)
                .unwrap_or(DEFAULT_WINDOW_MS),
        );
        let check_interval = Duration::from_millis(
            file.window
                .as_ref()
                .and_then(|w| w.check_interval_ms)
                .unwrap_or(DEFAULT_CHECK_INTERVAL_MS),
        );
        let person_threshold = file
            .window
            .and_then(|w| w.person_threshold)
            .unwrap_or(DEFAULT_PERSON_THRESHOLD);
        Ok(Self {
            seat_id,
            model_path,
            dest_addr,
            bind_addr,
            confidence_threshold,
            frame_interval,
            window_length,
            check_interval,
            person_threshold,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(seat_id) = env_nonempty("SEATWATCH_SEAT_ID") {
            self.seat_id = seat_id;
        }
        if let Some(path) = env_nonempty("SEATWATCH_MODEL_PATH") {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = env_nonempty("SEATWATCH_DEST_ADDR") {
            self.dest_addr = parse_socket_addr("SEATWATCH_DEST_ADDR", &addr)?;
        }
        if let Some(addr) = env_nonempty("SEATWATCH_BIND_ADDR") {
            self.bind_addr = parse_socket_addr("SEATWATCH_BIND_ADDR", &addr)?;
        }
        if let Some(threshold) = env_nonempty("SEATWATCH_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = threshold.parse().map_err(|_| {
                anyhow!("SEATWATCH_CONFIDENCE_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        if let Some(ms) = env_nonempty("SEATWATCH_FRAME_INTERVAL_MS") {
            self.frame_interval = parse_millis("SEATWATCH_FRAME_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = env_nonempty("SEATWATCH_WINDOW_MS") {
            self.window_length = parse_millis("SEATWATCH_WINDOW_MS", &ms)?;
        }
        if let Some(ms) = env_nonempty("SEATWATCH_CHECK_INTERVAL_MS") {
            self.check_interval = parse_millis("SEATWATCH_CHECK_INTERVAL_MS", &ms)?;
        }
        if let Some(count) = env_nonempty("SEATWATCH_PERSON_THRESHOLD") {
            self.person_threshold = count.parse().map_err(|_| {
                anyhow!("SEATWATCH_PERSON_THRESHOLD must be a positive integer frame count")
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        crate::validate_seat_id(&self.seat_id)?;
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(anyhow!(
                "confidence_threshold must be in (0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if self.window_length.is_zero() {
            return Err(anyhow!("window length must be greater than zero"));
        }
        if self.check_interval.is_zero() {
            return Err(anyhow!("check interval must be greater than zero"));
        }
        for (name, span) in [
            ("window length", self.window_length),
            ("check interval", self.check_interval),
        ] {
            if span >= Tick::MAX_SPAN {
                return Err(anyhow!(
                    "{} {:?} must be below the tick range {:?}",
                    name,
                    span,
                    Tick::MAX_SPAN
                ));
            }
        }
        if self.person_threshold == 0 {
            return Err(anyhow!("person_threshold must be greater than zero"));
        }
        if self.check_interval > self.window_length {
            log::warn!(
                "check interval {:?} exceeds window length {:?}; windows close every {:?}",
                self.check_interval,
                self.window_length,
                self.check_interval
            );
        }
        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            seat_id: self.seat_id.clone(),
            confidence_threshold: self.confidence_threshold,
            person_threshold: self.person_threshold,
            window_length: self.window_length,
            check_interval: self.check_interval,
            frame_interval: self.frame_interval,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct CollectorConfigFile {
    listen_addr: Option<String>,
    allowed_sender: Option<String>,
    max_seats: Option<usize>,
    stale_after_secs: Option<u64>,
}

/// Collector daemon configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub listen_addr: SocketAddr,
    /// Only datagrams from this address are applied. `None` accepts any sender.
    pub allowed_sender: Option<IpAddr>,
    pub max_seats: usize,
    /// Seats without a report for this long are flagged stale in the table log.
    pub stale_after: Duration,
}

impl CollectorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SEAT_COLLECTOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CollectorConfigFile) -> Result<Self> {
        let listen_addr = parse_socket_addr(
            "listen_addr",
            file.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR),
        )?;
        let allowed_sender = file
            .allowed_sender
            .as_deref()
            .map(|ip| parse_ip("allowed_sender", ip))
            .transpose()?;
        Ok(Self {
            listen_addr,
            allowed_sender,
            max_seats: file.max_seats.unwrap_or(DEFAULT_MAX_SEATS),
            stale_after: Duration::from_secs(file.stale_after_secs.unwrap_or(DEFAULT_STALE_SECS)),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = env_nonempty("SEAT_COLLECTOR_LISTEN_ADDR") {
            self.listen_addr = parse_socket_addr("SEAT_COLLECTOR_LISTEN_ADDR", &addr)?;
        }
        if let Some(ip) = env_nonempty("SEAT_COLLECTOR_ALLOWED_SENDER") {
            self.allowed_sender = Some(parse_ip("SEAT_COLLECTOR_ALLOWED_SENDER", &ip)?);
        }
        if let Some(max) = env_nonempty("SEAT_COLLECTOR_MAX_SEATS") {
            self.max_seats = max
                .parse()
                .map_err(|_| anyhow!("SEAT_COLLECTOR_MAX_SEATS must be an integer"))?;
        }
        if let Some(secs) = env_nonempty("SEAT_COLLECTOR_STALE_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                anyhow!("SEAT_COLLECTOR_STALE_SECS must be an integer number of seconds")
            })?;
            self.stale_after = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_seats == 0 {
            return Err(anyhow!("max_seats must be greater than zero"));
        }
        if self.stale_after.is_zero() {
            return Err(anyhow!("stale timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Reads a config file, TOML when the extension says so and JSON otherwise.
fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_socket_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an ip:port socket address, got {:?}", field, value))
}

fn parse_ip(field: &str, value: &str) -> Result<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an ip address, got {:?}", field, value))
}

fn parse_millis(field: &str, value: &str) -> Result<Duration> {
    let ms: u64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an integer number of milliseconds", field))?;
    Ok(Duration::from_millis(ms))
}
