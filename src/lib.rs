//! Seat occupancy witness.
//!
//! A fixed camera watches one seat. Every frame the detector output is reduced
//! to a handful of presence flags, the flags are folded into a rolling window,
//! and when the window closes a single status code is classified and sent to a
//! remote collector as a UDP datagram (`"A01:1"`).
//!
//! # Module Structure
//!
//! - `detect`: Detection types, detector backends, per-frame classification
//! - `window`: Monotonic ticks and the windowed aggregator
//! - `status`: Status codes and the window classifier
//! - `transport`: Wire format and the status reporter
//! - `monitor`: The capture/classify/report loop
//! - `collector`: Receiving side, seat registry fed by status datagrams
//! - `config`: File and environment configuration

use anyhow::{anyhow, Result};
use std::sync::OnceLock;

pub mod collector;
pub mod config;
pub mod detect;
pub mod monitor;
pub mod status;
pub mod transport;
pub mod window;

pub use collector::{Collector, PollOutcome, SeatEntry, SeatRegistry};
pub use detect::{
    classify_frame, BoundingBox, DetectionEvent, DetectorBackend, DetectorOutput,
    FrameDetections, FrameFlags, ReplayBackend, ScriptedBackend, SeatClass, StubBackend,
};
pub use monitor::{halt_idle, MonitorSettings, MonitorSummary, SeatMonitor, StepOutcome};
pub use status::{classify, SeatState, StatusCode};
pub use transport::{DatagramSink, StatusMessage, StatusReporter, TransmitError};
pub use window::{Clock, MonotonicClock, Tick, WindowAggregator, WindowStats};

/// A seat id is sent verbatim ahead of the `:` separator, so it is restricted
/// to a short run of ASCII letters, digits, `_` and `-`.
///
/// Allowed: "A01", "hall-2_b17"
/// Disallowed: "", "A:01", "A 01", anything longer than 16 characters.
pub fn validate_seat_id(seat_id: &str) -> Result<()> {
    static SEAT_ID_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = SEAT_ID_RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9_-]{1,16}$").unwrap());

    if !re.is_match(seat_id) {
        return Err(anyhow!(
            "seat_id must match ^[A-Za-z0-9_-]{{1,16}}$ (got {:?})",
            seat_id
        ));
    }
    Ok(())
}
