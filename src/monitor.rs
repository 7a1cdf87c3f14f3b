//! The seat monitor loop.
//!
//! One iteration: capture and detect, reduce to frame flags, fold into the
//! window, and when the window is due classify it and send the status.
//! Everything runs on the caller's thread; the aggregator is owned here and
//! never shared.
//!
//! Failure handling is split by stage:
//! - a detector error costs one frame (the window just does not advance)
//! - a transmit error costs one report (the next window is unaffected)
//! - startup errors are the caller's to treat as fatal (see `halt_idle`)

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::detect::{classify_frame, DetectorBackend, DetectorOutput};
use crate::status::{classify, StatusCode};
use crate::transport::{DatagramSink, StatusReporter};
use crate::window::{Clock, Tick, WindowAggregator, WindowStats};

/// Tunables for one monitored seat.
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub seat_id: String,
    pub confidence_threshold: f32,
    /// Person-positive frames per window needed for `InUse`.
    pub person_threshold: u32,
    pub window_length: Duration,
    pub check_interval: Duration,
    /// Minimum time per iteration. Zero runs as fast as the detector allows.
    pub frame_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            seat_id: "A01".to_string(),
            confidence_threshold: 0.8,
            person_threshold: 7,
            window_length: Duration::from_millis(5000),
            check_interval: Duration::from_millis(1000),
            frame_interval: Duration::ZERO,
        }
    }
}

/// What one call to `SeatMonitor::step` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Frame folded into the open window.
    Accumulated,
    /// Detector failed; the frame contributed nothing.
    DetectorFailed,
    /// A window closed and its status was handed to the reporter.
    Reported {
        status: StatusCode,
        stats: WindowStats,
        delivered: bool,
    },
    /// The detector has no more frames.
    EndOfStream,
}

/// Counters kept over the life of the loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub frames: u64,
    pub detector_failures: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
    pub last_status: Option<StatusCode>,
}

pub struct SeatMonitor<D: DetectorBackend, S: DatagramSink> {
    detector: D,
    reporter: StatusReporter<S>,
    aggregator: WindowAggregator,
    settings: MonitorSettings,
    summary: MonitorSummary,
}

impl<D: DetectorBackend, S: DatagramSink> SeatMonitor<D, S> {
    /// Build a monitor whose first window opens at `start`.
    pub fn new(
        detector: D,
        reporter: StatusReporter<S>,
        settings: MonitorSettings,
        start: Tick,
    ) -> Self {
        Self {
            detector,
            reporter,
            aggregator: WindowAggregator::new(start),
            settings,
            summary: MonitorSummary::default(),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn summary(&self) -> &MonitorSummary {
        &self.summary
    }

    /// The status sent for the most recent closed window.
    pub fn last_status(&self) -> Option<StatusCode> {
        self.summary.last_status
    }

    pub fn current_window(&self) -> &WindowStats {
        self.aggregator.current()
    }

    /// Run one iteration with `now` as the frame timestamp.
    pub fn step(&mut self, now: Tick) -> StepOutcome {
        let mut detector_failed = false;
        match self.detector.detect() {
            Ok(DetectorOutput::Frame(detections)) => {
                let flags = classify_frame(&detections, self.settings.confidence_threshold);
                self.aggregator.record(flags);
            }
            Ok(DetectorOutput::EndOfStream) => return StepOutcome::EndOfStream,
            Err(err) => {
                log::warn!("detection failed on {}: {:#}", self.detector.name(), err);
                self.summary.detector_failures += 1;
                detector_failed = true;
            }
        }
        self.summary.frames += 1;

        let Some(stats) = self.aggregator.maybe_close(
            now,
            self.settings.window_length,
            self.settings.check_interval,
        ) else {
            return if detector_failed {
                StepOutcome::DetectorFailed
            } else {
                StepOutcome::Accumulated
            };
        };

        let status = classify(&stats, self.settings.person_threshold);
        let delivered = self.reporter.report(&self.settings.seat_id, status).is_ok();
        if delivered {
            self.summary.reports_sent += 1;
        } else {
            self.summary.reports_failed += 1;
        }
        log::info!(
            "[status] seat={} code={} ({}) person={} book={} other={} table={}",
            self.settings.seat_id,
            status,
            status.description(),
            stats.person_count,
            stats.book_detected,
            stats.other_detected,
            stats.table_detected
        );
        self.summary.last_status = Some(status);

        StepOutcome::Reported {
            status,
            stats,
            delivered,
        }
    }

    /// Loop until the detector runs dry or `shutdown` is set.
    pub fn run<C: Clock>(&mut self, clock: &C, shutdown: &AtomicBool) -> MonitorSummary {
        log::info!(
            "seat monitor running: seat={} detector={} window={:?} check={:?} person_threshold={} -> {}",
            self.settings.seat_id,
            self.detector.name(),
            self.settings.window_length,
            self.settings.check_interval,
            self.settings.person_threshold,
            self.reporter.destination()
        );

        while !shutdown.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            if self.step(clock.now()) == StepOutcome::EndOfStream {
                log::info!("detector {} reached end of stream", self.detector.name());
                break;
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.settings.frame_interval {
                std::thread::sleep(self.settings.frame_interval - elapsed);
            }
        }

        log::info!(
            "seat monitor stopped: frames={} detector_failures={} sent={} failed={}",
            self.summary.frames,
            self.summary.detector_failures,
            self.summary.reports_sent,
            self.summary.reports_failed
        );
        self.summary.clone()
    }
}

/// Park the process after a fatal startup error. Never returns.
pub fn halt_idle() -> ! {
    log::error!("seat monitor halted; restart the process to retry");
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
