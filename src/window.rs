//! Windowed aggregation of per-frame detection flags.
//!
//! - `Tick`: 32-bit wrapping millisecond counter (the device tick clock)
//! - `WindowStats`: the accumulator for one window, a plain value
//! - `WindowAggregator`: owns the live `WindowStats` and decides when it closes
//!
//! A closing window is swapped out wholesale for a fresh record, so there is no
//! code path that can reset some counters and leave others behind.

use std::time::{Duration, Instant};

use crate::detect::FrameFlags;

// ----------------------------------------------------------------------------
// Monotonic ticks
// ----------------------------------------------------------------------------

/// Millisecond tick counter that wraps at `u32::MAX`.
///
/// Elapsed time is always computed with `wrapping_sub`, so a window that
/// straddles the rollover still measures correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tick(u32);

impl Tick {
    /// Longest span `elapsed_since` can report. Window and check spans must
    /// stay below it or the window may never be seen as due.
    pub const MAX_SPAN: Duration = Duration::from_millis(u32::MAX as u64);

    pub const fn from_millis(ms: u32) -> Self {
        Tick(ms)
    }

    pub fn as_millis(self) -> u32 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, tolerant of counter rollover.
    pub fn elapsed_since(self, earlier: Tick) -> Duration {
        Duration::from_millis(u64::from(self.0.wrapping_sub(earlier.0)))
    }

    pub fn wrapping_add(self, delta: Duration) -> Self {
        Tick(self.0.wrapping_add(delta.as_millis() as u32))
    }
}

/// Source of monotonic ticks for the monitor loop.
pub trait Clock {
    fn now(&self) -> Tick;
}

/// Tick clock backed by `Instant`, truncated to 32 bits so it wraps like the
/// hardware counter does.
pub struct MonotonicClock {
    origin: Instant,
    offset_ms: u32,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: 0,
        }
    }

    /// Start the counter at `offset_ms` instead of zero.
    pub fn starting_at(offset_ms: u32) -> Self {
        Self {
            origin: Instant::now(),
            offset_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        let elapsed_ms = self.origin.elapsed().as_millis() as u32;
        Tick(self.offset_ms.wrapping_add(elapsed_ms))
    }
}

// ----------------------------------------------------------------------------
// WindowStats
// ----------------------------------------------------------------------------

/// Statistics accumulated over one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowStats {
    /// Frames in this window with at least one confident person detection.
    pub person_count: u32,
    pub book_detected: bool,
    pub other_detected: bool,
    pub table_detected: bool,
    pub window_start: Tick,
}

impl WindowStats {
    /// An empty window opening at `start`.
    pub fn fresh(start: Tick) -> Self {
        Self {
            person_count: 0,
            book_detected: false,
            other_detected: false,
            table_detected: false,
            window_start: start,
        }
    }

    pub fn elapsed(&self, now: Tick) -> Duration {
        now.elapsed_since(self.window_start)
    }
}

// ----------------------------------------------------------------------------
// WindowAggregator
// ----------------------------------------------------------------------------

/// Owns the live window. Only `maybe_close` ever replaces it.
#[derive(Debug)]
pub struct WindowAggregator {
    stats: WindowStats,
}

impl WindowAggregator {
    pub fn new(start: Tick) -> Self {
        Self {
            stats: WindowStats::fresh(start),
        }
    }

    /// Fold one frame's flags into the open window.
    pub fn record(&mut self, flags: FrameFlags) {
        if flags.has_person {
            self.stats.person_count = self.stats.person_count.saturating_add(1);
        }
        self.stats.book_detected |= flags.has_book;
        self.stats.other_detected |= flags.has_other;
        self.stats.table_detected |= flags.has_table;
    }

    /// Close the window if it is due, returning the closed snapshot.
    ///
    /// Both conditions must hold: at least `check_interval` and at least
    /// `window_length` since the window opened. Otherwise nothing changes.
    pub fn maybe_close(
        &mut self,
        now: Tick,
        window_length: Duration,
        check_interval: Duration,
    ) -> Option<WindowStats> {
        let elapsed = self.stats.elapsed(now);
        if elapsed < check_interval || elapsed < window_length {
            return None;
        }
        Some(std::mem::replace(&mut self.stats, WindowStats::fresh(now)))
    }

    /// Read-only view of the open window.
    pub fn current(&self) -> &WindowStats {
        &self.stats
    }
}
