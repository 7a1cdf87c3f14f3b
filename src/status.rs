//! Seat status codes and the window classifier.

use std::fmt;

use crate::window::WindowStats;

/// Status reported for a closed window. The wire digit is the whole vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// `1`: enough person frames in the window.
    InUse,
    /// `2`: belongings on the seat, hardly anyone sitting.
    Reserved,
    /// `3`: nothing decisive observed.
    Free,
    /// `4`: only the table was seen, no person frames at all.
    FreeNoFurniture,
}

impl StatusCode {
    pub const ALL: [StatusCode; 4] = [
        StatusCode::InUse,
        StatusCode::Reserved,
        StatusCode::Free,
        StatusCode::FreeNoFurniture,
    ];

    pub fn as_wire(self) -> &'static str {
        match self {
            StatusCode::InUse => "1",
            StatusCode::Reserved => "2",
            StatusCode::Free => "3",
            StatusCode::FreeNoFurniture => "4",
        }
    }

    pub fn from_wire(digit: &str) -> Option<Self> {
        match digit {
            "1" => Some(StatusCode::InUse),
            "2" => Some(StatusCode::Reserved),
            "3" => Some(StatusCode::Free),
            "4" => Some(StatusCode::FreeNoFurniture),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusCode::InUse => "in use",
            StatusCode::Reserved => "reserved",
            StatusCode::Free => "free",
            StatusCode::FreeNoFurniture => "free (table only)",
        }
    }

    /// Coarse state shown by the collector display.
    pub fn seat_state(self) -> SeatState {
        match self {
            StatusCode::InUse => SeatState::Occupied,
            StatusCode::Reserved => SeatState::Claimed,
            StatusCode::Free | StatusCode::FreeNoFurniture => SeatState::Available,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Seat state as kept by the collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SeatState {
    #[default]
    Available,
    Occupied,
    Claimed,
}

impl SeatState {
    pub fn as_str(self) -> &'static str {
        match self {
            SeatState::Available => "Available",
            SeatState::Occupied => "Occupied",
            SeatState::Claimed => "Claimed",
        }
    }
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a closed window. First matching rule wins:
///
/// 1. `InUse` when `person_count >= person_threshold`
/// 2. `Reserved` when `person_count < 2` and a book or other object was seen
/// 3. `FreeNoFurniture` when only the table was seen and `person_count == 0`
/// 4. `Free` otherwise
pub fn classify(stats: &WindowStats, person_threshold: u32) -> StatusCode {
    if stats.person_count >= person_threshold {
        StatusCode::InUse
    } else if stats.person_count < 2 && (stats.book_detected || stats.other_detected) {
        StatusCode::Reserved
    } else if stats.table_detected
        && !stats.book_detected
        && !stats.other_detected
        && stats.person_count == 0
    {
        StatusCode::FreeNoFurniture
    } else {
        StatusCode::Free
    }
}
