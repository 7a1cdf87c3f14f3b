use anyhow::{anyhow, Result};

use crate::status::StatusCode;
use crate::validate_seat_id;

/// One status report, built fresh for each closed window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub seat_id: String,
    pub status: StatusCode,
}

impl StatusMessage {
    pub fn new(seat_id: impl Into<String>, status: StatusCode) -> Self {
        Self {
            seat_id: seat_id.into(),
            status,
        }
    }

    /// Wire payload, e.g. `"A01:1"`.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.seat_id, self.status.as_wire())
    }
}

/// Parse a status datagram.
///
/// Rejects non-UTF-8 payloads, anything without exactly one `:`, seat ids that
/// fail validation and status digits outside `1..=4`. Surrounding whitespace
/// (a trailing newline from `nc`, say) is tolerated.
pub fn parse_status_datagram(payload: &[u8]) -> Result<StatusMessage> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| anyhow!("status datagram is not utf-8: {}", e))?
        .trim();
    let (seat_id, digit) = text
        .split_once(':')
        .ok_or_else(|| anyhow!("status datagram missing ':' separator: {:?}", text))?;
    if digit.contains(':') {
        return Err(anyhow!("status datagram has extra ':' fields: {:?}", text));
    }
    validate_seat_id(seat_id)?;
    let status = StatusCode::from_wire(digit)
        .ok_or_else(|| anyhow!("unknown status code {:?} for seat {}", digit, seat_id))?;
    Ok(StatusMessage::new(seat_id, status))
}
