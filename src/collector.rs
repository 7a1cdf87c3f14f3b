//! Receiving side of the status protocol.
//!
//! `SeatRegistry` is a small fixed-capacity seat table. `Collector` binds the
//! UDP port the monitors report to, filters senders, parses datagrams and
//! feeds the registry. Malformed input is logged and dropped; nothing a sender
//! does can stop the receive loop.

use anyhow::{anyhow, Result};
use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crate::config::CollectorConfig;
use crate::status::{SeatState, StatusCode};
use crate::transport::{parse_status_datagram, StatusMessage};

/// Largest datagram accepted: a 16 character seat id, `:`, the digit and
/// some trailing whitespace. Anything longer is rejected unparsed.
const MAX_DATAGRAM_BYTES: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatEntry {
    pub seat_id: String,
    pub state: SeatState,
    pub last_status: StatusCode,
    pub updated_at: Instant,
}

impl SeatEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }

    /// No report for longer than `timeout`.
    pub fn is_stale(&self, timeout: Duration, now: Instant) -> bool {
        self.age(now) > timeout
    }
}

pub struct SeatRegistry {
    seats: Vec<SeatEntry>,
    capacity: usize,
}

impl SeatRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Update a known seat or add a new one. Fails only when the table is full.
    pub fn apply(&mut self, message: &StatusMessage, at: Instant) -> Result<&SeatEntry> {
        let state = message.status.seat_state();
        let index = match self
            .seats
            .iter()
            .position(|seat| seat.seat_id == message.seat_id)
        {
            Some(index) => {
                let seat = &mut self.seats[index];
                seat.state = state;
                seat.last_status = message.status;
                seat.updated_at = at;
                index
            }
            None => {
                if self.seats.len() >= self.capacity {
                    return Err(anyhow!(
                        "seat table full ({} seats), dropping seat {}",
                        self.capacity,
                        message.seat_id
                    ));
                }
                self.seats.push(SeatEntry {
                    seat_id: message.seat_id.clone(),
                    state,
                    last_status: message.status,
                    updated_at: at,
                });
                self.seats.len() - 1
            }
        };
        Ok(&self.seats[index])
    }

    pub fn get(&self, seat_id: &str) -> Option<&SeatEntry> {
        self.seats.iter().find(|seat| seat.seat_id == seat_id)
    }

    /// Seats in the order they were first reported.
    pub fn snapshot(&self) -> &[SeatEntry] {
        &self.seats
    }

    pub fn is_stale(&self, seat_id: &str, timeout: Duration, now: Instant) -> bool {
        self.get(seat_id)
            .map_or(true, |seat| seat.is_stale(timeout, now))
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// Result of one receive attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing arrived before the read timeout.
    Idle,
    Updated {
        seat_id: String,
        state: SeatState,
    },
    IgnoredSender(SocketAddr),
    Rejected {
        from: SocketAddr,
        reason: String,
    },
}

pub struct Collector {
    socket: UdpSocket,
    allowed_sender: Option<IpAddr>,
    registry: SeatRegistry,
}

impl Collector {
    pub fn bind(config: &CollectorConfig, poll_timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(config.listen_addr)
            .map_err(|e| anyhow!("failed to bind collector on {}: {}", config.listen_addr, e))?;
        socket.set_read_timeout(Some(poll_timeout))?;
        log::info!(
            "seat collector listening on {} (sender filter: {})",
            socket.local_addr()?,
            config
                .allowed_sender
                .map_or_else(|| "any".to_string(), |ip| ip.to_string())
        );
        Ok(Self {
            socket,
            allowed_sender: config.allowed_sender,
            registry: SeatRegistry::new(config.max_seats),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn registry(&self) -> &SeatRegistry {
        &self.registry
    }

    /// Wait up to the poll timeout for one datagram and apply it.
    ///
    /// Socket errors other than a timeout are returned; bad datagrams are not.
    pub fn poll_once(&mut self) -> Result<PollOutcome> {
        // one spare byte so an oversized (and kernel-truncated) datagram shows up
        let mut buf = [0u8; MAX_DATAGRAM_BYTES + 1];
        let (len, from) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(PollOutcome::Idle);
            }
            Err(e) => return Err(anyhow!("collector receive failed: {}", e)),
        };

        if let Some(allowed) = self.allowed_sender {
            if from.ip() != allowed {
                log::debug!("ignoring datagram from unexpected sender {}", from);
                return Ok(PollOutcome::IgnoredSender(from));
            }
        }

        if len > MAX_DATAGRAM_BYTES {
            let reason = format!(
                "datagram exceeds {} bytes, dropped unparsed",
                MAX_DATAGRAM_BYTES
            );
            log::warn!("rejected datagram from {}: {}", from, reason);
            return Ok(PollOutcome::Rejected { from, reason });
        }

        let message = match parse_status_datagram(&buf[..len]) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("rejected datagram from {}: {}", from, err);
                return Ok(PollOutcome::Rejected {
                    from,
                    reason: err.to_string(),
                });
            }
        };

        match self.registry.apply(&message, Instant::now()) {
            Ok(seat) => {
                log::info!(
                    "seat {} -> {} (code {}) from {}",
                    seat.seat_id,
                    seat.state,
                    seat.last_status,
                    from
                );
                Ok(PollOutcome::Updated {
                    seat_id: seat.seat_id.clone(),
                    state: seat.state,
                })
            }
            Err(err) => {
                log::warn!("{}", err);
                Ok(PollOutcome::Rejected {
                    from,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Log the seat table, flagging seats that have gone quiet.
    pub fn log_table(&self, stale_after: Duration) {
        let now = Instant::now();
        log::info!("=== seat table ({} seats) ===", self.registry.len());
        for seat in self.registry.snapshot() {
            log::info!(
                "seat {}: {:<9} code={} updated {}s ago{}",
                seat.seat_id,
                seat.state.as_str(),
                seat.last_status,
                seat.age(now).as_secs(),
                if seat.is_stale(stale_after, now) {
                    " (stale)"
                } else {
                    ""
                }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_updates_in_place_and_keeps_order() {
        let mut registry = SeatRegistry::new(2);
        let t0 = Instant::now();
        registry
            .apply(&StatusMessage::new("A01", StatusCode::InUse), t0)
            .unwrap();
        registry
            .apply(&StatusMessage::new("A02", StatusCode::Reserved), t0)
            .unwrap();
        let updated = registry
            .apply(&StatusMessage::new("A01", StatusCode::FreeNoFurniture), t0)
            .unwrap();
        assert_eq!(updated.state, SeatState::Available);
        assert_eq!(updated.last_status, StatusCode::FreeNoFurniture);

        let ids: Vec<_> = registry.snapshot().iter().map(|s| s.seat_id.as_str()).collect();
        assert_eq!(ids, ["A01", "A02"]);
        assert_eq!(registry.get("A02").unwrap().state, SeatState::Claimed);
    }

    #[test]
    fn registry_rejects_new_seats_when_full() {
        let mut registry = SeatRegistry::new(1);
        let now = Instant::now();
        registry
            .apply(&StatusMessage::new("A01", StatusCode::Free), now)
            .unwrap();
        let err = registry
            .apply(&StatusMessage::new("A02", StatusCode::Free), now)
            .unwrap_err();
        assert!(err.to_string().contains("seat table full"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn staleness_uses_update_time() {
        let mut registry = SeatRegistry::new(2);
        let t0 = Instant::now();
        registry
            .apply(&StatusMessage::new("A01", StatusCode::InUse), t0)
            .unwrap();
        let timeout = Duration::from_secs(30);
        assert!(!registry.is_stale("A01", timeout, t0 + Duration::from_secs(10)));
        assert!(registry.is_stale("A01", timeout, t0 + Duration::from_secs(31)));
        assert!(registry.is_stale("B07", timeout, t0));

        let seat = registry.get("A01").unwrap();
        assert_eq!(seat.age(t0 + Duration::from_secs(5)), Duration::from_secs(5));
        assert!(!seat.is_stale(timeout, t0 + timeout));
        assert!(seat.is_stale(timeout, t0 + timeout + Duration::from_millis(1)));
    }
}
