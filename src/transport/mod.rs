//! Status transport.
//!
//! The wire format is a single UTF-8 datagram `"<seat_id>:<digit>"`, with no
//! framing, no checksum and no acknowledgement. The reporter sends it
//! best-effort over UDP; the collector parses it back.

mod reporter;
mod wire;

pub use reporter::{DatagramSink, StatusReporter, TransmitError};
pub use wire::{parse_status_datagram, StatusMessage};
