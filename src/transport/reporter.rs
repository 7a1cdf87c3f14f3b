use std::io;
use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;

use crate::status::StatusCode;
use crate::transport::wire::StatusMessage;

/// Why a status datagram did not go out.
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("send to {dest} failed: {source}")]
    Io {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("short send to {dest}: {sent} of {expected} bytes")]
    Truncated {
        dest: SocketAddr,
        sent: usize,
        expected: usize,
    },
}

/// Anything that can push one datagram at an address.
pub trait DatagramSink {
    fn send_datagram(&self, payload: &[u8], dest: SocketAddr) -> io::Result<usize>;
}

impl DatagramSink for UdpSocket {
    fn send_datagram(&self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.send_to(payload, dest)
    }
}

/// Fire-and-forget status sender. No retries, no acknowledgement.
pub struct StatusReporter<S: DatagramSink = UdpSocket> {
    sink: S,
    destination: SocketAddr,
}

impl StatusReporter<UdpSocket> {
    /// Bind a UDP socket on `bind_addr` for sending to `destination`.
    pub fn bind(bind_addr: SocketAddr, destination: SocketAddr) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| anyhow::anyhow!("failed to bind udp sender on {}: {}", bind_addr, e))?;
        log::info!(
            "udp status sender bound to {}, target {}",
            socket.local_addr()?,
            destination
        );
        Ok(Self::with_sink(socket, destination))
    }
}

impl<S: DatagramSink> StatusReporter<S> {
    pub fn with_sink(sink: S, destination: SocketAddr) -> Self {
        Self { sink, destination }
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Send one status datagram. Logs exactly one line either way.
    pub fn report(&self, seat_id: &str, status: StatusCode) -> Result<(), TransmitError> {
        let payload = StatusMessage::new(seat_id, status).encode();
        match self.transmit(payload.as_bytes()) {
            Ok(()) => {
                log::info!(
                    "[udp] seat {} status {} -> {} ({:?})",
                    seat_id,
                    status,
                    self.destination,
                    payload
                );
                Ok(())
            }
            Err(err) => {
                log::warn!("[udp] status {:?} not delivered: {}", payload, err);
                Err(err)
            }
        }
    }

    fn transmit(&self, payload: &[u8]) -> Result<(), TransmitError> {
        let dest = self.destination;
        let sent = self
            .sink
            .send_datagram(payload, dest)
            .map_err(|source| TransmitError::Io { dest, source })?;
        if sent != payload.len() {
            return Err(TransmitError::Truncated {
                dest,
                sent,
                expected: payload.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    struct RecordingSink {
        sent: RefCell<Vec<(Vec<u8>, SocketAddr)>>,
        result: fn(usize) -> io::Result<usize>,
    }

    impl DatagramSink for RecordingSink {
        fn send_datagram(&self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
            self.sent.borrow_mut().push((payload.to_vec(), dest));
            (self.result)(payload.len())
        }
    }

    fn dest() -> SocketAddr {
        "192.168.80.2:8080".parse().unwrap()
    }

    #[test]
    fn sends_encoded_payload_to_destination() {
        let sink = RecordingSink {
            sent: RefCell::new(Vec::new()),
            result: Ok,
        };
        let reporter = StatusReporter::with_sink(sink, dest());
        reporter.report("A01", StatusCode::Reserved).unwrap();

        let sent = reporter.sink.sent.borrow();
        assert_eq!(sent.as_slice(), &[(b"A01:2".to_vec(), dest())]);
    }

    #[test]
    fn io_failure_is_reported_not_retried() {
        let sink = RecordingSink {
            sent: RefCell::new(Vec::new()),
            result: |_| Err(io::Error::new(io::ErrorKind::NetworkUnreachable, "no route")),
        };
        let reporter = StatusReporter::with_sink(sink, dest());
        let err = reporter.report("A01", StatusCode::InUse).unwrap_err();
        assert!(matches!(err, TransmitError::Io { .. }));
        assert!(err.to_string().contains("192.168.80.2:8080"));
        assert_eq!(reporter.sink.sent.borrow().len(), 1);
    }

    #[test]
    fn short_send_is_an_error() {
        let sink = RecordingSink {
            sent: RefCell::new(Vec::new()),
            result: |len| Ok(len - 1),
        };
        let reporter = StatusReporter::with_sink(sink, dest());
        let err = reporter.report("A01", StatusCode::Free).unwrap_err();
        assert!(matches!(
            err,
            TransmitError::Truncated {
                sent: 4,
                expected: 5,
                ..
            }
        ));
    }

    #[test]
    fn udp_reporter_delivers_over_loopback() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let reporter = StatusReporter::bind(
            "127.0.0.1:0".parse().unwrap(),
            receiver.local_addr().unwrap(),
        )
        .unwrap();

        reporter.report("A01", StatusCode::FreeNoFurniture).unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"A01:4");
    }
}
