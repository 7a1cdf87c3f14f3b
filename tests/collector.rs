use std::net::UdpSocket;
use std::time::Duration;

use seatwatch::config::CollectorConfig;
use seatwatch::{Collector, PollOutcome, SeatState, StatusCode, StatusReporter};

fn config(allowed_sender: Option<&str>, max_seats: usize) -> CollectorConfig {
    CollectorConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        allowed_sender: allowed_sender.map(|ip| ip.parse().unwrap()),
        max_seats,
        stale_after: Duration::from_secs(30),
    }
}

fn bind(config: &CollectorConfig) -> Collector {
    Collector::bind(config, Duration::from_millis(500)).expect("bind collector")
}

/// Poll until something other than `Idle` shows up.
fn next_event(collector: &mut Collector) -> PollOutcome {
    for _ in 0..10 {
        match collector.poll_once().expect("poll") {
            PollOutcome::Idle => continue,
            other => return other,
        }
    }
    panic!("no datagram received");
}

#[test]
fn reporter_datagrams_update_the_seat_table() {
    let mut collector = bind(&config(None, 2));
    let reporter = StatusReporter::bind(
        "127.0.0.1:0".parse().unwrap(),
        collector.local_addr().unwrap(),
    )
    .unwrap();

    reporter.report("A01", StatusCode::Reserved).unwrap();
    assert_eq!(
        next_event(&mut collector),
        PollOutcome::Updated {
            seat_id: "A01".into(),
            state: SeatState::Claimed,
        }
    );

    reporter.report("A01", StatusCode::FreeNoFurniture).unwrap();
    assert_eq!(
        next_event(&mut collector),
        PollOutcome::Updated {
            seat_id: "A01".into(),
            state: SeatState::Available,
        }
    );

    let seat = collector.registry().get("A01").expect("seat A01");
    assert_eq!(seat.last_status, StatusCode::FreeNoFurniture);
    assert_eq!(collector.registry().len(), 1);
}

#[test]
fn malformed_datagrams_are_rejected_and_loop_continues() {
    let mut collector = bind(&config(None, 2));
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let dest = collector.local_addr().unwrap();

    sender.send_to(b"A01:9", dest).unwrap();
    assert!(matches!(
        next_event(&mut collector),
        PollOutcome::Rejected { .. }
    ));

    sender.send_to(b"garbage", dest).unwrap();
    assert!(matches!(
        next_event(&mut collector),
        PollOutcome::Rejected { .. }
    ));

    sender.send_to(b"A02:1", dest).unwrap();
    assert_eq!(
        next_event(&mut collector),
        PollOutcome::Updated {
            seat_id: "A02".into(),
            state: SeatState::Occupied,
        }
    );
    assert!(collector.registry().get("A01").is_none());
}

#[test]
fn oversized_datagram_is_rejected_even_with_valid_prefix() {
    let mut collector = bind(&config(None, 2));
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let dest = collector.local_addr().unwrap();

    let mut payload = b"A01:1".to_vec();
    payload.extend(std::iter::repeat(b' ').take(200));
    payload.extend_from_slice(b"junk");
    sender.send_to(&payload, dest).unwrap();

    match next_event(&mut collector) {
        PollOutcome::Rejected { reason, .. } => assert!(reason.contains("exceeds")),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(collector.registry().is_empty());

    // longest valid id with a trailing newline still fits
    sender.send_to(b"ABCDEFGHIJKLMNOP:2\n", dest).unwrap();
    assert_eq!(
        next_event(&mut collector),
        PollOutcome::Updated {
            seat_id: "ABCDEFGHIJKLMNOP".into(),
            state: SeatState::Claimed,
        }
    );
}

#[test]
fn sender_filter_ignores_other_hosts() {
    let mut collector = bind(&config(Some("10.255.255.1"), 2));
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender
        .send_to(b"A01:1", collector.local_addr().unwrap())
        .unwrap();

    assert!(matches!(
        next_event(&mut collector),
        PollOutcome::IgnoredSender(_)
    ));
    assert!(collector.registry().is_empty());
}

#[test]
fn full_table_rejects_new_seats() {
    let mut collector = bind(&config(None, 1));
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    let dest = collector.local_addr().unwrap();

    sender.send_to(b"A01:3", dest).unwrap();
    assert!(matches!(
        next_event(&mut collector),
        PollOutcome::Updated { .. }
    ));

    sender.send_to(b"A02:3", dest).unwrap();
    match next_event(&mut collector) {
        PollOutcome::Rejected { reason, .. } => assert!(reason.contains("seat table full")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn idle_poll_times_out() {
    let mut collector =
        Collector::bind(&config(None, 2), Duration::from_millis(20)).expect("bind collector");
    assert_eq!(collector.poll_once().unwrap(), PollOutcome::Idle);
}
