//! # Flow State Machine Tests
//!
//! Validates threshold construction, enqueue/dequeue accounting, the
//! stop/resume hysteresis band and release of withheld receipts.

use qflow::{
    AccountingKind, AckGate, CapacityBound, FlowError, Message, MessageId, QueueFlowLimit,
    QueuedMessage, ReceiveCompletion, ThresholdSet,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;

fn count_limit(stop: u32, resume: u32) -> QueueFlowLimit {
    QueueFlowLimit::new("orders", ThresholdSet::new(stop, resume, 0, 0), CapacityBound::default())
        .unwrap()
}

fn message(position: u64, size: u64) -> (QueuedMessage, ReceiveCompletion) {
    let completion = ReceiveCompletion::new();
    let payload = Arc::new(Message::new(size, completion.clone()));
    (QueuedMessage::new(position, payload), completion)
}

/// Gate that records the order in which receipts are released.
struct Tagged {
    tag: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl AckGate for Tagged {
    fn withhold(&self) {}

    fn release(&self) {
        self.log.lock().unwrap().push(self.tag);
    }
}

/// Every consistent threshold set constructs and starts open.
#[test]
fn test_valid_thresholds_start_open() {
    let t = Instant::now();

    for (sc, rc, ss, rs) in [(0, 0, 0, 0), (10, 5, 0, 0), (10, 10, 100, 100), (0, 0, 100, 1), (1, 0, 1, 0)] {
        let limit = QueueFlowLimit::new("q", ThresholdSet::new(sc, rc, ss, rs), CapacityBound::default())
            .unwrap_or_else(|e| panic!("({sc},{rc},{ss},{rs}) rejected: {e}"));
        assert!(!limit.is_flow_control_active());
        assert_eq!(limit.count(), 0);
        assert_eq!(limit.size(), 0);
    }

    println!("test_valid_thresholds_start_open: Testing Overhead = {:?}", t.elapsed());
}

/// Resume above stop on either axis is a configuration error.
#[test]
fn test_resume_above_stop_fails() {
    for thresholds in [ThresholdSet::new(5, 6, 0, 0), ThresholdSet::new(0, 0, 5, 6)] {
        let err = QueueFlowLimit::new("q", thresholds, CapacityBound::default()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfiguration { .. }), "{err}");
    }
}

/// stop=10/resume=5: activates on the 11th enqueue, holds at 5, resumes at 4.
#[test]
fn test_hysteresis_band() {
    let t = Instant::now();

    let limit = count_limit(10, 5);
    let msgs: Vec<_> = (0..11).map(|i| message(i, 100)).collect();

    for (i, (m, _)) in msgs.iter().enumerate() {
        limit.enqueued(m);
        assert_eq!(limit.is_flow_control_active(), i == 10, "after enqueue #{}", i + 1);
    }

    // 11 -> 5 messages: still flow controlled.
    for (m, _) in &msgs[..6] {
        limit.dequeued(m).unwrap();
    }
    assert_eq!(limit.count(), 5);
    assert!(limit.is_flow_control_active());

    // 5 -> 4: resumes.
    limit.dequeued(&msgs[6].0).unwrap();
    assert_eq!(limit.count(), 4);
    assert!(!limit.is_flow_control_active());

    // The 11th message was held and is released by the resume.
    assert!(msgs[10].1.is_complete());
    assert_eq!(limit.pending_acks(), 0);

    println!("test_hysteresis_band: Testing Overhead = {:?}", t.elapsed());
}

/// Count and size always mirror the enqueue/dequeue history.
#[test]
fn test_accounting_tracks_history() {
    let limit = count_limit(0, 0);
    let sizes = [7u64, 0, 1024, 3, 99, 512];
    let msgs: Vec<_> = sizes.iter().enumerate().map(|(i, s)| message(i as u64, *s)).collect();

    let mut expected_count = 0u32;
    let mut expected_size = 0u64;
    for (m, _) in &msgs {
        limit.enqueued(m);
        expected_count += 1;
        expected_size += m.payload.as_ref().unwrap().content_size();
        assert_eq!((limit.count(), limit.size()), (expected_count, expected_size));
    }
    // Dequeue out of order.
    for idx in [3, 0, 5, 1, 4, 2] {
        let m = &msgs[idx].0;
        limit.dequeued(m).unwrap();
        expected_count -= 1;
        expected_size -= m.payload.as_ref().unwrap().content_size();
        assert_eq!((limit.count(), limit.size()), (expected_count, expected_size));
    }
}

/// Held messages leaving early are released one by one; the rest wait for resume.
#[test]
fn test_early_dequeues_release_individually() {
    let t = Instant::now();

    let limit = count_limit(1, 0);
    let log = Arc::new(Mutex::new(Vec::new()));
    let (trigger, _) = message(0, 1);
    limit.enqueued(&trigger);

    let held: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .enumerate()
        .map(|(i, tag)| {
            let gate = Tagged { tag, log: log.clone() };
            QueuedMessage::new(i as u64 + 1, Arc::new(Message::new(1, gate)))
        })
        .collect();
    // First of these crosses stop=1; all three are held.
    for m in &held {
        limit.enqueued(m);
    }
    assert!(limit.is_flow_control_active());
    assert_eq!(limit.pending_acks(), 3);
    assert!(log.lock().unwrap().is_empty());

    // resume_count collapses to 1: resume needs count < 1.
    limit.dequeued(&trigger).unwrap();
    limit.dequeued(&held[1]).unwrap(); // B leaves early and is released alone
    limit.dequeued(&held[2]).unwrap(); // C released alone
    assert_eq!(*log.lock().unwrap(), vec!["B", "C"]);
    limit.dequeued(&held[0]).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["B", "C", "A"]);

    println!("test_early_dequeues_release_individually: Testing Overhead = {:?}", t.elapsed());
}

/// A, B, C held until the resume, which releases them in arrival order
/// even though their ids sort the other way.
#[test]
fn test_resume_releases_all_in_arrival_order() {
    let t = Instant::now();
    let limit = count_limit(5, 4);
    let log = Arc::new(Mutex::new(Vec::new()));

    let fillers: Vec<_> = (0..5).map(|i| message(i, 1).0).collect();
    for m in &fillers {
        limit.enqueued(m);
    }
    assert!(!limit.is_flow_control_active());

    let held: Vec<_> = [("A", 300), ("B", 200), ("C", 100)]
        .into_iter()
        .enumerate()
        .map(|(i, (tag, id))| {
            let gate: Arc<dyn AckGate> = Arc::new(Tagged { tag, log: log.clone() });
            QueuedMessage::new(10 + i as u64, Arc::new(Message::with_id(MessageId(id), 1, gate)))
        })
        .collect();
    for m in &held {
        limit.enqueued(m);
    }
    assert!(limit.is_flow_control_active());
    assert_eq!(limit.pending_acks(), 3);

    // 8 -> 4: still not below resume_count=4
    for m in &fillers[..4] {
        limit.dequeued(m).unwrap();
    }
    assert!(limit.is_flow_control_active());
    assert!(log.lock().unwrap().is_empty());

    // 4 -> 3 resumes while A, B, C are all still queued
    limit.dequeued(&fillers[4]).unwrap();
    assert!(!limit.is_flow_control_active());
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
    assert_eq!(limit.pending_acks(), 0);
    assert_eq!(limit.count(), 3);

    println!("test_resume_releases_all_in_arrival_order: Testing Overhead = {:?}", t.elapsed());
}

/// Dequeuing a held message while still over threshold releases only it.
#[test]
fn test_individual_release_under_flow_control() {
    let limit = count_limit(1, 0);
    let (x, _) = message(0, 1);
    let (a, ca) = message(1, 1);
    let (b, cb) = message(2, 1);
    limit.enqueued(&x);
    limit.enqueued(&a);
    limit.enqueued(&b);
    assert_eq!((ca.outstanding(), cb.outstanding()), (1, 1));

    limit.dequeued(&a).unwrap();
    assert!(ca.is_complete());
    assert!(!cb.is_complete());
    assert!(limit.is_flow_control_active());
}

/// Dequeue on an empty limit fails and changes nothing.
#[test]
fn test_count_underflow() {
    let limit = count_limit(10, 5);
    let (m, _) = message(0, 10);

    let err = limit.dequeued(&m).unwrap_err();
    assert!(matches!(err, FlowError::Accounting { kind: AccountingKind::Count, .. }));
    assert!(err.to_string().contains("orders"));
    assert_eq!((limit.count(), limit.size()), (0, 0));
    assert!(!limit.is_flow_control_active());

    // Double dequeue after a real enqueue.
    limit.enqueued(&m);
    limit.dequeued(&m).unwrap();
    assert!(limit.dequeued(&m).is_err());
}

/// Accessors expose the normalized thresholds.
#[test]
fn test_threshold_accessors() {
    let limit = QueueFlowLimit::new("q", ThresholdSet::new(100, 0, 4096, 1024), CapacityBound::default())
        .unwrap();
    assert_eq!(limit.flow_stop_count(), 100);
    assert_eq!(limit.flow_resume_count(), 100);
    assert_eq!(limit.flow_stop_size(), 4096);
    assert_eq!(limit.flow_resume_size(), 1024);
    assert_eq!(limit.queue_name(), "q");
}
