//! Tests for monotonic progress tracking.

use std::sync::Arc;

use parking_lot::Mutex;
use stratus_http::{ProgressChannel, ProgressTracker};

fn recorder() -> (Arc<Mutex<Vec<f32>>>, impl Fn(f32) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |value| sink.lock().push(value))
}

#[test]
fn test_strictly_increasing_subsequence() {
    let tracker = ProgressTracker::new();
    let (seen, callback) = recorder();
    tracker.subscribe(ProgressChannel::Download, callback);

    for value in [0.1, 0.05, 0.1, 0.3, 0.2, 0.9, 0.9] {
        tracker.report(ProgressChannel::Download, value);
    }

    assert_eq!(*seen.lock(), vec![0.1, 0.3, 0.9]);
    assert_eq!(tracker.last(ProgressChannel::Download), 0.9);
}

#[test]
fn test_zero_and_regression_suppressed() {
    let tracker = ProgressTracker::new();
    let (seen, callback) = recorder();
    tracker.subscribe(ProgressChannel::Upload, callback);

    // Both channels start at 0.0, so a 0.0 sample is not an increase.
    tracker.report(ProgressChannel::Upload, 0.0);
    tracker.report(ProgressChannel::Upload, 0.5);
    tracker.report(ProgressChannel::Upload, 0.4);

    assert_eq!(*seen.lock(), vec![0.5]);
    assert_eq!(tracker.last(ProgressChannel::Upload), 0.5);
}

#[test]
fn test_channels_are_independent() {
    let tracker = ProgressTracker::new();
    let (upload_seen, upload_callback) = recorder();
    let (download_seen, download_callback) = recorder();
    tracker.subscribe(ProgressChannel::Upload, upload_callback);
    tracker.subscribe(ProgressChannel::Download, download_callback);

    tracker.report(ProgressChannel::Upload, 0.8);
    tracker.report(ProgressChannel::Download, 0.2);
    // A download sample below the upload watermark still notifies.
    tracker.report(ProgressChannel::Download, 0.4);

    assert_eq!(*upload_seen.lock(), vec![0.8]);
    assert_eq!(*download_seen.lock(), vec![0.2, 0.4]);
}

#[test]
fn test_every_subscriber_notified_once_per_sample() {
    let tracker = ProgressTracker::new();
    let (first_seen, first_callback) = recorder();
    let (second_seen, second_callback) = recorder();
    tracker.subscribe(ProgressChannel::Download, first_callback);
    tracker.subscribe(ProgressChannel::Download, second_callback);

    tracker.report(ProgressChannel::Download, 0.25);
    tracker.report(ProgressChannel::Download, 0.25);
    tracker.report(ProgressChannel::Download, 0.75);

    assert_eq!(*first_seen.lock(), vec![0.25, 0.75]);
    assert_eq!(*second_seen.lock(), vec![0.25, 0.75]);
}
