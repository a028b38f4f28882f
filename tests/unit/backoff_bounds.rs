//! Backoff controller bounds over many random jitter draws

use std::time::Duration;
use user_data_exporter::downloader::{BackoffConfig, Retrier, RetryPolicy};

#[test]
fn test_delays_stay_within_bounds() {
    let backoff = BackoffConfig::default();
    for _ in 0..200 {
        let mut retrier = Retrier::new(RetryPolicy::Unlimited, backoff);
        let mut previous: Option<Duration> = None;
        for _ in 0..20 {
            let delay = retrier.next_delay().unwrap();
            assert!(delay <= backoff.max);
            if let Some(previous) = previous {
                // Growth factor 2 with at most 10% jitter never shrinks a delay
                assert!(delay >= previous.min(backoff.max));
            }
            previous = Some(delay);
        }
    }
}

#[test]
fn test_grown_delay_within_jitter_band() {
    let backoff = BackoffConfig::default();
    let previous = Duration::from_millis(4000);
    for _ in 0..500 {
        let delay = backoff.next_delay(3, Some(previous));
        assert!(delay >= Duration::from_millis(7199), "{delay:?}");
        assert!(delay <= Duration::from_millis(8800), "{delay:?}");
    }
}

#[test]
fn test_network_policy_allows_exactly_five() {
    let mut retrier = Retrier::new(RetryPolicy::Limited(5), BackoffConfig::default());
    let granted = std::iter::from_fn(|| retrier.next_delay()).count();
    assert_eq!(granted, 5);
}
