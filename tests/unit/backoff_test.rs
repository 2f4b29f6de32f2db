//! Unit tests for the retrying fetch loop

use std::time::Duration;

use cscout::api::{following_request, members_request};
use cscout::backoff::{BackoffPolicy, FetchFailure, Fetcher, RecordingSleeper};
use cscout::transport::{PageResult, TransientKind};

use crate::helpers::{members_page, ScriptedTransport};

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[test]
fn consecutive_throttling_doubles_until_cap() {
    let transport = ScriptedTransport::new(vec![
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        members_page(&["1"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut fetcher = Fetcher::new(&transport, &sleeper, BackoffPolicy::classification());

    let body = fetcher.fetch(&following_request("9")).unwrap();

    assert!(body.contains("rest_id"));
    assert_eq!(sleeper.recorded(), secs(&[60, 120, 240, 480, 600, 600]));
    assert_eq!(fetcher.throttle_hits(), 6);
    assert_eq!(fetcher.stats().requests, 7);
}

#[test]
fn server_hint_wins_on_collection_path() {
    let transport = ScriptedTransport::new(vec![
        PageResult::RateLimited(Some(Duration::from_secs(17))),
        PageResult::RateLimited(None),
        members_page(&["1"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut fetcher = Fetcher::new(&transport, &sleeper, BackoffPolicy::collection());

    fetcher.fetch(&members_request("42", None)).unwrap();

    assert_eq!(sleeper.recorded(), secs(&[17, 60]));
}

#[test]
fn transient_failures_retry_with_fixed_waits() {
    let transport = ScriptedTransport::new(vec![
        PageResult::Transient(TransientKind::Timeout),
        PageResult::Transient(TransientKind::Connection),
        PageResult::Transient(TransientKind::Timeout),
        members_page(&["1"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut fetcher = Fetcher::new(&transport, &sleeper, BackoffPolicy::collection());

    fetcher.fetch(&members_request("42", None)).unwrap();

    assert_eq!(sleeper.recorded(), secs(&[10, 15, 10]));
    assert_eq!(fetcher.stats().transient_retries, 3);
    assert_eq!(fetcher.throttle_hits(), 0);
}

#[test]
fn hard_failure_is_not_retried() {
    let transport = ScriptedTransport::new(vec![
        PageResult::hard_failure(Some(401), "unauthorized"),
        members_page(&["1"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut fetcher = Fetcher::new(&transport, &sleeper, BackoffPolicy::collection());

    let err = fetcher.fetch(&members_request("42", None)).unwrap_err();

    assert_eq!(
        err,
        FetchFailure::Hard {
            status: Some(401),
            body_excerpt: "unauthorized".to_string()
        }
    );
    assert_eq!(transport.request_count(), 1);
    assert_eq!(transport.remaining(), 1);
    assert!(sleeper.recorded().is_empty());
}

#[test]
fn throttle_counter_spans_requests_of_one_run() {
    let transport = ScriptedTransport::new(vec![
        PageResult::RateLimited(None),
        members_page(&["1"], Some("c")),
        PageResult::RateLimited(None),
        members_page(&["2"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut fetcher = Fetcher::new(&transport, &sleeper, BackoffPolicy::classification());

    fetcher.fetch(&following_request("1")).unwrap();
    fetcher.fetch(&following_request("2")).unwrap();

    assert_eq!(sleeper.recorded(), secs(&[60, 120]));
}

#[test]
fn attempt_cap_turns_throttling_into_failure() {
    let transport = ScriptedTransport::new(vec![
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
        PageResult::RateLimited(None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut policy = BackoffPolicy::classification();
    policy.max_attempts = Some(2);
    let mut fetcher = Fetcher::new(&transport, &sleeper, policy);

    let err = fetcher.fetch(&following_request("1")).unwrap_err();

    assert_eq!(err, FetchFailure::Exhausted { attempts: 2 });
    assert_eq!(transport.request_count(), 2);
    assert_eq!(sleeper.recorded(), secs(&[60]));
}
