//! Unit tests for resumable member collection

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use cscout::backoff::{BackoffPolicy, Fetcher, RecordingSleeper};
use cscout::checkpoint::{Checkpoint, CheckpointStore};
use cscout::collector::{AbortReason, CollectReport, Collector, CollectorOptions, DoneReason, RunState};
use cscout::progress::{PageProgress, ProgressObserver};
use cscout::transport::PageResult;

use crate::helpers::{member_ids, members_page, ok_fixture, read_members, ScriptedTransport};

const MEMBER_HEADER: &str = "id,username,name,protected,verified,is_blue_verified,profile_image_url,community_role,followers_count,following_count,statuses_count,location,created_at";

fn run(transport: &ScriptedTransport, output: &Path, options: CollectorOptions) -> CollectReport {
    let sleeper = RecordingSleeper::new();
    let mut collector = Collector::new(
        Fetcher::new(transport, &sleeper, BackoffPolicy::collection()),
        output,
        options,
    );
    collector.run().unwrap()
}

fn resume_options() -> CollectorOptions {
    let mut options = CollectorOptions::new("42");
    options.resume = true;
    options
}

// ============================================================================
// Fixture-backed runs
// ============================================================================

#[test]
fn collects_fixture_pages_into_table() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        ok_fixture("members_page_1.json"),
        ok_fixture("members_page_2.json"),
    ]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert_eq!(report.state, RunState::Done(DoneReason::Exhausted));
    assert_eq!(report.collected, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(member_ids(&output), vec!["1001", "1002", "1004"]);

    let members = read_members(&output);
    assert_eq!(members[1].name, "Bob, the builder");
    assert!(members[1].protected);
    assert_eq!(members[2].community_role, "Moderator");

    let header = fs::read_to_string(&output).unwrap();
    assert!(header.starts_with(&format!("{}\n", MEMBER_HEADER)));
}

#[test]
fn community_size_feeds_checkpoint_percentage() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        ok_fixture("community_info.json"),
        ok_fixture("members_page_1.json"),
        ok_fixture("members_page_2.json"),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut collector = Collector::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::collection()),
        &output,
        CollectorOptions::new("42"),
    );

    let info = collector.fetch_community_info().unwrap();
    let report = collector.run().unwrap();

    assert_eq!(info.member_count, Some(3));
    let cp = report.checkpoint.unwrap();
    assert_eq!(cp.community_size, Some(3));
    assert_eq!(cp.progress_percentage, Some(100.0));
}

#[test]
fn failed_info_lookup_does_not_block_collection() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        PageResult::hard_failure(Some(404), "not found"),
        members_page(&["1"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut collector = Collector::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::collection()),
        &output,
        CollectorOptions::new("42"),
    );

    assert!(collector.fetch_community_info().is_none());
    let report = collector.run().unwrap();
    assert_eq!(report.collected, 1);
    assert_eq!(report.checkpoint.unwrap().progress_percentage, None);
}

// ============================================================================
// Resume
// ============================================================================

#[test]
fn resume_after_completion_fetches_nothing() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let first = ScriptedTransport::new(vec![
        members_page(&["1", "2"], Some("c1")),
        members_page(&["3"], None),
    ]);
    run(&first, &output, CollectorOptions::new("42"));
    let before = fs::read_to_string(&output).unwrap();
    let store = CheckpointStore::for_output(&output);
    let saved = store.load().unwrap();

    let second = ScriptedTransport::new(vec![
        members_page(&["1", "2"], Some("c1")),
        members_page(&["3"], None),
    ]);
    let report = run(&second, &output, resume_options());

    assert_eq!(report.state, RunState::Done(DoneReason::AlreadyComplete));
    assert_eq!(report.collected, 0);
    assert_eq!(report.existing, 3);
    assert_eq!(second.request_count(), 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), before);
    assert_eq!(store.load().unwrap().last_cursor, saved.last_cursor);
}

#[test]
fn rerun_over_known_pages_appends_nothing() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let pages = || {
        vec![
            members_page(&["1", "2"], Some("c1")),
            members_page(&["3"], None),
        ]
    };
    run(&ScriptedTransport::new(pages()), &output, CollectorOptions::new("42"));

    let report = run(&ScriptedTransport::new(pages()), &output, CollectorOptions::new("42"));

    assert_eq!(report.collected, 0);
    assert_eq!(report.duplicates, 3);
    assert_eq!(report.existing, 3);
    assert_eq!(member_ids(&output), vec!["1", "2", "3"]);
    assert_eq!(CheckpointStore::for_output(&output).load().unwrap().last_cursor, None);
}

#[test]
fn resume_continues_from_saved_cursor() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let mut limited = CollectorOptions::new("42");
    limited.limit = Some(2);
    let first = ScriptedTransport::new(vec![members_page(&["1", "2"], Some("c1"))]);
    let report = run(&first, &output, limited);
    assert_eq!(report.state, RunState::Done(DoneReason::LimitReached));

    let second = ScriptedTransport::new(vec![members_page(&["3"], None)]);
    let report = run(&second, &output, resume_options());

    assert_eq!(report.state, RunState::Done(DoneReason::Exhausted));
    assert_eq!(report.existing, 2);
    assert_eq!(report.collected, 1);
    assert_eq!(
        second.requests()[0].variables,
        r#"{"communityId":"42","cursor":"c1"}"#
    );
    assert_eq!(member_ids(&output), vec!["1", "2", "3"]);
}

#[test]
fn resume_without_checkpoint_uses_start_cursor() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![members_page(&["9"], None)]);
    let mut options = resume_options();
    options.start_cursor = Some("manual".to_string());

    run(&transport, &output, options);

    assert_eq!(
        transport.requests()[0].variables,
        r#"{"communityId":"42","cursor":"manual"}"#
    );
}

#[test]
fn checkpoint_of_other_community_is_ignored() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    CheckpointStore::for_output(&output)
        .save(&Checkpoint::new("other", Some("foreign".into()), 5, 0, None))
        .unwrap();
    let transport = ScriptedTransport::new(vec![members_page(&["1"], None)]);

    run(&transport, &output, resume_options());

    assert_eq!(
        transport.requests()[0].variables,
        r#"{"communityId":"42","cursor":null}"#
    );
    assert_eq!(
        CheckpointStore::for_output(&output).load().unwrap().community_id,
        "42"
    );
}

// ============================================================================
// Dedup and termination
// ============================================================================

#[test]
fn repeated_ids_across_pages_are_written_once() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        members_page(&["1", "2"], Some("c1")),
        members_page(&["2", "3", "1"], Some("c2")),
        members_page(&["3", "4", "4"], None),
    ]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert_eq!(member_ids(&output), vec!["1", "2", "3", "4"]);
    assert_eq!(report.collected, 4);
    assert_eq!(report.duplicates, 4);
}

#[test]
fn existing_rows_filter_new_pages() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    fs::write(
        &output,
        format!("{}\nA,alpha,Alpha,false,false,false,,Member,0,0,0,,\n", MEMBER_HEADER),
    )
    .unwrap();
    let transport = ScriptedTransport::new(vec![members_page(&["A", "B"], None)]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert_eq!(report.existing, 1);
    assert_eq!(report.collected, 1);
    assert_eq!(member_ids(&output), vec!["A", "B"]);
}

#[test]
fn empty_page_aborts_and_resume_skips_it() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        ok_fixture("members_page_1.json"),
        ok_fixture("members_empty.json"),
    ]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert_eq!(report.state, RunState::Aborted(AbortReason::EmptyPage));
    assert_eq!(report.collected, 2);
    let cp = CheckpointStore::for_output(&output).load().unwrap();
    assert_eq!(cp.last_cursor.as_deref(), Some("cursor-after-empty"));

    let next = ScriptedTransport::new(vec![members_page(&["7"], None)]);
    run(&next, &output, resume_options());
    assert_eq!(
        next.requests()[0].variables,
        r#"{"communityId":"42","cursor":"cursor-after-empty"}"#
    );
}

#[test]
fn error_body_keeps_cursor_for_resume() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        members_page(&["1"], Some("c1")),
        PageResult::Ok(r#"{"errors":[{"message":"Rate limit exceeded"}]}"#.to_string()),
    ]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert_eq!(report.state, RunState::Aborted(AbortReason::EmptyPage));
    let cp = CheckpointStore::for_output(&output).load().unwrap();
    assert_eq!(cp.last_cursor.as_deref(), Some("c1"));
    assert!(!cp.is_exhausted());

    let next = ScriptedTransport::new(vec![members_page(&["2"], None)]);
    let report = run(&next, &output, resume_options());

    assert_eq!(report.state, RunState::Done(DoneReason::Exhausted));
    assert_eq!(next.request_count(), 1);
    assert_eq!(
        next.requests()[0].variables,
        r#"{"communityId":"42","cursor":"c1"}"#
    );
    assert_eq!(member_ids(&output), vec!["1", "2"]);
    assert!(CheckpointStore::for_output(&output).load().unwrap().is_exhausted());
}

#[test]
fn malformed_body_aborts_and_keeps_checkpoint() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        members_page(&["1"], Some("c1")),
        PageResult::Ok("<html>".to_string()),
    ]);

    let report = run(&transport, &output, CollectorOptions::new("42"));

    assert!(matches!(
        report.state,
        RunState::Aborted(AbortReason::MalformedPage(_))
    ));
    let cp = CheckpointStore::for_output(&output).load().unwrap();
    assert_eq!(cp.last_cursor.as_deref(), Some("c1"));
}

// ============================================================================
// Checkpoint monotonicity
// ============================================================================

struct CheckpointWatcher<'a> {
    store: CheckpointStore,
    seen: &'a RefCell<Vec<u64>>,
}

impl ProgressObserver for CheckpointWatcher<'_> {
    fn on_page(&self, _progress: &PageProgress) {
        if let Some(cp) = self.store.load() {
            self.seen.borrow_mut().push(cp.collected_count);
        }
    }
}

#[test]
fn collected_count_never_decreases() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("members.csv");
    let transport = ScriptedTransport::new(vec![
        members_page(&["1", "2"], Some("c1")),
        members_page(&["1"], Some("c2")),
        members_page(&["3", "4", "5"], Some("c3")),
        members_page(&["5"], None),
    ]);
    let sleeper = RecordingSleeper::new();
    let seen = RefCell::new(Vec::new());
    let watcher = CheckpointWatcher {
        store: CheckpointStore::for_output(&output),
        seen: &seen,
    };

    Collector::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::collection()),
        &output,
        CollectorOptions::new("42"),
    )
    .with_observer(watcher)
    .run()
    .unwrap();

    let seen = seen.into_inner();
    assert_eq!(seen, vec![2, 2, 5, 5]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}
