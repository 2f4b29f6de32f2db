//! Unit tests for follow classification

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use cscout::backoff::{BackoffPolicy, Fetcher, RecordingSleeper};
use cscout::classifier::{
    load_accounts, Classifier, ClassifyOptions, InputAccount, Outcome, OutputLayout,
};
use cscout::transport::PageResult;

use crate::helpers::{fixtures_dir, ok_fixture, RoutedTransport};

const TARGET: &str = "RustTarget";

fn routes() -> RoutedTransport {
    RoutedTransport::new(vec![
        (r#""userId":"2001""#, ok_fixture("following_with_target.json")),
        (r#""userId":"2002""#, ok_fixture("following_without_target.json")),
    ])
}

fn account(id: Option<&str>, username: &str, protected: bool) -> InputAccount {
    InputAccount {
        id: id.map(str::to_string),
        username: username.to_string(),
        protected,
    }
}

// ============================================================================
// Outcomes
// ============================================================================

#[test]
fn each_outcome_from_simulated_responses() {
    let transport = routes();
    let sleeper = RecordingSleeper::new();
    let mut classifier = Classifier::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::classification()),
        OutputLayout::Combined {
            path: "unused.csv".into(),
        },
        ClassifyOptions::new(TARGET),
    );

    let cases = [
        (account(Some("2001"), "fan", false), Outcome::Following),
        (account(Some("2002"), "stranger", false), Outcome::NotFollowing),
        (account(Some("2005"), "broken", false), Outcome::Unknown),
        (account(Some("2004"), "@rustTARGET", false), Outcome::SelfAccount),
        (account(Some("2003"), "locked", true), Outcome::ProtectedUnknown),
        (account(None, "anonymous", false), Outcome::Unknown),
    ];
    for (input, expected) in cases {
        assert_eq!(classifier.classify_account(&input), expected, "{}", input.username);
    }

    assert_eq!(transport.request_count(), 3);
}

#[test]
fn null_follow_payloads_are_unknown() {
    let transport = RoutedTransport::new(vec![
        (
            r#""userId":"3001""#,
            PageResult::Ok(r#"{"data":{"user":null}}"#.to_string()),
        ),
        (
            r#""userId":"3002""#,
            PageResult::Ok(
                r#"{"errors":[{"message":"User has been suspended"}],"data":null}"#.to_string(),
            ),
        ),
        (r#""userId":"3003""#, PageResult::Ok("{}".to_string())),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut classifier = Classifier::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::classification()),
        OutputLayout::Combined {
            path: "unused.csv".into(),
        },
        ClassifyOptions::new(TARGET),
    );

    assert_eq!(
        classifier.classify_account(&account(Some("3001"), "gone", false)),
        Outcome::Unknown
    );
    assert_eq!(
        classifier.classify_account(&account(Some("3002"), "suspended", false)),
        Outcome::Unknown
    );
    assert_eq!(
        classifier.classify_account(&account(Some("3003"), "quiet", false)),
        Outcome::NotFollowing
    );
}

#[test]
fn same_input_same_outcomes() {
    let accounts = load_accounts(&fixtures_dir().join("members_input.csv")).unwrap();
    let outcomes = || {
        let transport = routes();
        let sleeper = RecordingSleeper::new();
        let mut classifier = Classifier::new(
            Fetcher::new(&transport, &sleeper, BackoffPolicy::classification()),
            OutputLayout::Combined {
                path: "unused.csv".into(),
            },
            ClassifyOptions::new(TARGET),
        );
        accounts
            .iter()
            .map(|a| classifier.classify_account(a))
            .collect::<Vec<_>>()
    };

    assert_eq!(outcomes(), outcomes());
}

// ============================================================================
// Runs over the fixture table
// ============================================================================

#[test]
fn combined_table_lists_every_account_once() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("members.csv");
    fs::copy(fixtures_dir().join("members_input.csv"), &input).unwrap();
    let accounts = load_accounts(&input).unwrap();
    let layout = OutputLayout::derive(&input, TARGET, None, false);
    let transport = routes();
    let sleeper = RecordingSleeper::new();

    let report = Classifier::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::classification()),
        layout,
        ClassifyOptions::new(TARGET),
    )
    .run(&accounts)
    .unwrap();

    let written = fs::read_to_string(temp.path().join("members_follows_RustTarget.csv")).unwrap();
    insta::assert_snapshot!(written, @r"
    username,outcome
    fan,Following
    stranger,NotFollowing
    locked,ProtectedUnknown
    rusttarget,Self
    broken,Unknown
    ");
    assert_eq!(report.counts.total(), 5);
    assert_eq!(report.following_total, 2);
    assert_eq!(report.not_following_total, 3);
    // Pause after each remote check except the last one of the run
    assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2); 2]);
}

#[test]
fn split_lists_partition_accounts() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("members.csv");
    fs::copy(fixtures_dir().join("members_input.csv"), &input).unwrap();
    let accounts = load_accounts(&input).unwrap();
    let layout = OutputLayout::derive(&input, TARGET, None, true);
    let transport = routes();
    let sleeper = RecordingSleeper::new();

    Classifier::new(
        Fetcher::new(&transport, &sleeper, BackoffPolicy::classification()),
        layout,
        ClassifyOptions::new(TARGET),
    )
    .run(&accounts)
    .unwrap();

    let following =
        fs::read_to_string(temp.path().join("members_following_RustTarget.csv")).unwrap();
    let not_following =
        fs::read_to_string(temp.path().join("members_not_following_RustTarget.csv")).unwrap();
    assert_eq!(following, "fan\nrusttarget\n");
    assert_eq!(not_following, "stranger\nlocked\nbroken\n");
}

#[test]
fn continued_run_only_checks_remaining_accounts() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("members.csv");
    fs::copy(fixtures_dir().join("members_input.csv"), &input).unwrap();
    let accounts = load_accounts(&input).unwrap();
    let layout = OutputLayout::derive(&input, TARGET, None, false);

    let first = routes();
    let sleeper = RecordingSleeper::new();
    let mut options = ClassifyOptions::new(TARGET);
    options.limit = Some(2);
    Classifier::new(
        Fetcher::new(&first, &sleeper, BackoffPolicy::classification()),
        layout.clone(),
        options,
    )
    .run(&accounts)
    .unwrap();
    assert_eq!(first.request_count(), 2);

    let second = routes();
    let mut options = ClassifyOptions::new(TARGET);
    options.resume = true;
    let report = Classifier::new(
        Fetcher::new(&second, &sleeper, BackoffPolicy::classification()),
        layout,
        options,
    )
    .run(&accounts)
    .unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.counts.total(), 3);
    assert_eq!(
        second.variables(),
        vec![r#"{"userId":"2005","count":100,"includePromotedContent":false}"#]
    );

    let written = fs::read_to_string(temp.path().join("members_follows_RustTarget.csv")).unwrap();
    assert_eq!(written.lines().count(), 6);
    assert_eq!(written.matches("fan,").count(), 1);
}

#[test]
fn protected_flag_accepts_spreadsheet_spelling() {
    let accounts = load_accounts(&fixtures_dir().join("members_input.csv")).unwrap();
    let locked = accounts.iter().find(|a| a.username == "locked").unwrap();
    assert!(locked.protected);
    assert_eq!(accounts.len(), 5);
}
