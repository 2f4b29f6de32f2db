//! Full binary runs against a mock API

use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use cscout::checkpoint::CheckpointStore;

use crate::helpers::{
    cscout, cscout_authenticated, first_column, fixtures_dir, following_variables,
    members_variables, serve, write_config, FOLLOWING_PATH, MEMBERS_PATH,
};

fn serve_members(server: &MockServer) {
    serve(server, MEMBERS_PATH, &members_variables(None), "members_page_1.json");
    serve(
        server,
        MEMBERS_PATH,
        &members_variables(Some("cursor-page-2")),
        "members_page_2.json",
    );
}

#[test]
fn collect_then_status() {
    let server = MockServer::start();
    serve_members(&server);
    let home = TempDir::new().unwrap();
    write_config(home.path(), &server.base_url());
    let output = home.path().join("members.csv");

    cscout_authenticated(home.path())
        .args(["--quiet", "collect", "--community-id", "42", "--skip-info", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Collecting into"));

    assert_eq!(first_column(&output), vec!["1001", "1002", "1004"]);
    let checkpoint = CheckpointStore::for_output(&output).load().unwrap();
    assert_eq!(checkpoint.last_cursor, None);
    assert!(checkpoint.complete);
    assert_eq!(checkpoint.total_count, 3);

    cscout(home.path())
        .args(["status", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("collection complete"))
        .stdout(predicate::str::contains("3 total"));
}

#[test]
fn continue_after_complete_collection_sends_nothing() {
    let server = MockServer::start();
    serve_members(&server);
    let home = TempDir::new().unwrap();
    write_config(home.path(), &server.base_url());
    let output = home.path().join("members.csv");

    cscout_authenticated(home.path())
        .args(["-q", "collect", "--community-id", "42", "--skip-info", "--output"])
        .arg(&output)
        .assert()
        .success();
    let before = fs::read_to_string(&output).unwrap();

    let silent = MockServer::start();
    let any = silent.mock(|when, then| {
        when.method(GET);
        then.status(500);
    });
    write_config(home.path(), &silent.base_url());

    cscout_authenticated(home.path())
        .args(["-q", "collect", "--community-id", "42", "--continue", "--output"])
        .arg(&output)
        .arg("--skip-info")
        .assert()
        .success();

    any.assert_calls(0);
    assert_eq!(fs::read_to_string(&output).unwrap(), before);
}

#[test]
fn classify_writes_combined_table() {
    let server = MockServer::start();
    serve(
        &server,
        FOLLOWING_PATH,
        &following_variables("2001"),
        "following_with_target.json",
    );
    serve(
        &server,
        FOLLOWING_PATH,
        &following_variables("2002"),
        "following_without_target.json",
    );
    server.mock(|when, then| {
        when.method(GET)
            .path(FOLLOWING_PATH)
            .query_param("variables", following_variables("2005"));
        then.status(404).body("gone");
    });
    let home = TempDir::new().unwrap();
    write_config(home.path(), &server.base_url());
    let input = home.path().join("members.csv");
    fs::copy(fixtures_dir().join("members_input.csv"), &input).unwrap();

    cscout_authenticated(home.path())
        .args(["-q", "classify", "--target", "@RustTarget", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 5 accounts"));

    let written = fs::read_to_string(home.path().join("members_follows_RustTarget.csv")).unwrap();
    assert_eq!(
        written,
        "username,outcome\nfan,Following\nstranger,NotFollowing\nlocked,ProtectedUnknown\nrusttarget,Self\nbroken,Unknown\n"
    );
}
