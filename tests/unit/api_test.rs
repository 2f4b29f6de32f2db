//! Unit tests for response decoding against recorded fixtures

use cscout::api::{follows_target, parse_community_info, parse_members_page};

use crate::helpers::load_fixture;

// ============================================================================
// Members page
// ============================================================================

#[test]
fn members_page_keeps_users_only() {
    let page = parse_members_page(&load_fixture("members_page_1.json")).unwrap();

    let ids: Vec<_> = page.members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002"]);
    assert_eq!(page.next_cursor.as_deref(), Some("cursor-page-2"));
}

#[test]
fn members_page_maps_profile_fields() {
    let page = parse_members_page(&load_fixture("members_page_1.json")).unwrap();
    let alice = &page.members[0];

    assert_eq!(alice.username, "alice");
    assert_eq!(alice.name, "Alice Example");
    assert!(alice.is_blue_verified);
    assert!(!alice.protected);
    assert_eq!(alice.community_role, "Admin");
    assert_eq!(alice.followers_count, 1200);
    assert_eq!(alice.following_count, 300);
    assert_eq!(alice.statuses_count, 4500);
    assert_eq!(alice.location, "Berlin");
    assert_eq!(alice.profile_image_url, "https://pbs.example/alice.jpg");

    assert!(page.members[1].protected);
}

#[test]
fn last_page_has_no_cursor() {
    let page = parse_members_page(&load_fixture("members_page_2.json")).unwrap();
    assert_eq!(page.members.len(), 2);
    assert_eq!(page.next_cursor, None);
    assert_eq!(page.members[1].location, "");
}

#[test]
fn empty_page_still_carries_cursor() {
    let page = parse_members_page(&load_fixture("members_empty.json")).unwrap();
    assert!(page.members.is_empty());
    assert_eq!(page.next_cursor.as_deref(), Some("cursor-after-empty"));
}

#[test]
fn unexpected_shape_degrades_to_empty_page() {
    let page = parse_members_page(r#"{"errors": [{"message": "oops"}]}"#).unwrap();
    assert!(page.members.is_empty());
    assert_eq!(page.next_cursor, None);
}

#[test]
fn non_json_body_is_an_error() {
    assert!(parse_members_page("<html>maintenance</html>").is_err());
}

// ============================================================================
// Community info
// ============================================================================

#[test]
fn community_info_fixture() {
    let info = parse_community_info(&load_fixture("community_info.json")).unwrap();
    assert_eq!(info.name.as_deref(), Some("Rustaceans"));
    assert_eq!(info.member_count, Some(3));
    assert_eq!(info.moderator_count, Some(1));
    assert_eq!(info.created_at.as_deref(), Some("2023-11-14T22:13:20+00:00"));
}

// ============================================================================
// Follow list
// ============================================================================

#[test]
fn target_found_case_insensitively() {
    let body = load_fixture("following_with_target.json");
    assert!(follows_target(&body, "rusttarget").unwrap());
    assert!(follows_target(&body, "@RUSTTARGET").unwrap());
}

#[test]
fn target_missing_from_first_page() {
    let body = load_fixture("following_without_target.json");
    assert!(!follows_target(&body, "rusttarget").unwrap());
}

#[test]
fn cursor_entries_are_not_users() {
    let body = load_fixture("following_with_target.json");
    assert!(!follows_target(&body, "next").unwrap());
}
