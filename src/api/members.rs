//! Paginated community members timeline.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{community_referer, nullable, Endpoint, ParseError};
use crate::member::Member;
use crate::transport::Request;

pub const MEMBERS: Endpoint = Endpoint {
    name: "membersSliceTimeline_Query",
    path: "V7OdnMvujMPsCctT_daznQ/membersSliceTimeline_Query",
};

#[derive(Serialize)]
struct Variables<'a> {
    #[serde(rename = "communityId")]
    community_id: &'a str,
    cursor: Option<&'a str>,
}

/// Request for one page of members starting at `cursor` (`None` = first page).
pub fn members_request(community_id: &str, cursor: Option<&str>) -> Request {
    Request::new(
        MEMBERS,
        &Variables {
            community_id,
            cursor,
        },
        &json!({ "responsive_web_graphql_timeline_navigation_enabled": true }),
        community_referer(community_id),
        "community_response",
    )
}

/// One decoded page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembersPage {
    /// Members in source order
    pub members: Vec<Member>,
    /// Cursor of the next page; `None` when the source is exhausted
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Envelope {
    #[serde(deserialize_with = "nullable")]
    data: Data,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Data {
    #[serde(rename = "communityResults", deserialize_with = "nullable")]
    community_results: CommunityResults,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CommunityResults {
    #[serde(deserialize_with = "nullable")]
    result: CommunityResult,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CommunityResult {
    #[serde(deserialize_with = "nullable")]
    members_slice: MembersSlice,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MembersSlice {
    #[serde(deserialize_with = "nullable")]
    items_results: Vec<ItemResult>,
    #[serde(deserialize_with = "nullable")]
    slice_info: SliceInfo,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SliceInfo {
    next_cursor: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ItemResult {
    result: Option<UserResult>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserResult {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    rest_id: Option<String>,
    is_blue_verified: Option<bool>,
    community_role: Option<String>,
    #[serde(deserialize_with = "nullable")]
    legacy: Legacy,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Legacy {
    screen_name: Option<String>,
    name: Option<String>,
    protected: Option<bool>,
    verified: Option<bool>,
    profile_image_url_https: Option<String>,
    followers_count: Option<u64>,
    friends_count: Option<u64>,
    statuses_count: Option<u64>,
    location: Option<String>,
    created_at: Option<String>,
}

impl UserResult {
    fn into_member(self) -> Option<Member> {
        if self.typename.as_deref() != Some("User") {
            return None;
        }
        let id = self.rest_id.filter(|id| !id.is_empty())?;
        let legacy = self.legacy;

        Some(Member {
            id,
            username: legacy.screen_name.unwrap_or_default(),
            name: legacy.name.unwrap_or_default(),
            protected: legacy.protected.unwrap_or(false),
            verified: legacy.verified.unwrap_or(false),
            is_blue_verified: self.is_blue_verified.unwrap_or(false),
            profile_image_url: legacy.profile_image_url_https.unwrap_or_default(),
            community_role: self.community_role.unwrap_or_default(),
            followers_count: legacy.followers_count.unwrap_or(0),
            following_count: legacy.friends_count.unwrap_or(0),
            statuses_count: legacy.statuses_count.unwrap_or(0),
            location: legacy.location.unwrap_or_default(),
            created_at: legacy.created_at.unwrap_or_default(),
        })
    }
}

/// Decode a members page.
///
/// Entries that are not users or carry no id are dropped. An empty cursor
/// string is treated as exhaustion.
pub fn parse_members_page(body: &str) -> Result<MembersPage, ParseError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let slice = envelope.data.community_results.result.members_slice;

    let members = slice
        .items_results
        .into_iter()
        .filter_map(|item| item.result)
        .filter_map(UserResult::into_member)
        .collect();

    let next_cursor = slice.slice_info.next_cursor.filter(|c| !c.is_empty());

    Ok(MembersPage {
        members,
        next_cursor,
    })
}
