//! Community metadata lookup.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{community_referer, feature_flags, nullable, Endpoint, ParseError};
use crate::transport::Request;

pub const COMMUNITY_INFO: Endpoint = Endpoint {
    name: "CommunitiesFetchOneQuery",
    path: "yl50sLRZmPfKAvxW7H_z0g/CommunitiesFetchOneQuery",
};

const FEATURES: &[(&str, bool)] = &[
    ("profile_label_improvements_pcf_label_in_post_enabled", true),
    ("responsive_web_graphql_skip_user_profile_image_extensions_enabled", false),
    ("responsive_web_graphql_timeline_navigation_enabled", true),
    ("rweb_tipjar_consumption_enabled", true),
    ("verified_phone_label_enabled", false),
];

#[derive(Serialize)]
struct Variables<'a> {
    #[serde(rename = "communityId")]
    community_id: &'a str,
    #[serde(rename = "withDmMuting")]
    with_dm_muting: bool,
}

/// Request for the metadata of `community_id`.
pub fn community_info_request(community_id: &str) -> Request {
    Request::new(
        COMMUNITY_INFO,
        &Variables {
            community_id,
            with_dm_muting: false,
        },
        &feature_flags(FEATURES),
        community_referer(community_id),
        "community_info",
    )
}

/// Descriptive data about a community.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommunityInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub member_count: Option<u64>,
    pub moderator_count: Option<u64>,
    /// Creation time, RFC 3339 when the source sent a timestamp
    pub created_at: Option<String>,
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
    result: RawCommunity,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCommunity {
    name: Option<String>,
    description: Option<String>,
    member_count: Option<u64>,
    moderator_count: Option<u64>,
    created_at: Option<Value>,
}

/// Decode a community info response.
pub fn parse_community_info(body: &str) -> Result<CommunityInfo, ParseError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let raw = envelope.data.community_results.result;

    Ok(CommunityInfo {
        name: raw.name,
        description: raw.description,
        member_count: raw.member_count,
        moderator_count: raw.moderator_count,
        created_at: raw.created_at.and_then(render_created_at),
    })
}

/// Creation time arrives as epoch milliseconds; strings pass through.
fn render_created_at(value: Value) -> Option<String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|dt| dt.to_rfc3339()),
        Value::String(s) => Some(s),
        _ => None,
    }
}
