//! First page of an account's outbound follows.
//!
//! Only the first [`FOLLOWING_PAGE_SIZE`] entries are ever inspected. An
//! account that follows the target outside that window is reported as not
//! following.
//!
//! Absent fields default, but an explicit `null` anywhere on the path to the
//! follow entries (`data`, `user`, the timeline, `instructions`, an entry's
//! content) is a [`ParseError`]. Error envelopes and suspended accounts come
//! back that way, and they say nothing about the follow edge.

use serde::{Deserialize, Serialize};

use super::{feature_flags, nullable, Endpoint, ParseError};
use crate::member::normalize_username;
use crate::transport::Request;

pub const FOLLOWING: Endpoint = Endpoint {
    name: "Following",
    path: "zx6e-TLzRkeDO_a7p4b3JQ/Following",
};

/// Number of follow edges requested per check.
pub const FOLLOWING_PAGE_SIZE: u32 = 100;

const FEATURES: &[(&str, bool)] = &[
    ("rweb_video_screen_enabled", false),
    ("profile_label_improvements_pcf_label_in_post_enabled", true),
    ("rweb_tipjar_consumption_enabled", true),
    ("verified_phone_label_enabled", false),
    ("creator_subscriptions_tweet_preview_api_enabled", true),
    ("responsive_web_graphql_timeline_navigation_enabled", true),
    ("responsive_web_graphql_skip_user_profile_image_extensions_enabled", false),
    ("premium_content_api_read_enabled", false),
    ("communities_web_enable_tweet_community_results_fetch", true),
    ("c9s_tweet_anatomy_moderator_badge_enabled", true),
    ("responsive_web_grok_analyze_button_fetch_trends_enabled", false),
    ("responsive_web_grok_analyze_post_followups_enabled", true),
    ("responsive_web_jetfuel_frame", false),
    ("responsive_web_grok_share_attachment_enabled", true),
    ("articles_preview_enabled", true),
    ("responsive_web_edit_tweet_api_enabled", true),
    ("graphql_is_translatable_rweb_tweet_is_translatable_enabled", true),
    ("view_counts_everywhere_api_enabled", true),
    ("longform_notetweets_consumption_enabled", true),
    ("responsive_web_twitter_article_tweet_consumption_enabled", true),
    ("tweet_awards_web_tipping_enabled", false),
    ("responsive_web_grok_show_grok_translated_post", false),
    ("responsive_web_grok_analysis_button_from_backend", true),
    ("creator_subscriptions_quote_tweet_preview_enabled", false),
    ("freedom_of_speech_not_reach_fetch_enabled", true),
    ("standardized_nudges_misinfo", true),
    ("tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled", true),
    ("longform_notetweets_rich_text_read_enabled", true),
    ("longform_notetweets_inline_media_enabled", true),
    ("responsive_web_grok_image_annotation_enabled", true),
    ("responsive_web_enhance_cards_enabled", false),
];

#[derive(Serialize)]
struct Variables<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    count: u32,
    #[serde(rename = "includePromotedContent")]
    include_promoted_content: bool,
}

/// Request for the first follow page of `user_id`.
pub fn following_request(user_id: &str) -> Request {
    Request::new(
        FOLLOWING,
        &Variables {
            user_id,
            count: FOLLOWING_PAGE_SIZE,
            include_promoted_content: false,
        },
        &feature_flags(FEATURES),
        format!("https://x.com/i/user/{}/following", user_id),
        format!("following_response_{}", user_id),
    )
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Envelope {
    data: Data,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Data {
    user: UserNode,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserNode {
    result: UserTimeline,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserTimeline {
    timeline: TimelineOuter,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TimelineOuter {
    timeline: Timeline,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Timeline {
    instructions: Vec<Instruction>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Instruction {
    #[serde(rename = "type")]
    kind: Option<String>,
    entries: Vec<Entry>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Entry {
    #[serde(rename = "entryId")]
    entry_id: Option<String>,
    content: Content,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Content {
    #[serde(rename = "entryType")]
    entry_type: Option<String>,
    #[serde(rename = "itemContent")]
    item_content: ItemContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ItemContent {
    #[serde(rename = "itemType")]
    item_type: Option<String>,
    user_results: UserResults,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserResults {
    /// `null` for accounts that are gone; such entries are skipped
    #[serde(deserialize_with = "nullable")]
    result: FollowedUser,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FollowedUser {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    legacy: FollowedLegacy,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FollowedLegacy {
    screen_name: Option<String>,
}

impl Entry {
    fn screen_name(&self) -> Option<&str> {
        if !self.entry_id.as_deref().unwrap_or_default().contains("user") {
            return None;
        }
        if self.content.entry_type.as_deref() != Some("TimelineTimelineItem") {
            return None;
        }
        let item = &self.content.item_content;
        if item.item_type.as_deref() != Some("TimelineUser") {
            return None;
        }
        let user = &item.user_results.result;
        if user.typename.as_deref() != Some("User") {
            return None;
        }
        user.legacy.screen_name.as_deref()
    }
}

/// Whether `target` appears among the follows in `body`, case-insensitively.
pub fn follows_target(body: &str, target: &str) -> Result<bool, ParseError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let target = normalize_username(target);

    let found = envelope
        .data
        .user
        .result
        .timeline
        .timeline
        .instructions
        .iter()
        .filter(|i| i.kind.as_deref() == Some("TimelineAddEntries"))
        .flat_map(|i| i.entries.iter())
        .filter_map(Entry::screen_name)
        .any(|name| normalize_username(name) == target);

    Ok(found)
}
