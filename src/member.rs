//! Community member record.
//!
//! A [`Member`] is one row of the member table. Its `id` is the stable key
//! used for deduplication; every other column is informational and may be
//! missing in the remote response.

use serde::{Deserialize, Deserializer, Serialize};

use crate::sink::Keyed;

/// One collected community member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub protected: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub verified: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_blue_verified: bool,
    pub profile_image_url: String,
    pub community_role: String,
    #[serde(deserialize_with = "lenient_count")]
    pub followers_count: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub following_count: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub statuses_count: u64,
    pub location: String,
    pub created_at: String,
}

impl Keyed for Member {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Normalize a handle for comparison: trim, drop a leading `@`, lowercase.
pub fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

/// Parse a boolean column written by this tool or by older spreadsheets.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| parse_flag(&s))
        .unwrap_or(false))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0))
}
