//! GraphQL operations used by the collector and the classifier.
//!
//! Each submodule owns one remote operation: its [`Endpoint`], the
//! `variables`/`features` it sends, and an optional-field response schema.
//! Missing fields default, so an evolving response shape degrades to an
//! empty result. The members and community schemas also read an explicit
//! `null` as missing; the follow-list schema does not (see [`following`]).
//!
//! A [`ParseError`] is raised for a body that is not JSON and for a field
//! whose value has the wrong type, such as a number where a string id is
//! expected.

pub mod community;
pub mod following;
pub mod members;

pub use community::{community_info_request, parse_community_info, CommunityInfo};
pub use following::{follows_target, following_request, FOLLOWING_PAGE_SIZE};
pub use members::{members_request, parse_members_page, MembersPage};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

pub use crate::transport::Endpoint;

/// Error raised when a response body cannot be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid response JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Build a `features` object from a flag table.
pub(crate) fn feature_flags(flags: &[(&str, bool)]) -> Value {
    let map: Map<String, Value> = flags
        .iter()
        .map(|(name, on)| (name.to_string(), Value::Bool(*on)))
        .collect();
    Value::Object(map)
}

/// Referer of the community members page.
pub(crate) fn community_referer(community_id: &str) -> String {
    format!("https://x.com/i/communities/{}/members", community_id)
}
