use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Global,
    Following,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Global => "global",
            FeedType::Following => "following",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
}

/// Body of `POST /api/login`. Either a device id or a username/password pair.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoginRequest {
    Device {
        device_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    Credentials {
        username: String,
        password: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub thumbnail: Option<String>,
    pub username: String,
    pub url: String,
    #[serde(rename = "createdAt", alias = "timestamp")]
    pub created_at: Option<String>,
    pub save_count: Option<u64>,
    pub platform: Option<String>,
    pub embed_url: Option<String>,
    pub is_mine: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub username: Option<String>,
    pub title: String,
    pub artist: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PostResponse {
    #[serde(default)]
    pub success: bool,
    pub post: Option<PostSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrateResponse {
    pub save_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FollowResponse {
    pub status: Option<String>,
    pub following: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: Option<i64>,
    pub username: String,
    pub bio: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub is_following: Option<bool>,
    #[serde(default)]
    pub posts: Vec<FeedPost>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}
