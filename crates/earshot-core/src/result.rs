use serde::{Deserialize, Serialize};

use crate::Platform;

/// Outcome of classifying a pasted or shared link.
///
/// `is_valid` is true exactly when `platform` is not [`Platform::Unknown`];
/// the constructors are the only way to build one outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMusicUrl {
    platform: Platform,
    url: String,
    #[serde(rename = "isValid")]
    is_valid: bool,
}

impl ParsedMusicUrl {
    /// A recognized link. Passing `Platform::Unknown` yields an invalid result.
    pub fn valid(platform: Platform, url: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
            is_valid: platform.is_supported(),
        }
    }

    pub fn invalid(url: impl Into<String>) -> Self {
        Self {
            platform: Platform::Unknown,
            url: url.into(),
            is_valid: false,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn into_url(self) -> String {
        self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub thumbnail: String,
    pub embed_url: String,
    pub platform: Platform,
}

#[cfg(test)]
mod tests {
    use super::ParsedMusicUrl;
    use crate::Platform;

    #[test]
    fn valid_with_unknown_platform_stays_invalid() {
        let parsed = ParsedMusicUrl::valid(Platform::Unknown, "x");
        assert!(!parsed.is_valid());
    }

    #[test]
    fn serializes_with_camel_case_flag() {
        let parsed = ParsedMusicUrl::valid(Platform::Spotify, "https://open.spotify.com/track/1");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["platform"], "spotify");
        assert_eq!(json["isValid"], true);
        assert_eq!(json["url"], "https://open.spotify.com/track/1");
    }
}
