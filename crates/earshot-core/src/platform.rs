use std::fmt;

use serde::{Deserialize, Serialize};

/// Music service a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Apple,
    Youtube,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Apple => "apple",
            Platform::Youtube => "youtube",
            Platform::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::Apple => "Apple Music",
            Platform::Youtube => "YouTube",
            Platform::Unknown => "Unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
