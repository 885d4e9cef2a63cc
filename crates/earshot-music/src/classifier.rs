//! Recognizes Spotify, Apple Music and YouTube links and rewrites app URI
//! schemes into `https://` web URLs.
//!
//! Marker checks are plain, case-sensitive substring and prefix tests.
//! `HTTPS://OPEN.SPOTIFY.COM/...` is therefore not recognized.

use std::sync::LazyLock;

use earshot_core::{ParsedMusicUrl, Platform};
use regex::Regex;
use tracing::debug;

const SPOTIFY_MARKERS: &[&str] = &["spotify.com", "open.spotify.com"];
const SPOTIFY_SCHEMES: &[&str] = &["spotify:"];

const APPLE_MARKERS: &[&str] = &["music.apple.com", "itunes.apple.com"];
const APPLE_SCHEMES: &[&str] = &["music://", "itms://", "itmss://"];

const YOUTUBE_MARKERS: &[&str] = &["youtube.com", "youtu.be", "music.youtube.com"];
const YOUTUBE_SCHEMES: &[&str] = &["youtube://", "vnd.youtube://"];

static CANDIDATE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://\S+|spotify:\S+|music://\S+|youtube://\S+)")
        .expect("candidate url pattern is valid")
});

/// Classifies `input` and normalizes it to a canonical web URL.
///
/// Never fails: absent, blank or unrecognized input yields an invalid
/// result carrying the trimmed input.
pub fn parse_music_url(input: Option<&str>) -> ParsedMusicUrl {
    let trimmed = input.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return ParsedMusicUrl::invalid("");
    }

    let parsed = match detect_platform(trimmed) {
        Platform::Spotify => ParsedMusicUrl::valid(Platform::Spotify, normalize_spotify(trimmed)),
        Platform::Apple => ParsedMusicUrl::valid(Platform::Apple, normalize_apple(trimmed)),
        Platform::Youtube => ParsedMusicUrl::valid(Platform::Youtube, normalize_youtube(trimmed)),
        Platform::Unknown => ParsedMusicUrl::invalid(trimmed),
    };
    debug!(platform = %parsed.platform(), url = parsed.url(), "classified music url");
    parsed
}

pub fn classify(input: &str) -> ParsedMusicUrl {
    parse_music_url(Some(input))
}

/// Pulls the first link or app URI out of shared text.
///
/// Falls back to the trimmed text when nothing link-like is found, and to an
/// empty string when there is no text at all.
pub fn extract_url_from_text(text: Option<&str>) -> String {
    let text = text.unwrap_or_default();
    match CANDIDATE_URL.find(text) {
        Some(found) => found.as_str().to_string(),
        None => text.trim().to_string(),
    }
}

/// First matching platform in Spotify, Apple, YouTube order.
pub fn detect_platform(trimmed: &str) -> Platform {
    if matches_markers(trimmed, SPOTIFY_MARKERS, SPOTIFY_SCHEMES) {
        Platform::Spotify
    } else if matches_markers(trimmed, APPLE_MARKERS, APPLE_SCHEMES) {
        Platform::Apple
    } else if matches_markers(trimmed, YOUTUBE_MARKERS, YOUTUBE_SCHEMES) {
        Platform::Youtube
    } else {
        Platform::Unknown
    }
}

fn matches_markers(input: &str, markers: &[&str], schemes: &[&str]) -> bool {
    markers.iter().any(|marker| input.contains(marker))
        || schemes.iter().any(|scheme| input.starts_with(scheme))
}

fn normalize_spotify(url: &str) -> String {
    match url.strip_prefix("spotify:") {
        Some(rest) => format!("https://open.spotify.com/{rest}"),
        None => url.to_string(),
    }
}

fn normalize_apple(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("music://") {
        return format!("https://music.apple.com/{rest}");
    }
    match url
        .strip_prefix("itms://")
        .or_else(|| url.strip_prefix("itmss://"))
    {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

fn normalize_youtube(url: &str) -> String {
    let normalized = match url
        .strip_prefix("youtube://")
        .or_else(|| url.strip_prefix("vnd.youtube://"))
    {
        Some(rest) => format!("https://www.youtube.com/{rest}"),
        None => url.to_string(),
    };
    // short links become watch links; only the first occurrence is rewritten
    normalized.replacen("youtu.be/", "youtube.com/watch?v=", 1)
}
