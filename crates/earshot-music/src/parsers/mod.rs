pub mod apple_music;
pub mod spotify;
pub mod youtube;

use earshot_core::Platform;

pub use apple_music::{apple_music_embed_url, parse_apple_music_song_id};
pub use spotify::{parse_spotify_track_id, spotify_embed_url};
pub use youtube::{parse_youtube_video_id, youtube_embed_url};

/// Platform-specific track id, if the link points at a single track.
pub fn track_id(platform: Platform, url: &str) -> Option<String> {
    match platform {
        Platform::Spotify => parse_spotify_track_id(url),
        Platform::Apple => parse_apple_music_song_id(url),
        Platform::Youtube => parse_youtube_video_id(url),
        Platform::Unknown => None,
    }
}

pub fn embed_url(platform: Platform, url: &str) -> Option<String> {
    match platform {
        Platform::Spotify => spotify_embed_url(url),
        Platform::Apple => apple_music_embed_url(url),
        Platform::Youtube => youtube_embed_url(url),
        Platform::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_platform_has_nothing() {
        assert_eq!(track_id(Platform::Unknown, "https://open.spotify.com/track/a"), None);
        assert_eq!(embed_url(Platform::Unknown, "https://youtu.be/a"), None);
    }

    #[test]
    fn dispatches_by_platform() {
        assert_eq!(
            embed_url(Platform::Youtube, "https://youtube.com/watch?v=abc"),
            Some("https://www.youtube.com/embed/abc".to_string())
        );
        assert_eq!(
            track_id(Platform::Spotify, "https://open.spotify.com/track/abc"),
            Some("abc".to_string())
        );
    }
}
