//! Splits oEmbed titles into song and artist.

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const YOUTUBE_SEPARATORS: &[&str] = &[" - ", " · ", " | ", " — "];

/// Spotify titles read `"Song · Artist"`. Returns `(title, artist)`.
pub fn split_spotify_title(full: &str) -> (String, String) {
    match full.split_once(" · ") {
        Some((song, artist)) => (song.trim().to_string(), artist.trim().to_string()),
        None => (full.to_string(), UNKNOWN_ARTIST.to_string()),
    }
}

/// YouTube titles usually read `"Artist - Title"`. Splits on the last
/// occurrence of the first separator present. Returns `(title, artist)`.
pub fn split_youtube_title(full: &str) -> (String, String) {
    for separator in YOUTUBE_SEPARATORS {
        if let Some((artist, title)) = full.rsplit_once(separator) {
            let artist = artist.trim();
            let title = title.trim();
            let title = if title.is_empty() { full } else { title };
            let artist = if artist.is_empty() { UNKNOWN_ARTIST } else { artist };
            return (title.to_string(), artist.to_string());
        }
    }
    (full.to_string(), UNKNOWN_ARTIST.to_string())
}
