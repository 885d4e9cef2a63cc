use regex::Regex;
use url::Url;

pub fn parse_apple_music_song_id(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    if url.domain()? != "music.apple.com" {
        return None;
    }
    let query_pairs = url.query_pairs().collect::<Vec<_>>();
    if let Some((_, value)) = query_pairs.iter().find(|(key, _)| key == "i") {
        return Some(value.to_string());
    }

    let regex = Regex::new(r"music\.apple\.com/[^/]+/song/(?:[^/?#]+/)?(\d+)").ok()?;
    let captures = regex.captures(input)?;
    captures.get(1).map(|m| m.as_str().to_string())
}

/// Embed player URL for a single-song page; album links have no embed.
pub fn apple_music_embed_url(input: &str) -> Option<String> {
    let regex = Regex::new(r"music\.apple\.com/[^/]+/song/").ok()?;
    if !regex.is_match(input) {
        return None;
    }
    Some(input.replacen("/song/", "/embed/song/", 1))
}
