use regex::Regex;

pub fn parse_spotify_track_id(input: &str) -> Option<String> {
    let regex = Regex::new(r"spotify\.com/(?:intl-[a-z]{2}/)?track/([A-Za-z0-9]+)").ok()?;
    let captures = regex.captures(input)?;
    captures.get(1).map(|m| m.as_str().to_string())
}

pub fn spotify_embed_url(input: &str) -> Option<String> {
    parse_spotify_track_id(input).map(|id| format!("https://open.spotify.com/embed/track/{id}"))
}
