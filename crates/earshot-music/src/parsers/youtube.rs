use regex::Regex;

pub fn parse_youtube_video_id(input: &str) -> Option<String> {
    let regex = Regex::new(
        r"(?:youtube\.com/watch\?v=|youtu\.be/|music\.youtube\.com/watch\?v=)([A-Za-z0-9_-]+)",
    )
    .ok()?;
    let captures = regex.captures(input)?;
    captures.get(1).map(|m| m.as_str().to_string())
}

pub fn youtube_embed_url(input: &str) -> Option<String> {
    parse_youtube_video_id(input).map(|id| format!("https://www.youtube.com/embed/{id}"))
}

/// YouTube Music pages are served by the plain site as well.
pub fn to_plain_youtube(input: &str) -> String {
    input.replace("music.youtube.com", "youtube.com")
}
