use earshot_core::{EarshotError, EarshotResult, Platform, TrackInfo};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::classifier::classify;
use crate::parsers::{
    apple_music_embed_url, parse_apple_music_song_id, parse_spotify_track_id,
    parse_youtube_video_id, youtube::to_plain_youtube,
};
use crate::title::{split_spotify_title, split_youtube_title};

const SPOTIFY_OEMBED: &str = "https://open.spotify.com/oembed";
const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";
const ITUNES_LOOKUP: &str = "https://itunes.apple.com/lookup";

#[derive(Debug, Clone)]
pub struct ResolverEndpoints {
    pub spotify_oembed: String,
    pub youtube_oembed: String,
    pub itunes_lookup: String,
}

impl Default for ResolverEndpoints {
    fn default() -> Self {
        Self {
            spotify_oembed: SPOTIFY_OEMBED.to_string(),
            youtube_oembed: YOUTUBE_OEMBED.to_string(),
            itunes_lookup: ITUNES_LOOKUP.to_string(),
        }
    }
}

/// Looks up title, artist and artwork for a track link.
#[derive(Debug, Clone)]
pub struct TrackResolver {
    client: Client,
    endpoints: ResolverEndpoints,
}

impl TrackResolver {
    pub fn new() -> EarshotResult<Self> {
        let client = Client::builder()
            .user_agent("earshot/0.1")
            .build()
            .map_err(|err| EarshotError::Network(format!("failed to build http client: {err}")))?;
        Ok(Self::with_endpoints(client, ResolverEndpoints::default()))
    }

    pub fn with_endpoints(client: Client, endpoints: ResolverEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub async fn resolve(&self, input: &str) -> EarshotResult<TrackInfo> {
        let parsed = classify(input);
        debug!(platform = %parsed.platform(), url = parsed.url(), "resolving track");
        match parsed.platform() {
            Platform::Spotify => self.resolve_spotify(parsed.url()).await,
            Platform::Youtube => self.resolve_youtube(parsed.url()).await,
            Platform::Apple => self.resolve_apple(parsed.url()).await,
            Platform::Unknown => Err(EarshotError::UnsupportedInput(format!(
                "not a Spotify, Apple Music or YouTube link: {input}"
            ))),
        }
    }

    async fn resolve_spotify(&self, url: &str) -> EarshotResult<TrackInfo> {
        let track_id = parse_spotify_track_id(url).ok_or_else(|| {
            EarshotError::UnsupportedInput(format!("not a spotify track link: {url}"))
        })?;
        let oembed: OembedResponse = self
            .get_json(&self.endpoints.spotify_oembed, &[("url", url)])
            .await?;
        let (title, artist) = split_spotify_title(&oembed.title);
        Ok(TrackInfo {
            title,
            artist,
            thumbnail: oembed.thumbnail_url.unwrap_or_default(),
            embed_url: format!("https://open.spotify.com/embed/track/{track_id}"),
            platform: Platform::Spotify,
        })
    }

    async fn resolve_youtube(&self, url: &str) -> EarshotResult<TrackInfo> {
        let url = to_plain_youtube(url);
        let video_id = parse_youtube_video_id(&url).ok_or_else(|| {
            EarshotError::UnsupportedInput(format!("not a youtube video link: {url}"))
        })?;
        let embed_url = format!("https://www.youtube.com/embed/{video_id}");

        let oembed: EarshotResult<OembedResponse> = self
            .get_json(
                &self.endpoints.youtube_oembed,
                &[("url", url.as_str()), ("format", "json")],
            )
            .await;
        match oembed {
            Ok(oembed) => {
                let (title, artist) = split_youtube_title(&oembed.title);
                Ok(TrackInfo {
                    title,
                    artist,
                    thumbnail: oembed.thumbnail_url.unwrap_or_default(),
                    embed_url,
                    platform: Platform::Youtube,
                })
            }
            Err(err) => {
                warn!(%video_id, "youtube oembed failed, using placeholder metadata: {err}");
                Ok(TrackInfo {
                    title: "YouTube Video".to_string(),
                    artist: "Unknown".to_string(),
                    thumbnail: String::new(),
                    embed_url,
                    platform: Platform::Youtube,
                })
            }
        }
    }

    async fn resolve_apple(&self, url: &str) -> EarshotResult<TrackInfo> {
        let song_id = parse_apple_music_song_id(url).ok_or_else(|| {
            EarshotError::UnsupportedInput(format!("not an apple music song link: {url}"))
        })?;
        let lookup: ItunesLookupResponse = self
            .get_json(
                &self.endpoints.itunes_lookup,
                &[("id", song_id.as_str()), ("entity", "song")],
            )
            .await?;
        let track = lookup
            .results
            .into_iter()
            .next()
            .filter(|_| lookup.result_count > 0)
            .ok_or_else(|| EarshotError::NotFound(format!("itunes has no song {song_id}")))?;
        Ok(TrackInfo {
            title: track.track_name,
            artist: track.artist_name,
            thumbnail: track.artwork_url_100.replace("100x100", "300x300"),
            embed_url: apple_music_embed_url(url).unwrap_or_else(|| url.to_string()),
            platform: Platform::Apple,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> EarshotResult<T> {
        let response = self
            .client
            .get(endpoint)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| EarshotError::Network(format!("metadata request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EarshotError::Api(format!(
                "metadata error: status={status} body={body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| EarshotError::Parse(format!("metadata response parse failed: {err}")))
    }
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItunesLookupResponse {
    #[serde(rename = "resultCount")]
    result_count: u32,
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Debug, Deserialize)]
struct ItunesTrack {
    #[serde(rename = "trackName")]
    track_name: String,
    #[serde(rename = "artistName")]
    artist_name: String,
    #[serde(rename = "artworkUrl100", default)]
    artwork_url_100: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn resolver_for(server: &Server) -> TrackResolver {
        let base = server.url();
        TrackResolver::with_endpoints(
            Client::new(),
            ResolverEndpoints {
                spotify_oembed: format!("{base}/spotify/oembed"),
                youtube_oembed: format!("{base}/youtube/oembed"),
                itunes_lookup: format!("{base}/lookup"),
            },
        )
    }

    #[tokio::test]
    async fn resolves_spotify_from_uri() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/spotify/oembed")
            .match_query(Matcher::UrlEncoded(
                "url".into(),
                "https://open.spotify.com/track/abc123".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"title":"Song · Band","thumbnail_url":"https://i.scdn.co/x"}"#)
            .create_async()
            .await;

        let info = resolver_for(&server)
            .resolve("spotify:track/abc123")
            .await
            .expect("spotify track should resolve");

        mock.assert_async().await;
        assert_eq!(info.title, "Song");
        assert_eq!(info.artist, "Band");
        assert_eq!(info.embed_url, "https://open.spotify.com/embed/track/abc123");
        assert_eq!(info.platform, Platform::Spotify);
    }

    #[tokio::test]
    async fn youtube_falls_back_when_oembed_fails() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/youtube/oembed")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let info = resolver_for(&server)
            .resolve("https://youtu.be/dQw4w9WgXcQ")
            .await
            .expect("youtube always resolves");

        mock.assert_async().await;
        assert_eq!(info.title, "YouTube Video");
        assert_eq!(info.artist, "Unknown");
        assert_eq!(info.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn youtube_title_is_split() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/youtube/oembed")
            .match_query(Matcher::UrlEncoded("format".into(), "json".into()))
            .with_status(200)
            .with_body(r#"{"title":"Rick Astley - Never Gonna Give You Up","thumbnail_url":"t"}"#)
            .create_async()
            .await;

        let info = resolver_for(&server)
            .resolve("https://music.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(info.artist, "Rick Astley");
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.thumbnail, "t");
    }

    #[tokio::test]
    async fn apple_lookup_upgrades_artwork() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/lookup")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "1496794038".into()),
                Matcher::UrlEncoded("entity".into(), "song".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"resultCount":1,"results":[{"trackName":"Blinding Lights","artistName":"The Weeknd","artworkUrl100":"https://a/100x100bb.jpg"}]}"#,
            )
            .create_async()
            .await;

        let info = resolver_for(&server)
            .resolve("https://music.apple.com/us/song/1496794038")
            .await
            .unwrap();

        assert_eq!(info.title, "Blinding Lights");
        assert_eq!(info.thumbnail, "https://a/300x300bb.jpg");
        assert_eq!(info.embed_url, "https://music.apple.com/us/embed/song/1496794038");
    }

    #[tokio::test]
    async fn apple_lookup_without_results_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultCount":0,"results":[]}"#)
            .create_async()
            .await;

        let result = resolver_for(&server)
            .resolve("https://music.apple.com/us/song/1")
            .await;
        assert!(matches!(result, Err(EarshotError::NotFound(_))));
    }

    #[tokio::test]
    async fn album_links_are_unsupported_without_lookup() {
        let mut server = Server::new_async().await;
        let lookup = server
            .mock("GET", "/lookup")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = resolver_for(&server)
            .resolve("https://music.apple.com/us/album/blinding-lights/1496794033")
            .await;

        lookup.assert_async().await;
        assert!(matches!(result, Err(EarshotError::UnsupportedInput(_))));
    }

    #[tokio::test]
    async fn unknown_links_are_rejected_without_requests() {
        let server = Server::new_async().await;
        let result = resolver_for(&server).resolve("https://example.com").await;
        assert!(matches!(result, Err(EarshotError::UnsupportedInput(_))));
    }
}
