pub mod api;
pub mod classifier;
pub mod parsers;
pub mod title;

pub use api::oembed::{ResolverEndpoints, TrackResolver};
pub use classifier::{classify, detect_platform, extract_url_from_text, parse_music_url};
pub use earshot_core::{ParsedMusicUrl, Platform};
