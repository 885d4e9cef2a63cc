mod error;
mod platform;
mod result;

pub use error::{EarshotError, EarshotResult};
pub use platform::Platform;
pub use result::{ParsedMusicUrl, TrackInfo};

pub fn validate_url(url: &str) -> EarshotResult<()> {
    url::Url::parse(url)
        .map_err(|err| EarshotError::InvalidInput(format!("invalid url: {err}")))?;
    Ok(())
}
