mod types;

use std::time::Duration;

use earshot_core::{EarshotError, EarshotResult, validate_url};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

pub use types::{
    CrateResponse, FeedPost, FeedType, FollowResponse, LoginRequest, PostSummary, Profile,
    Session, User,
};
use types::{ErrorBody, LoginResponse, PostResponse};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client for the Earshot backend.
///
/// Network failures and timeouts are retried `retries` times with a fixed
/// pause; HTTP error statuses are returned immediately.
#[derive(Debug, Clone)]
pub struct EarshotClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    retries: u32,
    retry_delay: Duration,
}

impl EarshotClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> EarshotResult<Self> {
        let client = Client::builder()
            .user_agent("earshot/0.1")
            .timeout(timeout)
            .build()
            .map_err(|err| EarshotError::Network(format!("failed to build http client: {err}")))?;
        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| EarshotError::Config(format!("invalid api base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(EarshotError::Config(format!(
                "invalid api base url: {base_url} cannot hold a path"
            )));
        }
        Ok(Self {
            client,
            base_url,
            token: None,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn login_device(
        &mut self,
        device_id: &str,
        username: Option<&str>,
    ) -> EarshotResult<Session> {
        if device_id.trim().is_empty() {
            return Err(EarshotError::InvalidInput("device id not available".to_string()));
        }
        let username = username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        info!(%device_id, has_username = username.is_some(), "logging in with device id");
        self.login(&LoginRequest::Device {
            device_id: device_id.to_string(),
            username,
        })
        .await
    }

    pub async fn login_credentials(
        &mut self,
        username: &str,
        password: &str,
    ) -> EarshotResult<Session> {
        info!(%username, "logging in with credentials");
        self.login(&LoginRequest::Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn login(&mut self, request: &LoginRequest) -> EarshotResult<Session> {
        let response: LoginResponse = self
            .send_json(Method::POST, self.endpoint(&["api", "login"])?, request)
            .await?;
        let token = response.token.filter(|token| !token.is_empty()).ok_or_else(|| {
            EarshotError::Api(
                response
                    .error
                    .unwrap_or_else(|| "login failed, try again".to_string()),
            )
        })?;
        self.token = Some(token.clone());
        Ok(Session {
            token,
            user: response.user,
        })
    }

    pub async fn me(&self) -> EarshotResult<User> {
        self.get_json(self.endpoint(&["api", "me"])?).await
    }

    pub async fn feed(&self, feed_type: FeedType) -> EarshotResult<Vec<FeedPost>> {
        let mut url = self.endpoint(&["api", "feed"])?;
        url.query_pairs_mut().append_pair("type", feed_type.as_str());
        let body: serde_json::Value = self.get_json(url).await?;
        if !body.is_array() {
            return Err(EarshotError::Parse(
                "invalid response from server: feed is not an array".to_string(),
            ));
        }
        let posts: Vec<FeedPost> = serde_json::from_value(body)
            .map_err(|err| EarshotError::Parse(format!("feed response parse failed: {err}")))?;
        info!(count = posts.len(), %feed_type, "feed loaded");
        Ok(posts)
    }

    /// Shares a track. `url` should already be a canonical web link.
    pub async fn post_track(&self, url: &str) -> EarshotResult<PostSummary> {
        let url = url.trim();
        if url.is_empty() {
            return Err(EarshotError::InvalidInput("please enter a url to post".to_string()));
        }
        validate_url(url)?;

        #[derive(Serialize)]
        struct PostRequest<'a> {
            url: &'a str,
        }

        let response: PostResponse = self
            .send_json(
                Method::POST,
                self.endpoint(&["api", "post"])?,
                &PostRequest { url },
            )
            .await?;
        match response.post {
            Some(post) if response.success => Ok(post),
            _ => Err(EarshotError::Api(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    pub async fn delete_post(&self, post_id: i64) -> EarshotResult<()> {
        let id = post_id.to_string();
        self.send(Method::DELETE, self.endpoint(&["api", "post", &id])?, None)
            .await?;
        Ok(())
    }

    pub async fn save_to_crate(&self, post_id: i64) -> EarshotResult<CrateResponse> {
        let id = post_id.to_string();
        let response = self
            .send(Method::POST, self.endpoint(&["api", "crate", &id])?, None)
            .await?;
        decode(response).await
    }

    pub async fn remove_from_crate(&self, post_id: i64) -> EarshotResult<CrateResponse> {
        let id = post_id.to_string();
        let response = self
            .send(Method::DELETE, self.endpoint(&["api", "crate", &id])?, None)
            .await?;
        decode(response).await
    }

    pub async fn profile(&self, username: &str) -> EarshotResult<Profile> {
        let username = username.trim().trim_start_matches('@');
        if username.is_empty() {
            return Err(EarshotError::InvalidInput("username is required".to_string()));
        }
        self.get_json(self.endpoint(&["api", "profile", username])?)
            .await
    }

    pub async fn follow(&self, user_id: i64) -> EarshotResult<FollowResponse> {
        let id = user_id.to_string();
        let response = self
            .send(Method::POST, self.endpoint(&["api", "follow", &id])?, None)
            .await?;
        decode(response).await
    }

    pub async fn update_username(&self, username: &str) -> EarshotResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EarshotError::InvalidInput("username is required".to_string()));
        }

        #[derive(Serialize)]
        struct UsernameRequest<'a> {
            username: &'a str,
        }

        self.send_json(
            Method::PUT,
            self.endpoint(&["api", "profile", "username"])?,
            &UsernameRequest { username },
        )
        .await
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> EarshotResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EarshotError::Config(format!("invalid api base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> EarshotResult<T> {
        let response = self.send(Method::GET, url, None).await?;
        decode(response).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> EarshotResult<T> {
        let body = serde_json::to_value(body)
            .map_err(|err| EarshotError::InvalidInput(format!("failed to encode body: {err}")))?;
        let response = self.send(method, url, Some(&body)).await?;
        decode(response).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> EarshotResult<Response> {
        let path = url.path().to_string();
        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, attempt, "sending request");
            let err = match request.send().await {
                Ok(response) => return check_status(response).await,
                Err(err) if err.is_timeout() => {
                    EarshotError::Timeout(format!("{method} {path} timed out"))
                }
                Err(err) => EarshotError::Network(format!("{method} {path} failed: {err}")),
            };

            if attempt >= self.retries || !err.is_transient() {
                return Err(err);
            }
            attempt += 1;
            warn!(retries_left = self.retries - attempt, "retrying request: {err}");
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

async fn check_status(response: Response) -> EarshotResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(EarshotError::Unauthorized),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            Err(EarshotError::ServerUnavailable(status.as_u16()))
        }
        _ => {
            let url = response.url().path().to_string();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            if status == StatusCode::NOT_FOUND {
                Err(EarshotError::NotFound(format!("{url}: {message}")))
            } else {
                Err(EarshotError::Api(message))
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> EarshotResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| EarshotError::Parse(format!("response parse failed: {err}")))
}
