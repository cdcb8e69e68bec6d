use super::{StreamingProvider, TrackCandidate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Refresh this long before the provider says the token expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// How the client obtains bearer tokens
#[derive(Debug, Clone)]
pub enum SpotifyCredentials {
    AccessToken(String),
    RefreshToken {
        refresh_token: String,
        client_id: String,
        client_secret: String,
    },
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    uri: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    accounts_url: String,
    credentials: SpotifyCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        api_base: &str,
        accounts_url: &str,
        credentials: SpotifyCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build streaming HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            accounts_url: accounts_url.to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let (refresh_token, client_id, client_secret) = match &self.credentials {
            SpotifyCredentials::AccessToken(token) => return Ok(token.clone()),
            SpotifyCredentials::RefreshToken {
                refresh_token,
                client_id,
                client_secret,
            } => (refresh_token, client_id, client_secret),
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = &*cached {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Refreshing streaming access token");
        let response = self
            .http
            .post(&self.accounts_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .context("Token refresh request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Token endpoint returned status: {}", response.status());
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl StreamingProvider for SpotifyClient {
    async fn search(&self, query: &str) -> Result<Vec<TrackCandidate>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/search", self.api_base))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .context("Search request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Search returned status: {}", response.status());
        }

        let page: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(candidates(page))
    }

    async fn start_playback(&self, track_uri: &str) -> Result<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .put(format!("{}/me/player/play", self.api_base))
            .bearer_auth(token)
            .json(&serde_json::json!({ "uris": [track_uri] }))
            .send()
            .await
            .context("Playback request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Playback returned status {}: {}", status, body.trim());
        }

        Ok(())
    }
}

fn candidates(page: SearchResponse) -> Vec<TrackCandidate> {
    page.tracks
        .items
        .into_iter()
        .map(|item| TrackCandidate {
            uri: item.uri,
            name: item.name,
        })
        .collect()
}
