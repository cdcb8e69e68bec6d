use super::{IdentificationResult, Identifier, Signer};
use crate::audio::AudioClip;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HTTP_METHOD: &str = "POST";
const HTTP_URI: &str = "/v1/identify";
const DATA_TYPE: &str = "audio";
const SIGNATURE_VERSION: &str = "1";

const STATUS_SUCCESS: i64 = 0;
const STATUS_NO_RESULT: i64 = 1001;

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    status: Status,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    music: Vec<Music>,
}

#[derive(Debug, Deserialize)]
struct Music {
    title: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

/// Client for the ACRCloud identify endpoint
pub struct AcrCloudIdentifier {
    http: reqwest::Client,
    endpoint: String,
    access_key: String,
    signer: Box<dyn Signer>,
}

impl AcrCloudIdentifier {
    pub fn new(
        host: &str,
        access_key: &str,
        signer: Box<dyn Signer>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build identify HTTP client")?;

        Ok(Self {
            http,
            endpoint: identify_endpoint(host),
            access_key: access_key.to_string(),
            signer,
        })
    }

    async fn submit(&self, clip: &AudioClip) -> Result<serde_json::Value> {
        let wav = clip.to_wav().context("Failed to encode clip")?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_secs()
            .to_string();

        let signature = self
            .signer
            .sign(&string_to_sign(&self.access_key, &timestamp));

        let sample_bytes = wav.len().to_string();
        let sample = Part::bytes(wav)
            .file_name("sample.wav")
            .mime_str("audio/wav")
            .context("Invalid sample MIME type")?;

        let form = Form::new()
            .text("access_key", self.access_key.clone())
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION)
            .text("signature", signature)
            .text("sample_bytes", sample_bytes)
            .text("timestamp", timestamp)
            .part("sample", sample);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("Identify request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Identify endpoint returned status: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse identify response")
    }
}

#[async_trait]
impl Identifier for AcrCloudIdentifier {
    async fn identify(&self, clip: AudioClip) -> IdentificationResult {
        tracing::debug!(
            "Submitting {:.1}s clip for identification ({} samples, {} Hz, {} channel(s))",
            clip.duration_seconds(),
            clip.samples().len(),
            clip.sample_rate(),
            clip.channel_count()
        );

        match self.submit(&clip).await {
            Ok(body) => interpret(body),
            Err(e) => IdentificationResult::service_error(format!("{:#}", e)),
        }
    }
}

/// A bare host gets https; a host that already names a scheme is kept as is
fn identify_endpoint(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        format!("{}{}", host, HTTP_URI)
    } else {
        format!("https://{}{}", host, HTTP_URI)
    }
}

fn string_to_sign(access_key: &str, timestamp: &str) -> String {
    [
        HTTP_METHOD,
        HTTP_URI,
        access_key,
        DATA_TYPE,
        SIGNATURE_VERSION,
        timestamp,
    ]
    .join("\n")
}

/// Map a decoded response body onto an identification result
pub fn interpret(body: serde_json::Value) -> IdentificationResult {
    let response: IdentifyResponse = match serde_json::from_value(body.clone()) {
        Ok(response) => response,
        Err(e) => return IdentificationResult::service_error(format!("Malformed response: {}", e)),
    };

    match response.status.code {
        STATUS_SUCCESS => {}
        STATUS_NO_RESULT => return IdentificationResult::NoMatch,
        code => {
            return IdentificationResult::service_error(format!(
                "Service reported {}: {}",
                code, response.status.msg
            ));
        }
    }

    let music = response.metadata.map(|m| m.music).unwrap_or_default();
    let Some(best) = top_ranked(&music) else {
        return IdentificationResult::NoMatch;
    };

    match (&best.title, best.artists.first()) {
        (Some(title), Some(artist)) => IdentificationResult::Matched {
            title: title.clone(),
            artist: artist.name.clone(),
            raw_payload: body,
        },
        _ => IdentificationResult::service_error("Match is missing title or artist"),
    }
}

/// Highest score wins; the service's own order breaks ties
fn top_ranked(music: &[Music]) -> Option<&Music> {
    music.iter().fold(None, |best: Option<&Music>, candidate| match best {
        Some(best) if candidate.score.unwrap_or(f64::MIN) <= best.score.unwrap_or(f64::MIN) => {
            Some(best)
        }
        _ => Some(candidate),
    })
}
