pub mod acrcloud;
pub mod signer;

pub use acrcloud::AcrCloudIdentifier;
pub use signer::{HmacSha1Signer, Signer};

use crate::audio::AudioClip;
use async_trait::async_trait;

/// What the fingerprint service made of one clip
#[derive(Debug, Clone, PartialEq)]
pub enum IdentificationResult {
    Matched {
        title: String,
        artist: String,
        raw_payload: serde_json::Value,
    },
    NoMatch,
    ServiceError {
        cause: String,
    },
}

impl IdentificationResult {
    #[cfg(test)]
    pub fn matched(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self::Matched {
            title: title.into(),
            artist: artist.into(),
            raw_payload: serde_json::Value::Null,
        }
    }

    pub fn service_error(cause: impl Into<String>) -> Self {
        Self::ServiceError {
            cause: cause.into(),
        }
    }
}

/// Turns a captured clip into an identification
///
/// Never fails past this boundary: transport and decoding problems come back
/// as [`IdentificationResult::ServiceError`].
#[async_trait]
pub trait Identifier: Send + Sync {
    async fn identify(&self, clip: AudioClip) -> IdentificationResult;
}
