pub mod spotify;

pub use spotify::{SpotifyClient, SpotifyCredentials};

use anyhow::Result;
use async_trait::async_trait;

/// Result of asking the streaming provider to play a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Started,
    NotFound,
    DispatchError(String),
}

/// A track the streaming provider can play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCandidate {
    pub uri: String,
    pub name: String,
}

/// Search and playback calls against an authenticated streaming session
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<TrackCandidate>>;
    async fn start_playback(&self, track_uri: &str) -> Result<()>;
}

/// Starts playback of an identified track
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, title: &str, artist: &str) -> DispatchOutcome;
}

/// Searches for "title artist" and plays the first candidate on the active target
pub struct PlaybackDispatcher<P> {
    provider: P,
}

impl<P: StreamingProvider> PlaybackDispatcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: StreamingProvider> Dispatcher for PlaybackDispatcher<P> {
    async fn dispatch(&self, title: &str, artist: &str) -> DispatchOutcome {
        let query = format!("{} {}", title, artist);

        let candidates = match self.provider.search(&query).await {
            Ok(candidates) => candidates,
            Err(e) => return DispatchOutcome::DispatchError(format!("{:#}", e)),
        };

        let Some(track) = candidates.into_iter().next() else {
            tracing::debug!("No streaming candidate for query {:?}", query);
            return DispatchOutcome::NotFound;
        };

        tracing::debug!("Starting playback of {} ({})", track.name, track.uri);
        match self.provider.start_playback(&track.uri).await {
            Ok(()) => DispatchOutcome::Started,
            Err(e) => DispatchOutcome::DispatchError(format!("{:#}", e)),
        }
    }
}
