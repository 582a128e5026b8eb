use async_trait::async_trait;
use songbird::input::{AuxMetadata, Compose, YoutubeDl};
use tracing::{debug, info};

use crate::{
    audio::track::{AudioTrack, TrackInfo},
    error::{MusicError, MusicResult},
};

/// Resuelve identificadores (URL o búsqueda) a tracks reproducibles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackLoader: Send + Sync {
    async fn load_item(&self, identifier: &str) -> MusicResult<Vec<AudioTrack>>;
}

/// Loader basado en yt-dlp a través de songbird
#[derive(Debug, Clone)]
pub struct YtDlpLoader {
    client: reqwest::Client,
}

impl YtDlpLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TrackLoader for YtDlpLoader {
    async fn load_item(&self, identifier: &str) -> MusicResult<Vec<AudioTrack>> {
        let mut source = if url::Url::parse(identifier).is_ok() {
            YoutubeDl::new(self.client.clone(), identifier.to_string())
        } else {
            debug!("🔍 Buscando en YouTube: {}", identifier);
            YoutubeDl::new_search(self.client.clone(), identifier.to_string())
        };

        let metadata = source.aux_metadata().await.map_err(|e| MusicError::Load {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })?;

        let Some(info) = track_info(identifier, metadata) else {
            return Err(MusicError::NoMatches(identifier.to_string()));
        };

        info!("🎵 Track resuelto: {}", info.title);
        Ok(vec![AudioTrack::new(info)])
    }
}

fn track_info(identifier: &str, metadata: AuxMetadata) -> Option<TrackInfo> {
    // Una búsqueda sin resultados no trae URL de origen
    let uri = match metadata.source_url {
        Some(uri) => uri,
        None if url::Url::parse(identifier).is_ok() => identifier.to_string(),
        None => return None,
    };

    let title = metadata
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());

    let mut info = TrackInfo::new(title, uri);
    if let Some(author) = metadata.artist.or(metadata.channel) {
        info = info.with_author(author);
    }
    // yt-dlp no informa duración para directos
    if let Some(length) = metadata.duration.filter(|d| !d.is_zero()) {
        info = info.with_length(length);
    }
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_metadata_to_track_info() {
        let metadata = AuxMetadata {
            title: Some("Song".to_string()),
            channel: Some("Channel".to_string()),
            duration: Some(Duration::from_secs(180)),
            source_url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            ..Default::default()
        };

        let info = track_info("some search", metadata).unwrap();
        assert_eq!(info.title, "Song");
        assert_eq!(info.author.as_deref(), Some("Channel"));
        assert_eq!(info.length, Some(Duration::from_secs(180)));
        assert_eq!(info.identifier, "abc");
    }

    #[test]
    fn test_missing_metadata_fallbacks() {
        let info = track_info("https://radio.example/live", AuxMetadata::default()).unwrap();
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.uri, "https://radio.example/live");
        assert!(info.is_stream());

        assert!(track_info("nothing found", AuxMetadata::default()).is_none());
    }
}
