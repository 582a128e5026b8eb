use serenity::model::id::UserId;
use std::{sync::Arc, time::Duration};

/// Origen del track, usado para miniaturas y enlaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    YouTube,
    Http,
    Other,
}

impl SourceKind {
    /// Detecta el origen a partir de la URL
    pub fn detect(uri: &str) -> Self {
        match url::Url::parse(uri) {
            Ok(parsed) => match parsed.host_str() {
                Some(host)
                    if host.ends_with("youtube.com") || host.ends_with("youtu.be") =>
                {
                    SourceKind::YouTube
                }
                Some(_) => SourceKind::Http,
                None => SourceKind::Other,
            },
            Err(_) => SourceKind::Other,
        }
    }
}

/// Metadatos inmutables de un track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub title: String,
    pub author: Option<String>,
    pub uri: String,
    pub identifier: String,
    /// `None` para transmisiones en vivo
    pub length: Option<Duration>,
    pub source: SourceKind,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let source = SourceKind::detect(&uri);
        let identifier = youtube_video_id(&uri).unwrap_or_else(|| uri.clone());

        Self {
            title: title.into(),
            author: None,
            uri,
            identifier,
            length: None,
            source,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }

    pub fn is_stream(&self) -> bool {
        self.length.is_none()
    }

    /// Miniatura de YouTube, si aplica
    pub fn thumbnail(&self) -> Option<String> {
        match self.source {
            SourceKind::YouTube => Some(format!(
                "https://img.youtube.com/vi/{}/mqdefault.jpg",
                self.identifier
            )),
            _ => None,
        }
    }

    /// Enlace markdown `[titulo](uri)`, o el título plano si la URI no es válida
    pub fn markdown_link(&self) -> String {
        markdown_link(&self.title, &self.uri)
    }
}

pub(crate) fn markdown_link(title: &str, uri: &str) -> String {
    match url::Url::parse(uri) {
        Ok(_) => format!("[{}]({})", title, uri),
        Err(_) => title.to_string(),
    }
}

fn youtube_video_id(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(uri).ok()?;
    let host = parsed.host_str()?;

    if host.ends_with("youtu.be") {
        return parsed
            .path_segments()?
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    if host.ends_with("youtube.com") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());
    }

    None
}

/// Quién pidió un track. Vacío significa autoplay (playlist por defecto).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub user: Option<RequestUser>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUser {
    pub id: UserId,
    pub name: String,
}

impl RequestMetadata {
    pub const EMPTY: RequestMetadata = RequestMetadata { user: None };

    pub fn from_user(id: UserId, name: impl Into<String>) -> Self {
        Self {
            user: Some(RequestUser {
                id,
                name: name.into(),
            }),
        }
    }

    pub fn owner(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Handle de un track decodificable por el reproductor.
///
/// Los metadatos se comparten; `make_clone` produce un handle nuevo que
/// empieza desde el principio.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    info: Arc<TrackInfo>,
    user_data: Option<RequestMetadata>,
}

impl AudioTrack {
    pub fn new(info: TrackInfo) -> Self {
        Self {
            info: Arc::new(info),
            user_data: None,
        }
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn user_data(&self) -> Option<&RequestMetadata> {
        self.user_data.as_ref()
    }

    pub fn set_user_data(&mut self, data: RequestMetadata) {
        self.user_data = Some(data);
    }

    /// Si ambos handles vienen de la misma carga
    pub fn is_same(&self, other: &AudioTrack) -> bool {
        Arc::ptr_eq(&self.info, &other.info)
    }

    pub fn make_clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            user_data: self.user_data.clone(),
        }
    }
}

/// Motivo por el que terminó un track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
}

/// Pedido en espera dentro de la cola justa
#[derive(Debug, Clone)]
pub struct QueuedTrack {
    track: AudioTrack,
    metadata: RequestMetadata,
}

impl QueuedTrack {
    pub fn new(mut track: AudioTrack, metadata: RequestMetadata) -> Self {
        track.set_user_data(metadata.clone());
        Self { track, metadata }
    }

    pub fn track(&self) -> &AudioTrack {
        &self.track
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    pub fn into_track(self) -> AudioTrack {
        self.track
    }
}

impl crate::audio::fair_queue::Queueable for QueuedTrack {
    fn identifier(&self) -> u64 {
        self.metadata.owner().map(|id| id.get()).unwrap_or(0)
    }
}
