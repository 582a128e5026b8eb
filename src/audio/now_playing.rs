//! Render del mensaje "reproduciendo ahora".
//!
//! El estado mostrado vive en [`NowPlayingCache`], separado del handler, y
//! se alimenta con un [`PlaybackSnapshot`] inmutable. Solo se reconstruye el
//! mensaje cuando algo visible cambió; si no, se devuelve el último tal cual.

use serenity::model::id::UserId;
use std::time::Duration;
use tracing::debug;

use crate::{
    audio::track::{markdown_link, AudioTrack},
    ui::format::{format_time, progress_bar, volume_icon, PAUSE_EMOJI, PLAY_EMOJI, STOP_EMOJI},
};

/// Imagen que se muestra cuando no suena nada
pub const IDLE_IMAGE: &str = "https://img.youtube.com/vi/u8PGSCmXjNw/mqdefault.jpg";

// Discord rechaza campos con valor vacío
const BLANK: &str = "\u{200B}";

const NOTHING_NEXT: &str = "Nothing next in queue";

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            value: if value.is_empty() { BLANK.to_string() } else { value },
            inline,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct NowPlayingEmbed {
    pub colour: Option<u32>,
    pub image: Option<String>,
    pub fields: Vec<EmbedField>,
}

/// Botones del reproductor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub enum Control {
    Pause,
    Play,
    Skip,
    Stop,
}

impl Control {
    pub const ALL: [Control; 4] = [Control::Pause, Control::Play, Control::Skip, Control::Stop];

    pub fn custom_id(self) -> &'static str {
        match self {
            Control::Pause => "pause",
            Control::Play => "play",
            Control::Skip => "skip",
            Control::Stop => "stop",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Control::Pause => "Pause",
            Control::Play => "Play",
            Control::Skip => "Skip",
            Control::Stop => "Stop",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|control| control.custom_id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct ControlButton {
    pub control: Control,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct NowPlayingMessage {
    pub embed: NowPlayingEmbed,
    pub controls: Vec<ControlButton>,
}

fn controls(disabled: bool) -> Vec<ControlButton> {
    Control::ALL
        .into_iter()
        .map(|control| ControlButton { control, disabled })
        .collect()
}

/// Estado del reproductor en el instante del render
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub track: AudioTrack,
    pub requester: Option<UserId>,
    pub paused: bool,
    pub volume: u32,
    pub position: Duration,
    pub next: Option<AudioTrack>,
    pub colour: Option<u32>,
}

impl PlaybackSnapshot {
    fn status_emoji(&self) -> &'static str {
        if self.paused {
            PAUSE_EMOJI
        } else {
            PLAY_EMOJI
        }
    }

    fn progress(&self) -> f64 {
        match self.track.info().length {
            Some(length) if !length.is_zero() => {
                self.position.as_secs_f64() / length.as_secs_f64()
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Unrendered,
    Idle,
    Track(String),
}

/// Caché del último mensaje enviado, invalidada campo por campo
#[derive(Debug)]
pub struct NowPlayingCache {
    shown: Shown,
    base: NowPlayingEmbed,
    volume: Option<u32>,
    paused: Option<bool>,
    next: String,
    last: Option<NowPlayingMessage>,
    updated: bool,
}

impl Default for NowPlayingCache {
    fn default() -> Self {
        Self {
            shown: Shown::Unrendered,
            base: NowPlayingEmbed::default(),
            volume: None,
            paused: None,
            next: String::new(),
            last: None,
            updated: false,
        }
    }
}

impl NowPlayingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Si el último render reconstruyó el mensaje
    pub fn updated(&self) -> bool {
        self.updated
    }

    pub fn render_playing(&mut self, snapshot: &PlaybackSnapshot) -> NowPlayingMessage {
        let info = snapshot.track.info();
        // Mientras suena, el progreso avanza en cada render
        let mut dirty = !snapshot.paused;

        if self.shown != Shown::Track(info.title.clone()) {
            self.shown = Shown::Track(info.title.clone());
            self.base = NowPlayingEmbed {
                colour: snapshot.colour,
                image: info.thumbnail(),
                fields: Vec::new(),
            };
            dirty = true;
        }

        if self.paused != Some(snapshot.paused) {
            self.paused = Some(snapshot.paused);
            dirty = true;
        }

        if self.volume != Some(snapshot.volume) {
            self.volume = Some(snapshot.volume);
            dirty = true;
        }

        let next_title = snapshot
            .next
            .as_ref()
            .map(|next| next.info().title.clone())
            .unwrap_or_default();
        if self.next != next_title {
            self.next = next_title;
            dirty = true;
        }

        self.updated = dirty;
        if let (false, Some(last)) = (dirty, &self.last) {
            debug!("Now playing sin cambios, reutilizando mensaje");
            return last.clone();
        }

        let mut embed = self.base.clone();
        let state = if snapshot.paused { "Paused" } else { "Playing" };
        embed.fields.push(EmbedField::new(
            format!("Currently {}", state),
            info.markdown_link(),
            false,
        ));

        if let Some(author) = info.author.as_deref().filter(|a| !a.is_empty()) {
            embed.fields.push(EmbedField::new("By", author, false));
        }

        if let Some(user) = snapshot.requester {
            embed
                .fields
                .push(EmbedField::new("Requested By", format!("<@{}>", user), false));
        }

        let next_value = match &snapshot.next {
            Some(next) => markdown_link(&next.info().title, &next.info().uri),
            None => NOTHING_NEXT.to_string(),
        };
        embed.fields.push(EmbedField::new("Next", next_value, false));

        embed
            .fields
            .push(EmbedField::new("Volume", format!("{}%", snapshot.volume), true));

        embed.fields.push(EmbedField::new(
            BLANK,
            format!(
                "{} {} `[{}/{}]` {}",
                snapshot.status_emoji(),
                progress_bar(snapshot.progress()),
                format_time(Some(snapshot.position)),
                format_time(info.length),
                volume_icon(snapshot.volume)
            ),
            false,
        ));

        let message = NowPlayingMessage {
            embed,
            controls: controls(false),
        };
        self.last = Some(message.clone());
        message
    }

    pub fn render_idle(&mut self, volume: u32, colour: Option<u32>) -> NowPlayingMessage {
        let mut dirty = false;

        if self.shown != Shown::Idle {
            self.shown = Shown::Idle;
            self.base = NowPlayingEmbed {
                colour,
                image: Some(IDLE_IMAGE.to_string()),
                fields: Vec::new(),
            };
            self.paused = None;
            dirty = true;
        }

        if self.volume != Some(volume) {
            self.volume = Some(volume);
            dirty = true;
        }

        self.updated = dirty;
        if let (false, Some(last)) = (dirty, &self.last) {
            return last.clone();
        }

        let mut embed = self.base.clone();
        embed.fields = vec![
            EmbedField::new("Currently Playing", "", false),
            EmbedField::new("By", "", false),
            EmbedField::new("Requested By", "", false),
            EmbedField::new("Next", "", false),
            EmbedField::new("Volume", format!("{}%", volume), true),
            EmbedField::new(BLANK, "", false),
        ];

        let message = NowPlayingMessage {
            embed,
            controls: controls(true),
        };
        self.last = Some(message.clone());
        message
    }
}

/// Línea corta para el tema del canal
pub fn render_topic(snapshot: Option<&PlaybackSnapshot>, volume: u32) -> String {
    let Some(snapshot) = snapshot else {
        return format!("No music playing {} {}", STOP_EMOJI, volume_icon(volume));
    };

    let info = snapshot.track.info();
    let title = if info.title.is_empty() || info.title == "Unknown Title" {
        info.uri.as_str()
    } else {
        info.title.as_str()
    };
    let requester = snapshot
        .requester
        .map(|user| format!("<@{}>", user))
        .unwrap_or_else(|| "autoplay".to_string());

    format!(
        "**{}** [{}]\n{} [{}] {}",
        title,
        requester,
        snapshot.status_emoji(),
        format_time(info.length),
        volume_icon(snapshot.volume)
    )
}
