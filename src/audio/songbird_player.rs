use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use songbird::{
    input::YoutubeDl,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tracing::{debug, error, info, warn};

use crate::audio::{
    equalizer::EqualizerFactory,
    manager::PlayerFactory,
    player::{AudioEventListener, AudioFrame, AudioPlayer},
    track::{AudioTrack, TrackEndReason},
};

/// Estado de un track compartido por sus relays de eventos
#[derive(Debug, Default)]
struct TrackLifecycle {
    id: u64,
    replaced: AtomicBool,
    started: AtomicBool,
    ended: AtomicBool,
}

impl TrackLifecycle {
    fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// `true` solo la primera vez; el track puede volverse reproducible de nuevo tras un seek
    fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// Motivo de fin, reportado una sola vez por track
    fn end(&self, mode: &PlayMode) -> Option<TrackEndReason> {
        let reason = end_reason(mode, self.replaced.load(Ordering::SeqCst))?;
        (!self.ended.swap(true, Ordering::SeqCst)).then_some(reason)
    }
}

fn end_reason(mode: &PlayMode, replaced: bool) -> Option<TrackEndReason> {
    match mode {
        PlayMode::End => Some(TrackEndReason::Finished),
        PlayMode::Stop if replaced => Some(TrackEndReason::Replaced),
        PlayMode::Stop => Some(TrackEndReason::Stopped),
        PlayMode::Errored(_) => Some(TrackEndReason::LoadFailed),
        _ => None,
    }
}

struct Playing<H = TrackHandle> {
    lifecycle: Arc<TrackLifecycle>,
    track: AudioTrack,
    handle: H,
}

/// Vacía el slot solo si sigue sonando el track `id`
fn clear_if_current<H>(slot: &mut Option<Playing<H>>, id: u64) -> bool {
    slot.take_if(|playing| playing.lifecycle.id == id).is_some()
}

#[derive(Default)]
struct PlayerState {
    current: Mutex<Option<Playing>>,
    next_id: AtomicU64,
    paused: AtomicBool,
    volume: AtomicU32,
    filter: Mutex<Option<Arc<EqualizerFactory>>>,
    listeners: Mutex<Vec<Weak<dyn AudioEventListener>>>,
}

impl PlayerState {
    fn listeners(&self) -> Vec<Arc<dyn AudioEventListener>> {
        let mut listeners = self.listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Reproductor sobre un `Call` de songbird.
///
/// Songbird decodifica y mezcla por su cuenta; aquí solo se traduce el
/// contrato de [`AudioPlayer`] y se reenvían los eventos de cada track.
pub struct SongbirdPlayer {
    call: Arc<tokio::sync::Mutex<Call>>,
    client: reqwest::Client,
    state: Arc<PlayerState>,
}

impl SongbirdPlayer {
    pub fn new(call: Arc<tokio::sync::Mutex<Call>>, client: reqwest::Client) -> Self {
        let state = PlayerState {
            volume: AtomicU32::new(100),
            ..Default::default()
        };

        Self {
            call,
            client,
            state: Arc::new(state),
        }
    }

    fn current_handle(&self) -> Option<TrackHandle> {
        self.state.current.lock().as_ref().map(|p| p.handle.clone())
    }
}

#[async_trait]
impl AudioPlayer for SongbirdPlayer {
    fn playing_track(&self) -> Option<AudioTrack> {
        self.state.current.lock().as_ref().map(|p| p.track.clone())
    }

    async fn play_track(&self, track: AudioTrack) {
        let previous = self.state.current.lock().take();
        if let Some(previous) = previous {
            previous.lifecycle.replaced.store(true, Ordering::SeqCst);
            if let Err(e) = previous.handle.stop() {
                warn!("No se pudo detener el track anterior: {}", e);
            }
        }

        let input = YoutubeDl::new(self.client.clone(), track.info().uri.clone());
        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input.into())
        };

        let volume = self.state.volume.load(Ordering::SeqCst);
        if let Err(e) = handle.set_volume(volume as f32 / 100.0) {
            warn!("No se pudo ajustar el volumen: {}", e);
        }
        if self.state.paused.load(Ordering::SeqCst) {
            if let Err(e) = handle.pause() {
                warn!("No se pudo pausar el track: {}", e);
            }
        }

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        let lifecycle = Arc::new(TrackLifecycle::new(id));

        // Play solo llega al reanudar; End cubre también los errores
        for event in [TrackEvent::Playable, TrackEvent::End] {
            let relay = TrackEventRelay {
                track: track.clone(),
                state: Arc::downgrade(&self.state),
                lifecycle: Arc::clone(&lifecycle),
            };
            if let Err(e) = handle.add_event(Event::Track(event), relay) {
                error!("Error al agregar event handler: {}", e);
            }
        }

        let equalized = self
            .state
            .filter
            .lock()
            .as_ref()
            .is_some_and(|eq| eq.gains().iter().any(|g| *g != 0.0));
        debug!(
            "🎵 Enviando '{}' a songbird (ecualizador activo: {})",
            track.info().title,
            equalized
        );
        *self.state.current.lock() = Some(Playing {
            lifecycle,
            track,
            handle,
        });
    }

    async fn stop_track(&self) {
        let current = self.state.current.lock().take();
        if let Some(current) = current {
            if let Err(e) = current.handle.stop() {
                warn!("No se pudo detener el track: {}", e);
            }
            info!("⏹️ Track detenido: {}", current.track.info().title);
        }
    }

    fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    fn set_paused(&self, paused: bool) {
        self.state.paused.store(paused, Ordering::SeqCst);
        if let Some(handle) = self.current_handle() {
            let result = if paused { handle.pause() } else { handle.play() };
            if let Err(e) = result {
                warn!("No se pudo cambiar la pausa: {}", e);
            }
        }
    }

    fn volume(&self) -> u32 {
        self.state.volume.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: u32) {
        let volume = volume.min(150);
        self.state.volume.store(volume, Ordering::SeqCst);
        if let Some(handle) = self.current_handle() {
            if let Err(e) = handle.set_volume(volume as f32 / 100.0) {
                warn!("No se pudo ajustar el volumen: {}", e);
            }
        }
    }

    async fn position(&self) -> Duration {
        let Some(handle) = self.current_handle() else {
            return Duration::ZERO;
        };
        match handle.get_info().await {
            Ok(info) => info.position,
            Err(_) => Duration::ZERO,
        }
    }

    // Songbird no expone el PCM antes del encoder; la fábrica queda guardada
    fn set_filter_factory(&self, factory: Option<Arc<EqualizerFactory>>) {
        *self.state.filter.lock() = factory;
    }

    fn provide(&self) -> Option<AudioFrame> {
        None
    }

    fn add_listener(&self, listener: Weak<dyn AudioEventListener>) {
        self.state.listeners.lock().push(listener);
    }
}

/// Reenvía los eventos de un track de songbird a los listeners
struct TrackEventRelay {
    track: AudioTrack,
    state: Weak<PlayerState>,
    lifecycle: Arc<TrackLifecycle>,
}

#[async_trait]
impl VoiceEventHandler for TrackEventRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };
        let state = self.state.upgrade()?;
        let (track_state, _) = tracks.first()?;

        if !track_state.playing.is_done() {
            if self.lifecycle.mark_started() {
                for listener in state.listeners() {
                    listener.on_track_start(self.track.clone()).await;
                }
            }
            return None;
        }

        let reason = self.lifecycle.end(&track_state.playing)?;
        if let PlayMode::Errored(e) = &track_state.playing {
            error!("❌ Error en track '{}': {:?}", self.track.info().title, e);
        }

        clear_if_current(&mut state.current.lock(), self.lifecycle.id);

        for listener in state.listeners() {
            listener.on_track_end(self.track.clone(), reason).await;
        }
        None
    }
}

/// Fábrica de reproductores para el [`PlayerManager`](crate::audio::manager::PlayerManager).
///
/// Usa el `Call` del servidor, creándolo si hace falta; la conexión de voz
/// se establece después con `join`.
pub fn player_factory(songbird: Arc<Songbird>, client: reqwest::Client) -> PlayerFactory {
    Box::new(move |guild_id: GuildId| {
        let call = songbird.get_or_insert(guild_id);
        Arc::new(SongbirdPlayer::new(call, client.clone())) as Arc<dyn AudioPlayer>
    })
}
