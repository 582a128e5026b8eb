//! Coordinador de reproducción por servidor.
//!
//! [`AudioHandler`] decide qué suena a continuación: la cola justa primero,
//! luego la playlist por defecto del servidor. También es el punto de acceso
//! al render de "reproduciendo ahora" y al puente de frames de audio.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serenity::model::id::{GuildId, UserId};
use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Weak},
};
use tracing::{debug, info, warn};

use crate::{
    audio::{
        equalizer::EqualizerFactory,
        fair_queue::FairQueue,
        loader::TrackLoader,
        now_playing::{render_topic, NowPlayingCache, NowPlayingMessage, PlaybackSnapshot},
        player::{AudioEventListener, AudioFrame, AudioPlayer, AudioSendHandler},
        track::{AudioTrack, QueuedTrack, RequestMetadata, TrackEndReason},
    },
    playlist::PlaylistRegistry,
    settings::{RepeatMode, SettingsManager},
    ui::format::{PAUSE_EMOJI, PLAY_EMOJI, STOP_EMOJI},
};

/// Operaciones que el coordinador necesita de la plataforma de chat
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Si el bot está conectado a un canal de voz en el servidor
    async fn in_voice_channel(&self, guild_id: GuildId) -> bool;

    /// Color del rol del bot, para los embeds
    fn self_colour(&self, guild_id: GuildId) -> Option<u32>;

    async fn close_audio_connection(&self, guild_id: GuildId);

    /// Notifica el track actual; `None` cuando ya no suena nada
    async fn track_update(&self, guild_id: GuildId, track: Option<AudioTrack>);
}

/// Dependencias compartidas por todos los handlers
#[derive(Clone)]
pub struct HandlerServices {
    pub settings: Arc<SettingsManager>,
    pub playlists: Arc<PlaylistRegistry>,
    pub loader: Arc<dyn TrackLoader>,
    pub chat: Arc<dyn ChatClient>,
    pub stay_in_channel: bool,
}

/// Resultado de encolar un pedido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePosition {
    /// Empezó a sonar de inmediato
    NowPlaying,
    /// Índice dentro de la cola
    Queued(usize),
}

#[derive(Default)]
struct QueueState {
    queue: FairQueue<QueuedTrack>,
    default_queue: VecDeque<AudioTrack>,
    votes: HashSet<UserId>,
}

pub struct AudioHandler {
    guild_id: GuildId,
    player: Arc<dyn AudioPlayer>,
    services: HandlerServices,
    equalizer: Arc<EqualizerFactory>,
    state: Mutex<QueueState>,
    now_playing: Mutex<NowPlayingCache>,
    last_frame: Mutex<Option<AudioFrame>>,
}

impl AudioHandler {
    /// Crea el handler y lo registra como listener del reproductor
    pub fn new(
        guild_id: GuildId,
        player: Arc<dyn AudioPlayer>,
        services: HandlerServices,
    ) -> Arc<Self> {
        let equalizer = Arc::new(EqualizerFactory::new());
        player.set_filter_factory(Some(Arc::clone(&equalizer)));
        player.set_volume(services.settings.settings(guild_id).volume);

        let handler = Arc::new(Self {
            guild_id,
            player,
            services,
            equalizer,
            state: Mutex::new(QueueState::default()),
            now_playing: Mutex::new(NowPlayingCache::new()),
            last_frame: Mutex::new(None),
        });

        let weak = Arc::downgrade(&handler);
        let listener: Weak<dyn AudioEventListener> = weak;
        handler.player.add_listener(listener);
        debug!("🎚️ Handler de audio creado para guild {}", guild_id);
        handler
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn player(&self) -> &Arc<dyn AudioPlayer> {
        &self.player
    }

    pub fn equalizer(&self) -> &Arc<EqualizerFactory> {
        &self.equalizer
    }

    /// Encola al final (inserción justa) o reproduce si no suena nada
    pub async fn add_track(&self, queued: QueuedTrack) -> QueuePosition {
        if self.player.playing_track().is_none() {
            self.player.play_track(queued.into_track()).await;
            return QueuePosition::NowPlaying;
        }
        QueuePosition::Queued(self.state.lock().queue.add(queued))
    }

    /// Encola al principio o reproduce si no suena nada
    pub async fn add_track_to_front(&self, queued: QueuedTrack) -> QueuePosition {
        if self.player.playing_track().is_none() {
            self.player.play_track(queued.into_track()).await;
            return QueuePosition::NowPlaying;
        }
        self.state.lock().queue.add_at(0, queued);
        QueuePosition::Queued(0)
    }

    pub async fn stop_and_clear(&self) {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.default_queue.clear();
        }
        self.player.stop_track().await;
        info!("⏹️ Reproducción detenida y cola limpiada en guild {}", self.guild_id);
    }

    pub async fn is_music_playing(&self) -> bool {
        self.services.chat.in_voice_channel(self.guild_id).await
            && self.player.playing_track().is_some()
    }

    /// Metadatos del pedido que está sonando; vacío si no hay track o es autoplay
    pub fn request_metadata(&self) -> RequestMetadata {
        self.player
            .playing_track()
            .and_then(|track| track.user_data().cloned())
            .unwrap_or_default()
    }

    /// Reinstala el ecualizador en el reproductor
    pub fn reset_eq(&self) {
        self.player.set_filter_factory(None);
        self.player.set_filter_factory(Some(Arc::clone(&self.equalizer)));
    }

    /// Registra un voto para saltar; `false` si el usuario ya había votado
    pub fn add_vote(&self, user: UserId) -> bool {
        self.state.lock().votes.insert(user)
    }

    pub fn vote_count(&self) -> usize {
        self.state.lock().votes.len()
    }

    pub fn queue_snapshot(&self) -> Vec<QueuedTrack> {
        self.state.lock().queue.iter().cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn remove_from_queue(&self, index: usize) -> Option<QueuedTrack> {
        self.state.lock().queue.remove(index)
    }

    pub fn remove_all_from(&self, user: UserId) -> usize {
        self.state.lock().queue.remove_all(user.get())
    }

    pub fn shuffle_for(&self, user: UserId) -> usize {
        self.state.lock().queue.shuffle(user.get())
    }

    pub fn move_track(&self, from: usize, to: usize) -> Option<QueuedTrack> {
        self.state.lock().queue.move_item(from, to).cloned()
    }

    /// Descarta los `count` primeros de la cola y corta el track actual
    pub async fn skip_to(&self, count: usize) {
        self.state.lock().queue.skip(count);
        self.player.stop_track().await;
    }

    pub fn status_emoji(&self) -> &'static str {
        match self.player.playing_track() {
            None => STOP_EMOJI,
            Some(_) if self.player.is_paused() => PAUSE_EMOJI,
            Some(_) => PLAY_EMOJI,
        }
    }

    /// Intenta seguir con la playlist por defecto.
    ///
    /// Devuelve `true` si había algo que intentar, aunque la carga no
    /// produzca ningún track. Sin conexión de voz no se intenta nada.
    pub async fn play_from_default(&self) -> bool {
        // Tras un /stop el fin del track puede llegar ya desconectado
        if !self.services.chat.in_voice_channel(self.guild_id).await {
            return false;
        }

        let pending = self.state.lock().default_queue.pop_front();
        if let Some(track) = pending {
            self.player.play_track(track).await;
            return true;
        }

        let settings = self.services.settings.settings(self.guild_id);
        let Some(name) = settings.default_playlist else {
            return false;
        };
        let Some(playlist) = self
            .services
            .playlists
            .get(&name)
            .filter(|p| !p.items.is_empty())
            .cloned()
        else {
            return false;
        };

        info!(
            "📋 Cargando playlist por defecto '{}' ({} items) en guild {}",
            playlist.name,
            playlist.items.len(),
            self.guild_id
        );

        let mut loaded = 0;
        for item in &playlist.items {
            let tracks = match self.services.loader.load_item(item).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    warn!("⚠️ Item de playlist omitido '{}': {}", item, e);
                    continue;
                }
            };

            for track in tracks {
                loaded += 1;
                if self.player.playing_track().is_none() {
                    self.player.play_track(track).await;
                } else {
                    self.state.lock().default_queue.push_back(track);
                }
            }
        }

        if loaded == 0 && !self.services.stay_in_channel {
            warn!("❌ La playlist '{}' no produjo ningún track", playlist.name);
            self.services.chat.close_audio_connection(self.guild_id).await;
        }
        true
    }

    async fn snapshot(&self) -> Option<PlaybackSnapshot> {
        if !self.is_music_playing().await {
            return None;
        }
        let track = self.player.playing_track()?;
        let position = self.player.position().await;
        let next = self
            .state
            .lock()
            .queue
            .get(0)
            .map(|queued| queued.track().clone());

        Some(PlaybackSnapshot {
            requester: track.user_data().and_then(RequestMetadata::owner),
            track,
            paused: self.player.is_paused(),
            volume: self.player.volume(),
            position,
            next,
            colour: self.services.chat.self_colour(self.guild_id),
        })
    }

    /// Mensaje de "reproduciendo ahora"; `None` si no suena nada
    pub async fn render_now_playing(&self) -> Option<NowPlayingMessage> {
        let snapshot = self.snapshot().await?;
        Some(self.now_playing.lock().render_playing(&snapshot))
    }

    pub fn render_idle(&self) -> NowPlayingMessage {
        let colour = self.services.chat.self_colour(self.guild_id);
        self.now_playing
            .lock()
            .render_idle(self.player.volume(), colour)
    }

    pub async fn render_topic_line(&self) -> String {
        let snapshot = self.snapshot().await;
        render_topic(snapshot.as_ref(), self.player.volume())
    }

    /// Si el último render cambió el mensaje
    pub fn now_playing_updated(&self) -> bool {
        self.now_playing.lock().updated()
    }
}

#[async_trait]
impl AudioEventListener for AudioHandler {
    async fn on_track_start(&self, track: AudioTrack) {
        self.state.lock().votes.clear();
        info!("▶️ Reproduciendo '{}' en guild {}", track.info().title, self.guild_id);
        self.services.chat.track_update(self.guild_id, Some(track)).await;
    }

    async fn on_track_end(&self, track: AudioTrack, reason: TrackEndReason) {
        let repeat_mode = self.services.settings.settings(self.guild_id).repeat_mode;
        debug!(
            "Track '{}' terminó ({:?}) en guild {}",
            track.info().title,
            reason,
            self.guild_id
        );

        // El reemplazo ya dejó otro track sonando
        if reason == TrackEndReason::Replaced {
            return;
        }

        // Fin tardío: ya empezó otro track después del stop
        if self
            .player
            .playing_track()
            .is_some_and(|current| !current.is_same(&track))
        {
            debug!("Fin tardío de '{}' ignorado", track.info().title);
            return;
        }

        let next = {
            let mut state = self.state.lock();
            if reason == TrackEndReason::Finished && repeat_mode != RepeatMode::Off {
                let metadata = track.user_data().cloned().unwrap_or_default();
                let again = QueuedTrack::new(track.make_clone(), metadata);
                match repeat_mode {
                    RepeatMode::All => {
                        state.queue.add(again);
                    }
                    RepeatMode::Single => state.queue.add_at(0, again),
                    RepeatMode::Off => {}
                }
            }
            state.queue.pull()
        };

        if let Some(next) = next {
            self.player.play_track(next.into_track()).await;
            return;
        }

        if !self.play_from_default().await {
            info!("📭 Cola vacía en guild {}", self.guild_id);
            self.services.chat.track_update(self.guild_id, None).await;
            if !self.services.stay_in_channel {
                self.services.chat.close_audio_connection(self.guild_id).await;
            }
            self.player.set_paused(false);
        }
    }
}

impl AudioSendHandler for AudioHandler {
    fn can_provide(&self) -> bool {
        let frame = self.player.provide();
        let available = frame.is_some();
        *self.last_frame.lock() = frame;
        available
    }

    fn provide_20ms_audio(&self) -> Option<Bytes> {
        self.last_frame.lock().take().map(|frame| frame.data)
    }

    fn is_opus(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            loader::MockTrackLoader,
            player::testing::FakePlayer,
            track::TrackInfo,
        },
        error::MusicError,
        playlist::Playlist,
        settings::GuildSettings,
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn test_guild() -> GuildId {
        GuildId::new(1)
    }

    fn track(title: &str) -> AudioTrack {
        AudioTrack::new(
            TrackInfo::new(title, format!("https://example.com/{}.mp3", title))
                .with_length(Duration::from_secs(120)),
        )
    }

    fn queued(title: &str, user: u64) -> QueuedTrack {
        QueuedTrack::new(track(title), RequestMetadata::from_user(UserId::new(user), "user"))
    }

    fn chat() -> MockChatClient {
        let mut chat = MockChatClient::new();
        chat.expect_in_voice_channel().returning(|_| true);
        chat.expect_self_colour().returning(|_| None);
        chat
    }

    struct Setup {
        settings: GuildSettings,
        playlists: Vec<Playlist>,
        loader: MockTrackLoader,
        chat: MockChatClient,
        stay: bool,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                settings: GuildSettings::default(),
                playlists: Vec::new(),
                loader: MockTrackLoader::new(),
                chat: chat(),
                stay: false,
            }
        }
    }

    impl Setup {
        fn build(self) -> (Arc<AudioHandler>, Arc<FakePlayer>, Arc<SettingsManager>) {
            let player = FakePlayer::new();
            let settings = Arc::new(SettingsManager::new(self.settings));
            let services = HandlerServices {
                settings: Arc::clone(&settings),
                playlists: Arc::new(PlaylistRegistry::new(self.playlists)),
                loader: Arc::new(self.loader),
                chat: Arc::new(self.chat),
                stay_in_channel: self.stay,
            };
            let handler = AudioHandler::new(test_guild(), player.clone(), services);
            (handler, player, settings)
        }
    }

    fn titles(handler: &AudioHandler) -> Vec<String> {
        handler
            .queue_snapshot()
            .iter()
            .map(|q| q.track().info().title.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_add_when_idle_plays_immediately() {
        let (handler, player, _) = Setup::default().build();

        assert_eq!(handler.add_track(queued("a", 1)).await, QueuePosition::NowPlaying);
        assert_eq!(player.played_titles(), vec!["a"]);
        assert_eq!(handler.queue_len(), 0);
        assert_eq!(handler.request_metadata().owner(), Some(UserId::new(1)));
    }

    #[tokio::test]
    async fn test_add_when_busy_queues() {
        let (handler, player, _) = Setup::default().build();
        handler.add_track(queued("a", 1)).await;

        assert_eq!(handler.add_track(queued("b", 1)).await, QueuePosition::Queued(0));
        assert_eq!(handler.add_track(queued("c", 1)).await, QueuePosition::Queued(1));
        // Otro usuario se intercala antes del segundo pedido del primero
        assert_eq!(handler.add_track(queued("d", 2)).await, QueuePosition::Queued(1));
        assert_eq!(
            handler.add_track_to_front(queued("e", 3)).await,
            QueuePosition::Queued(0)
        );

        assert_eq!(player.played_titles(), vec!["a"]);
        assert_eq!(titles(&handler), vec!["e", "b", "d", "c"]);
    }

    #[tokio::test]
    async fn test_repeat_modes_on_finish() {
        for (mode, expected_play, expected_queue) in [
            (RepeatMode::All, "b", vec!["a"]),
            (RepeatMode::Single, "a", vec!["b"]),
            (RepeatMode::Off, "b", vec![]),
        ] {
            let (handler, player, settings) = Setup::default().build();
            settings.set_repeat_mode(test_guild(), mode);
            handler.add_track(queued("a", 1)).await;
            handler.add_track(queued("b", 1)).await;

            let finished = player.finish_current().unwrap();
            handler.on_track_end(finished, TrackEndReason::Finished).await;

            assert_eq!(player.played_titles(), vec!["a", expected_play], "{:?}", mode);
            assert_eq!(titles(&handler), expected_queue, "{:?}", mode);
        }
    }

    #[tokio::test]
    async fn test_repeat_keeps_requester() {
        let (handler, player, settings) = Setup::default().build();
        settings.set_repeat_mode(test_guild(), RepeatMode::Single);
        handler.add_track(queued("a", 9)).await;

        let finished = player.finish_current().unwrap();
        handler.on_track_end(finished, TrackEndReason::Finished).await;

        assert_eq!(player.played_titles(), vec!["a", "a"]);
        assert_eq!(handler.request_metadata().owner(), Some(UserId::new(9)));
    }

    #[tokio::test]
    async fn test_stopped_track_is_never_repeated() {
        let (handler, player, settings) = Setup::default().build();
        settings.set_repeat_mode(test_guild(), RepeatMode::All);
        handler.add_track(queued("a", 1)).await;
        handler.add_track(queued("b", 1)).await;

        let stopped = player.finish_current().unwrap();
        handler.on_track_end(stopped, TrackEndReason::Stopped).await;

        assert_eq!(player.played_titles(), vec!["a", "b"]);
        assert!(handler.queue_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_replaced_track_does_not_advance_queue() {
        let (handler, player, _) = Setup::default().build();
        handler.add_track(queued("a", 1)).await;
        handler.add_track(queued("b", 1)).await;

        handler.on_track_end(track("old"), TrackEndReason::Replaced).await;

        assert_eq!(player.played_titles(), vec!["a"]);
        assert_eq!(titles(&handler), vec!["b"]);
    }

    #[tokio::test]
    async fn test_late_stop_event_keeps_new_track() {
        let mut chat = chat();
        chat.expect_track_update().never();
        chat.expect_close_audio_connection().never();
        let (handler, player, _) = Setup {
            chat,
            ..Setup::default()
        }
        .build();

        handler.add_track(queued("old", 1)).await;
        handler.add_track(queued("queued", 1)).await;
        let old = player.playing_track().unwrap();
        handler.skip_to(0).await;
        assert_eq!(handler.add_track(queued("x", 2)).await, QueuePosition::NowPlaying);

        handler.on_track_end(old, TrackEndReason::Stopped).await;

        assert_eq!(player.played_titles(), vec!["old", "x"]);
        assert_eq!(player.playing_track().unwrap().info().title, "x");
        assert_eq!(titles(&handler), vec!["queued"]);
    }

    #[tokio::test]
    async fn test_error_end_advances_once() {
        let (handler, player, _) = Setup::default().build();
        for title in ["a", "b", "c"] {
            handler.add_track(queued(title, 1)).await;
        }

        let failed = player.finish_current().unwrap();
        handler.on_track_end(failed.clone(), TrackEndReason::LoadFailed).await;
        // Un segundo aviso del mismo fin no salta al siguiente
        handler.on_track_end(failed, TrackEndReason::LoadFailed).await;

        assert_eq!(player.played_titles(), vec!["a", "b"]);
        assert_eq!(titles(&handler), vec!["c"]);
    }

    #[tokio::test]
    async fn test_empty_queue_disconnects_and_unpauses() {
        let mut chat = chat();
        chat.expect_track_update()
            .withf(|guild, track| *guild == test_guild() && track.is_none())
            .times(1)
            .returning(|_, _| ());
        chat.expect_close_audio_connection().times(1).returning(|_| ());
        let (handler, player, _) = Setup {
            chat,
            ..Setup::default()
        }
        .build();

        handler.add_track(queued("a", 1)).await;
        player.set_paused(true);
        let finished = player.finish_current().unwrap();
        handler.on_track_end(finished, TrackEndReason::Finished).await;

        assert!(!player.is_paused());
        assert_eq!(player.played_titles(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_stay_in_channel_keeps_connection() {
        let mut chat = chat();
        chat.expect_track_update().times(1).returning(|_, _| ());
        chat.expect_close_audio_connection().never();
        let (handler, player, _) = Setup {
            chat,
            stay: true,
            ..Setup::default()
        }
        .build();

        handler.add_track(queued("a", 1)).await;
        let finished = player.finish_current().unwrap();
        handler.on_track_end(finished, TrackEndReason::Finished).await;
    }

    #[tokio::test]
    async fn test_default_playlist_fallback() {
        let mut loader = MockTrackLoader::new();
        loader.expect_load_item().times(3).returning(|id| match id {
            "bad" => Err(MusicError::NoMatches(id.to_string())),
            other => Ok(vec![track(other)]),
        });
        let (handler, player, _) = Setup {
            settings: GuildSettings {
                default_playlist: Some("chill".to_string()),
                ..GuildSettings::default()
            },
            playlists: vec![Playlist::parse("Chill", "x, bad, z")],
            loader,
            ..Setup::default()
        }
        .build();

        assert!(handler.play_from_default().await);
        assert_eq!(player.played_titles(), vec!["x"]);
        assert_eq!(player.playing_track().unwrap().user_data(), None);

        // El resto sale de la cola secundaria sin volver a cargar
        let finished = player.finish_current().unwrap();
        handler.on_track_end(finished, TrackEndReason::Finished).await;
        assert_eq!(player.played_titles(), vec!["x", "z"]);
        assert_eq!(handler.request_metadata(), RequestMetadata::EMPTY);
    }

    #[tokio::test]
    async fn test_default_playlist_with_no_tracks_disconnects() {
        let mut loader = MockTrackLoader::new();
        loader
            .expect_load_item()
            .returning(|id| Err(MusicError::NoMatches(id.to_string())));
        let mut chat = chat();
        chat.expect_close_audio_connection().times(1).returning(|_| ());
        let (handler, player, _) = Setup {
            settings: GuildSettings {
                default_playlist: Some("chill".to_string()),
                ..GuildSettings::default()
            },
            playlists: vec![Playlist::parse("chill", "a,b")],
            loader,
            chat,
            ..Setup::default()
        }
        .build();

        assert!(handler.play_from_default().await);
        assert!(player.played_titles().is_empty());
    }

    #[tokio::test]
    async fn test_no_default_playlist_is_noop() {
        let (handler, _, settings) = Setup::default().build();
        assert!(!handler.play_from_default().await);

        // Nombre configurado pero sin playlist registrada
        settings.set_default_playlist(test_guild(), Some("missing".to_string()));
        assert!(!handler.play_from_default().await);
    }

    #[tokio::test]
    async fn test_stop_and_clear() {
        let (handler, player, _) = Setup::default().build();
        handler.add_track(queued("a", 1)).await;
        handler.add_track(queued("b", 1)).await;

        handler.stop_and_clear().await;

        assert_eq!(handler.queue_len(), 0);
        assert_eq!(*player.stops.lock(), 1);
        assert!(player.playing_track().is_none());
        assert_eq!(handler.status_emoji(), STOP_EMOJI);
    }

    #[tokio::test]
    async fn test_track_start_clears_votes_and_notifies() {
        let mut chat = chat();
        chat.expect_track_update()
            .withf(|_, track| track.as_ref().map(|t| t.info().title.as_str()) == Some("a"))
            .times(1)
            .returning(|_, _| ());
        let (handler, _, _) = Setup {
            chat,
            ..Setup::default()
        }
        .build();

        assert!(handler.add_vote(UserId::new(1)));
        assert!(!handler.add_vote(UserId::new(1)));
        assert!(handler.add_vote(UserId::new(2)));
        assert_eq!(handler.vote_count(), 2);

        handler.on_track_start(track("a")).await;
        assert_eq!(handler.vote_count(), 0);
    }

    #[tokio::test]
    async fn test_now_playing_render_and_cache() {
        let (handler, player, _) = Setup::default().build();
        assert!(handler.render_now_playing().await.is_none());

        handler.add_track(queued("a", 1)).await;
        handler.add_track(queued("b", 2)).await;
        player.set_paused(true);

        let first = handler.render_now_playing().await.unwrap();
        assert!(handler.now_playing_updated());
        let next = first.embed.fields.iter().find(|f| f.name == "Next").unwrap();
        assert_eq!(next.value, "[b](https://example.com/b.mp3)");

        *player.position.lock() = Duration::from_secs(30);
        let second = handler.render_now_playing().await.unwrap();
        assert!(!handler.now_playing_updated());
        assert_eq!(first, second);

        assert_eq!(handler.status_emoji(), PAUSE_EMOJI);
        assert!(handler.render_topic_line().await.starts_with("**a** [<@1>]"));
    }

    #[tokio::test]
    async fn test_nothing_rendered_outside_voice() {
        let mut chat = MockChatClient::new();
        chat.expect_in_voice_channel().returning(|_| false);
        chat.expect_self_colour().returning(|_| Some(0xff0000));
        let (handler, _, _) = Setup {
            chat,
            ..Setup::default()
        }
        .build();
        handler.add_track(queued("a", 1)).await;

        assert!(!handler.is_music_playing().await);
        assert!(handler.render_now_playing().await.is_none());
        assert!(handler.render_topic_line().await.starts_with("No music playing"));

        let idle = handler.render_idle();
        assert!(handler.now_playing_updated());
        assert_eq!(idle.embed.colour, Some(0xff0000));
    }

    #[tokio::test]
    async fn test_frame_bridge() {
        let (handler, player, _) = Setup::default().build();
        assert!(handler.is_opus());
        assert!(!handler.can_provide());
        assert_eq!(handler.provide_20ms_audio(), None);

        player.frames.lock().push_back(AudioFrame {
            data: Bytes::from_static(&[1, 2, 3]),
            timecode: Duration::from_millis(20),
        });
        assert!(handler.can_provide());
        assert_eq!(handler.provide_20ms_audio(), Some(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(handler.provide_20ms_audio(), None);
    }

    #[tokio::test]
    async fn test_reset_eq_reinstalls_factory() {
        let (handler, player, _) = Setup::default().build();
        handler.reset_eq();
        assert_eq!(*player.filter_resets.lock(), vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_queue_editing() {
        let (handler, player, _) = Setup::default().build();
        handler.add_track(queued("now", 1)).await;
        for (title, user) in [("a", 1), ("b", 2), ("c", 1), ("d", 2)] {
            handler.add_track(queued(title, user)).await;
        }
        assert_eq!(titles(&handler), vec!["a", "b", "c", "d"]);

        let moved = handler.move_track(3, 0).unwrap();
        assert_eq!(moved.track().info().title, "d");
        assert_eq!(titles(&handler), vec!["d", "a", "b", "c"]);

        assert_eq!(handler.remove_all_from(UserId::new(2)), 2);
        assert_eq!(titles(&handler), vec!["a", "c"]);
        assert_eq!(handler.shuffle_for(UserId::new(1)), 2);

        handler.skip_to(1).await;
        assert_eq!(handler.queue_len(), 1);
        assert_eq!(*player.stops.lock(), 1);

        assert!(handler.remove_from_queue(5).is_none());
        assert!(handler.remove_from_queue(0).is_some());
    }
}
