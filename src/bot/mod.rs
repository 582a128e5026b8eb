//! # Bot Module
//!
//! Discord front end for FairPlay.
//!
//! This module contains:
//! - Slash command registration and dispatch
//! - Voice connection management through Songbird
//! - Event handling (ready, interactions, voice state updates)
//! - The periodic now-playing refresher
//!
//! ## Architecture
//!
//! [`FairPlayBot`] implements Serenity's [`EventHandler`] trait. Playback
//! decisions live in the per-guild [`AudioHandler`](crate::audio::handler::AudioHandler)s
//! owned by the [`PlayerManager`]; the bot only translates Discord events
//! into handler calls.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use songbird::Songbird;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{error, info, warn};

pub mod chat;
pub mod commands;
pub mod handlers;
pub mod nowplaying;

use crate::{
    audio::{loader::TrackLoader, manager::PlayerManager},
    config::Config,
    settings::SettingsManager,
};
use chat::DiscordChatClient;
use nowplaying::NowPlayingTracker;

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (token, defaults, playlists)
/// - `players`: One audio handler per guild
/// - `settings`: Per-guild settings shared with the handlers
/// - `loader`: Resolves `/play` queries into tracks
/// - `chat`: Discord side of the handlers (activity, voice connection)
/// - `now_playing`: Messages kept up to date by the refresher
pub struct FairPlayBot {
    config: Arc<Config>,
    pub players: Arc<PlayerManager>,
    pub settings: Arc<SettingsManager>,
    pub loader: Arc<dyn TrackLoader>,
    pub chat: Arc<DiscordChatClient>,
    pub now_playing: Arc<NowPlayingTracker>,
    songbird: Arc<Songbird>,
    refresher_started: AtomicBool,
}

impl FairPlayBot {
    pub fn new(
        config: Config,
        players: Arc<PlayerManager>,
        chat: Arc<DiscordChatClient>,
        songbird: Arc<Songbird>,
    ) -> Self {
        let services = players.services();
        let settings = Arc::clone(&services.settings);
        let loader = Arc::clone(&services.loader);

        Self {
            config: Arc::new(config),
            players,
            settings,
            loader,
            chat,
            now_playing: Arc::new(NowPlayingTracker::new()),
            songbird,
            refresher_started: AtomicBool::new(false),
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands propagate almost immediately and are used when
    /// `GUILD_ID` is configured; otherwise commands are registered globally.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    /// Connects the bot to a voice channel.
    ///
    /// Joining the channel the bot is already in is a no-op for Songbird.
    ///
    /// # Required Permissions
    ///
    /// - `Connect` - To join the voice channel
    /// - `Speak` - To play audio in the channel
    pub async fn join_voice_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        match self.songbird.join(guild_id, channel_id).await {
            Ok(_) => {
                info!("🔊 Conectado al canal de voz en guild {}", guild_id);
                Ok(())
            }
            Err(e) => {
                error!("Error al obtener handler de voz: {:?}", e);
                Err(anyhow::anyhow!("Error al conectar al canal de voz"))
            }
        }
    }

    fn start_refresher(&self, ctx: &Context) {
        if self.refresher_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let http = Arc::clone(&ctx.http);
        let players = Arc::clone(&self.players);
        let tracker = Arc::clone(&self.now_playing);
        let every = Duration::from_secs(self.config.now_playing_refresh_secs);

        tokio::spawn(async move {
            nowplaying::refresh_loop(http, players, tracker, every).await;
        });
    }
}

#[async_trait]
impl EventHandler for FairPlayBot {
    /// Called after authentication. Attaches the chat client to the gateway,
    /// registers commands and starts the now-playing refresher once.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        self.chat.attach(&ctx);

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        self.start_refresher(&ctx);
    }

    /// Dispatches slash commands and now-playing button clicks.
    ///
    /// Errors are logged; Discord shows "This interaction failed" to the user.
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Stops playback when the bot is disconnected from voice by someone else.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };
        info!("🔌 Bot desconectado en guild {}", guild_id);

        if let Some(handler) = self.players.get(guild_id) {
            handler.stop_and_clear().await;
        }
    }
}
