use dashmap::DashMap;
use serenity::{
    all::{ChannelId, GuildId, Http, MessageId},
    builder::EditMessage,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    audio::{handler::AudioHandler, manager::PlayerManager, now_playing::NowPlayingMessage},
    ui::{buttons, embeds},
};

/// Mensajes de "reproduciendo ahora" que se mantienen actualizados
#[derive(Debug, Default)]
pub struct NowPlayingTracker {
    messages: DashMap<GuildId, (ChannelId, MessageId)>,
}

impl NowPlayingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra el mensaje; reemplaza al anterior del mismo servidor
    pub fn track(&self, guild_id: GuildId, channel_id: ChannelId, message_id: MessageId) {
        self.messages.insert(guild_id, (channel_id, message_id));
    }

    pub fn forget(&self, guild_id: GuildId) {
        self.messages.remove(&guild_id);
    }

    pub fn entries(&self) -> Vec<(GuildId, ChannelId, MessageId)> {
        self.messages
            .iter()
            .map(|entry| {
                let (channel_id, message_id) = *entry.value();
                (*entry.key(), channel_id, message_id)
            })
            .collect()
    }
}

/// Render actual del handler: reproduciendo o en reposo
pub async fn render(handler: &AudioHandler) -> NowPlayingMessage {
    match handler.render_now_playing().await {
        Some(message) => message,
        None => handler.render_idle(),
    }
}

/// Construye la edición completa del mensaje
pub async fn edit_for(handler: &AudioHandler, message: &NowPlayingMessage) -> EditMessage {
    EditMessage::new()
        .content(handler.render_topic_line().await)
        .embed(embeds::create_now_playing_embed(&message.embed))
        .components(buttons::create_player_controls(&message.controls))
}

/// Refresca periódicamente los mensajes registrados.
///
/// Solo se edita cuando el render cambió; si el mensaje ya no existe se
/// deja de seguir.
pub async fn refresh_loop(
    http: Arc<Http>,
    players: Arc<PlayerManager>,
    tracker: Arc<NowPlayingTracker>,
    every: Duration,
) {
    info!("🔄 Refresco de now playing cada {:?}", every);
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        for (guild_id, channel_id, message_id) in tracker.entries() {
            let Some(handler) = players.get(guild_id) else {
                tracker.forget(guild_id);
                continue;
            };

            let message = render(&handler).await;
            if !handler.now_playing_updated() {
                continue;
            }

            debug!("Actualizando now playing en guild {}", guild_id);
            let edit = edit_for(&handler, &message).await;
            if let Err(e) = channel_id.edit_message(&http, message_id, edit).await {
                warn!("⚠️ No se pudo editar now playing en guild {}: {:?}", guild_id, e);
                tracker.forget(guild_id);
            }
        }
    }
}
