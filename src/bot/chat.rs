use async_trait::async_trait;
use parking_lot::RwLock;
use serenity::{
    all::{ActivityData, Cache, ChannelId, Context, GuildId, ShardMessenger, UserId},
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::audio::{handler::ChatClient, track::AudioTrack};

struct Gateway {
    cache: Arc<Cache>,
    shard: ShardMessenger,
}

/// [`ChatClient`] sobre serenity y songbird.
///
/// La caché y el shard solo existen una vez conectado; `attach` se llama
/// desde el evento `ready`.
pub struct DiscordChatClient {
    songbird: Arc<Songbird>,
    gateway: RwLock<Option<Gateway>>,
}

impl DiscordChatClient {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            gateway: RwLock::new(None),
        }
    }

    pub fn attach(&self, ctx: &Context) {
        *self.gateway.write() = Some(Gateway {
            cache: Arc::clone(&ctx.cache),
            shard: ctx.shard.clone(),
        });
    }

    /// Canal de voz en el que está el bot
    pub async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.songbird.get(guild_id)?;
        let channel = call.lock().await.current_channel()?;
        Some(ChannelId::from(channel.0))
    }
}

/// Color del rol más alto con color del miembro
pub fn member_colour(cache: &Cache, guild_id: GuildId, user_id: UserId) -> Option<u32> {
    let guild = cache.guild(guild_id)?;
    let member = guild.members.get(&user_id)?;

    member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .filter(|role| role.colour.0 != 0)
        .max_by_key(|role| role.position)
        .map(|role| role.colour.0)
}

#[async_trait]
impl ChatClient for DiscordChatClient {
    async fn in_voice_channel(&self, guild_id: GuildId) -> bool {
        self.voice_channel(guild_id).await.is_some()
    }

    fn self_colour(&self, guild_id: GuildId) -> Option<u32> {
        let gateway = self.gateway.read();
        let cache = &gateway.as_ref()?.cache;
        let self_id = cache.current_user().id;
        member_colour(cache, guild_id, self_id)
    }

    async fn close_audio_connection(&self, guild_id: GuildId) {
        match self.songbird.leave(guild_id).await {
            Ok(()) => info!("👋 Desconectado del canal de voz en guild {}", guild_id),
            Err(e) => error!("Error al salir del canal de voz: {:?}", e),
        }
    }

    async fn track_update(&self, guild_id: GuildId, track: Option<AudioTrack>) {
        let activity = track.map(|t| ActivityData::listening(t.info().title.clone()));
        debug!(
            "🎧 Actividad actualizada desde guild {}: {:?}",
            guild_id,
            activity.as_ref().map(|a| &a.name)
        );

        if let Some(gateway) = self.gateway.read().as_ref() {
            gateway.shard.set_activity(activity);
        }
    }
}
