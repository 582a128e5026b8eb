use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

use crate::audio::{
    handler::{AudioHandler, HandlerServices},
    player::AudioPlayer,
};

/// Crea el reproductor de un servidor
pub type PlayerFactory = Box<dyn Fn(GuildId) -> Arc<dyn AudioPlayer> + Send + Sync>;

/// Un [`AudioHandler`] por servidor, creado al primer uso
pub struct PlayerManager {
    handlers: DashMap<GuildId, Arc<AudioHandler>>,
    services: HandlerServices,
    factory: PlayerFactory,
}

impl PlayerManager {
    pub fn new(services: HandlerServices, factory: PlayerFactory) -> Self {
        Self {
            handlers: DashMap::new(),
            services,
            factory,
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<AudioHandler> {
        self.handlers
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Creando reproductor para guild {}", guild_id);
                AudioHandler::new(guild_id, (self.factory)(guild_id), self.services.clone())
            })
            .value()
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<AudioHandler>> {
        self.handlers.get(&guild_id).map(|h| h.value().clone())
    }

    pub fn services(&self) -> &HandlerServices {
        &self.services
    }
}
