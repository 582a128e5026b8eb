use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod playlist;
mod settings;
mod ui;

use crate::{
    audio::{
        handler::HandlerServices,
        loader::YtDlpLoader,
        manager::PlayerManager,
        songbird_player::player_factory,
    },
    bot::{chat::DiscordChatClient, FairPlayBot},
    config::Config,
    playlist::PlaylistRegistry,
    settings::SettingsManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fairplay=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando FairPlay v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Servicios compartidos por los handlers de audio
    let songbird = Songbird::serenity();
    let http_client = reqwest::Client::new();
    let chat = Arc::new(DiscordChatClient::new(Arc::clone(&songbird)));

    let services = HandlerServices {
        settings: Arc::new(SettingsManager::new(config.guild_defaults())),
        playlists: Arc::new(PlaylistRegistry::new(config.playlists.clone())),
        loader: Arc::new(YtDlpLoader::new(http_client.clone())),
        chat: chat.clone(),
        stay_in_channel: config.stay_in_channel,
    };
    let players = Arc::new(PlayerManager::new(
        services,
        player_factory(Arc::clone(&songbird), http_client),
    ));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Crear handler del bot
    let token = config.discord_token.clone();
    let handler = FairPlayBot::new(config, players, chat, Arc::clone(&songbird));

    // Construir cliente
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
