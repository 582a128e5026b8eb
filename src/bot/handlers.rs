use anyhow::{Context as _, Result};
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{
        equalizer::EqualizerPreset,
        handler::{AudioHandler, ChatClient},
        now_playing::Control,
        track::{QueuedTrack, RequestMetadata},
    },
    bot::{nowplaying, FairPlayBot},
    settings::RepeatMode,
    ui::{buttons, embeds, format::volume_icon},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &FairPlayBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot, guild_id, false).await?,
        "playnext" => handle_play(ctx, &command, bot, guild_id, true).await?,
        "skip" => handle_skip(ctx, &command, bot, guild_id).await?,
        "skipto" => handle_skipto(ctx, &command, bot, guild_id).await?,
        "stop" => handle_stop(ctx, &command, bot, guild_id).await?,
        "pause" => handle_pause(ctx, &command, bot, guild_id, true).await?,
        "resume" => handle_pause(ctx, &command, bot, guild_id, false).await?,
        "volume" => handle_volume(ctx, &command, bot, guild_id).await?,
        "repeat" => handle_repeat(ctx, &command, bot, guild_id).await?,
        "nowplaying" => handle_nowplaying(ctx, &command, bot, guild_id).await?,
        "queue" => handle_queue(ctx, &command, bot, guild_id).await?,
        "remove" => handle_remove(ctx, &command, bot, guild_id).await?,
        "shuffle" => handle_shuffle(ctx, &command, bot, guild_id).await?,
        "move" => handle_move(ctx, &command, bot, guild_id).await?,
        "equalizer" => handle_equalizer(ctx, &command, bot, guild_id).await?,
        _ => reply_ephemeral(ctx, &command, "❌ Comando no reconocido").await?,
    }

    Ok(())
}

/// Maneja los botones del mensaje de "reproduciendo ahora"
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &FairPlayBot,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let Some(control) = Control::from_custom_id(&component.data.custom_id) else {
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("❌ Acción no reconocida")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    let handler = bot.players.get_or_create(guild_id);
    match control {
        Control::Pause => handler.player().set_paused(true),
        Control::Play => handler.player().set_paused(false),
        Control::Skip => {
            let note = if handler.player().playing_track().is_some() {
                vote_skip(ctx, bot, &handler, guild_id, component.user.id).await
            } else {
                "❌ No hay nada reproduciéndose".to_string()
            };
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content(note)
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
        Control::Stop => {
            handler.stop_and_clear().await;
            bot.chat.close_audio_connection(guild_id).await;
        }
    }

    let message = nowplaying::render(&handler).await;
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(handler.render_topic_line().await)
                    .embed(embeds::create_now_playing_embed(&message.embed))
                    .components(buttons::create_player_controls(&message.controls)),
            ),
        )
        .await?;

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
    to_front: bool,
) -> Result<()> {
    let query = option_str(command, "query")
        .context("Query no proporcionado")?
        .to_string();

    // Verificar que el usuario esté en un canal de voz
    let Some(voice_channel_id) = user_voice_channel(ctx, guild_id, command.user.id) else {
        return reply_ephemeral(ctx, command, "❌ Debes estar en un canal de voz").await;
    };

    // Defer la respuesta ya que puede tomar tiempo
    command.defer(&ctx.http).await?;

    let handler = bot.players.get_or_create(guild_id);
    bot.join_voice_channel(guild_id, voice_channel_id).await?;

    let track = match bot.loader.load_item(&query).await {
        Ok(tracks) => tracks.into_iter().next(),
        Err(e) => {
            warn!("⚠️ No se pudo cargar '{}': {}", query, e);
            None
        }
    };

    let Some(track) = track else {
        command
            .edit_response(
                &ctx.http,
                EditInteractionResponse::new().embed(embeds::create_error_embed(
                    "Sin resultados",
                    &format!("No se encontró nada para `{}`", query),
                )),
            )
            .await?;
        return Ok(());
    };

    let metadata = RequestMetadata::from_user(command.user.id, command.user.name.clone());
    let queued = QueuedTrack::new(track.clone(), metadata);
    let position = if to_front {
        handler.add_track_to_front(queued).await
    } else {
        handler.add_track(queued).await
    };

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().embed(embeds::create_track_added_embed(&track, position)),
        )
        .await?;

    Ok(())
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(handler) = playing_handler(bot, guild_id).await else {
        return reply_ephemeral(ctx, command, "❌ No hay nada reproduciéndose").await;
    };

    let message = vote_skip(ctx, bot, &handler, guild_id, command.user.id).await;
    reply(ctx, command, message).await
}

async fn handle_skipto(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(handler) = playing_handler(bot, guild_id).await else {
        return reply_ephemeral(ctx, command, "❌ No hay nada reproduciéndose").await;
    };

    let position = option_index(command, "position").context("Posición no proporcionada")?;
    if position >= handler.queue_len() {
        return reply_ephemeral(
            ctx,
            command,
            format!("❌ La cola solo tiene {} canciones", handler.queue_len()),
        )
        .await;
    }

    handler.skip_to(position).await;
    reply(ctx, command, format!("⏭️ Saltando a la posición {}", position + 1)).await
}

async fn handle_stop(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    if let Some(handler) = bot.players.get(guild_id) {
        handler.stop_and_clear().await;
    }
    bot.chat.close_audio_connection(guild_id).await;

    reply(ctx, command, "⏹️ Reproducción detenida y cola limpiada").await
}

async fn handle_pause(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
    pause: bool,
) -> Result<()> {
    let Some(handler) = playing_handler(bot, guild_id).await else {
        return reply_ephemeral(ctx, command, "❌ No hay nada reproduciéndose").await;
    };

    let player = handler.player();
    if player.is_paused() == pause {
        let message = if pause {
            "⚠️ La reproducción ya está en pausa"
        } else {
            "⚠️ La reproducción no está en pausa"
        };
        return reply_ephemeral(ctx, command, message).await;
    }

    player.set_paused(pause);
    let message = if pause {
        "⏸️ Reproducción pausada"
    } else {
        "▶️ Reproducción reanudada"
    };
    reply(ctx, command, message).await
}

async fn handle_volume(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);

    let Some(level) = option_int(command, "level") else {
        let current = handler.player().volume();
        return reply(
            ctx,
            command,
            format!("{} Volumen actual: {}%", volume_icon(current), current),
        )
        .await;
    };

    let level = level.clamp(0, 150) as u32;
    handler.player().set_volume(level);
    bot.settings.set_volume(guild_id, level);

    reply(
        ctx,
        command,
        format!("{} Volumen ajustado a {}%", volume_icon(level), level),
    )
    .await
}

async fn handle_repeat(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let mode: RepeatMode = match option_str(command, "mode").unwrap_or("off").parse() {
        Ok(mode) => mode,
        Err(e) => return reply_ephemeral(ctx, command, format!("❌ {}", e)).await,
    };

    bot.settings.set_repeat_mode(guild_id, mode);
    reply(
        ctx,
        command,
        format!("{} Repetición: **{}**", mode.emoji(), mode.user_friendly_name()),
    )
    .await
}

async fn handle_nowplaying(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);
    let message = nowplaying::render(&handler).await;

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(handler.render_topic_line().await)
                    .embed(embeds::create_now_playing_embed(&message.embed))
                    .components(buttons::create_player_controls(&message.controls)),
            ),
        )
        .await?;

    // El refresco periódico edita este mensaje
    let sent = command.get_response(&ctx.http).await?;
    bot.now_playing.track(guild_id, command.channel_id, sent.id);

    Ok(())
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);
    let page = option_int(command, "page").unwrap_or(1).max(1) as usize;
    let repeat = bot.settings.settings(guild_id).repeat_mode;

    let current = handler.player().playing_track();
    let embed = embeds::create_queue_embed(current.as_ref(), &handler.queue_snapshot(), repeat, page);
    reply_embed(ctx, command, embed, false).await
}

async fn handle_remove(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);
    let user = command.user.id;

    let Some(index) = option_index(command, "position") else {
        let removed = handler.remove_all_from(user);
        return reply(ctx, command, format!("🗑️ Quitadas {} canciones tuyas", removed)).await;
    };

    let owner = handler
        .queue_snapshot()
        .get(index)
        .map(|queued| queued.metadata().owner());
    match owner {
        None => reply_ephemeral(ctx, command, "❌ Posición inválida").await,
        Some(owner) if owner != Some(user) => {
            reply_ephemeral(ctx, command, "❌ Solo puedes quitar tus propias canciones").await
        }
        Some(_) => match handler.remove_from_queue(index) {
            Some(removed) => {
                let title = removed.track().info().title.clone();
                reply(ctx, command, format!("🗑️ Quitada **{}**", title)).await
            }
            None => reply_ephemeral(ctx, command, "❌ Posición inválida").await,
        },
    }
}

async fn handle_shuffle(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);
    let count = handler.shuffle_for(command.user.id);

    if count < 2 {
        return reply_ephemeral(ctx, command, "⚠️ Necesitas al menos 2 canciones en la cola").await;
    }
    reply(ctx, command, format!("🔀 Mezcladas {} canciones", count)).await
}

async fn handle_move(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);
    let from = option_index(command, "from").context("Posición de origen no proporcionada")?;
    let to = option_index(command, "to").context("Posición de destino no proporcionada")?;

    match handler.move_track(from, to) {
        Some(moved) => {
            reply(
                ctx,
                command,
                format!("↕️ **{}** movida a la posición {}", moved.track().info().title, to + 1),
            )
            .await
        }
        None => reply_ephemeral(ctx, command, "❌ Posición inválida").await,
    }
}

async fn handle_equalizer(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &FairPlayBot,
    guild_id: GuildId,
) -> Result<()> {
    let handler = bot.players.get_or_create(guild_id);

    let Some(mode) = option_str(command, "mode") else {
        let embed = embeds::create_equalizer_embed(&handler.equalizer().gains());
        return reply_embed(ctx, command, embed, false).await;
    };

    match EqualizerPreset::parse(mode) {
        Ok(preset) => {
            handler.equalizer().apply_preset(preset);
            handler.reset_eq();
            let embed = embeds::create_success_embed(
                "Ecualizador",
                &format!("Preset **{}** aplicado", preset.name()),
            );
            reply_embed(ctx, command, embed, false).await
        }
        Err(e) => {
            let embed = embeds::create_error_embed("Ecualizador", &e.to_string());
            reply_embed(ctx, command, embed, true).await
        }
    }
}

// Funciones auxiliares

/// Votos necesarios para saltar con `listeners` oyentes
pub fn required_votes(listeners: usize, ratio: f64) -> usize {
    ((listeners as f64 * ratio).ceil() as usize).max(1)
}

async fn vote_skip(
    ctx: &Context,
    bot: &FairPlayBot,
    handler: &AudioHandler,
    guild_id: GuildId,
    user: UserId,
) -> String {
    let title = handler
        .player()
        .playing_track()
        .map(|track| track.info().title.clone())
        .unwrap_or_default();

    // Quien pidió la canción la salta directamente
    if handler.request_metadata().owner() == Some(user) {
        handler.player().stop_track().await;
        return format!("⏭️ Saltada **{}**", title);
    }

    let listeners = match bot.chat.voice_channel(guild_id).await {
        Some(channel_id) => count_listeners(ctx, guild_id, channel_id),
        None => 0,
    };
    let already_voted = !handler.add_vote(user);
    let votes = handler.vote_count();
    let required = required_votes(listeners, bot.settings.settings(guild_id).skip_ratio);

    if votes >= required {
        handler.player().stop_track().await;
        return format!("⏭️ {}/{} votos, saltada **{}**", votes, required, title);
    }

    if already_voted {
        format!("⚠️ Ya votaste para saltar ({}/{})", votes, required)
    } else {
        format!("🗳️ Voto registrado ({}/{})", votes, required)
    }
}

/// Usuarios en el canal de voz que escuchan: sin bots ni ensordecidos
fn count_listeners(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> usize {
    let bot_id = ctx.cache.current_user().id;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return 0;
    };

    guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel_id))
        .filter(|state| state.user_id != bot_id && !state.deaf && !state.self_deaf)
        .filter(|state| {
            !guild
                .members
                .get(&state.user_id)
                .is_some_and(|member| member.user.bot)
        })
        .count()
}

async fn playing_handler(bot: &FairPlayBot, guild_id: GuildId) -> Option<Arc<AudioHandler>> {
    let handler = bot.players.get(guild_id)?;
    handler.is_music_playing().await.then_some(handler)
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn option_int(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

/// Posición 1-based del usuario convertida a índice
fn option_index(command: &CommandInteraction, name: &str) -> Option<usize> {
    option_int(command, name)
        .filter(|position| *position >= 1)
        .map(|position| (position - 1) as usize)
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: impl Into<String>) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(content)),
        )
        .await?;
    Ok(())
}

async fn reply_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    content: impl Into<String>,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn reply_embed(
    ctx: &Context,
    command: &CommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_votes() {
        assert_eq!(required_votes(4, 0.55), 3);
        assert_eq!(required_votes(1, 0.55), 1);
        assert_eq!(required_votes(10, 0.5), 5);
        // Sin oyentes contables basta un voto
        assert_eq!(required_votes(0, 0.55), 1);
    }
}
