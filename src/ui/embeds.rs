use serenity::{
    all::{Colour, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::{
    audio::{
        equalizer::BAND_COUNT,
        handler::QueuePosition,
        now_playing::NowPlayingEmbed,
        track::{AudioTrack, QueuedTrack},
    },
    settings::RepeatMode,
    ui::format::format_time,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 FairPlay";

const ITEMS_PER_PAGE: usize = 10;

/// Convierte el mensaje de "reproduciendo ahora" en un embed de Discord
pub fn create_now_playing_embed(message: &NowPlayingEmbed) -> CreateEmbed {
    let colour = message
        .colour
        .map(Colour::new)
        .unwrap_or(colors::MUSIC_PURPLE);

    let mut embed = CreateEmbed::default().color(colour);
    if let Some(image) = &message.image {
        embed = embed.image(image);
    }

    for field in &message.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    embed
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(track: &AudioTrack, position: QueuePosition) -> CreateEmbed {
    let info = track.info();
    let title = match position {
        QueuePosition::NowPlaying => "▶️ Reproduciendo".to_string(),
        QueuePosition::Queued(index) => format!("✅ Agregada en la posición {}", index + 1),
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(info.markdown_link())
        .color(colors::SUCCESS_GREEN)
        .field("⏱️ Duración", format_time(info.length), true);

    if let Some(author) = &info.author {
        embed = embed.field("🎤 Artista", author, true);
    }

    if let Some(thumbnail) = info.thumbnail() {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(
    current: Option<&AudioTrack>,
    queue: &[QueuedTrack],
    repeat: RepeatMode,
    page: usize,
) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if let Some(current) = current {
        embed = embed.field(
            format!("{} Reproduciendo", repeat.emoji()),
            current.info().markdown_link(),
            false,
        );
    }

    if queue.is_empty() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    let total_pages = queue.len().div_ceil(ITEMS_PER_PAGE);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * ITEMS_PER_PAGE;

    let description: String = queue
        .iter()
        .enumerate()
        .skip(start)
        .take(ITEMS_PER_PAGE)
        .map(|(i, queued)| {
            let info = queued.track().info();
            let requester = queued
                .metadata()
                .owner()
                .map(|user| format!(" • <@{}>", user))
                .unwrap_or_default();
            format!(
                "**{}**. `[{}]` {}{}\n",
                i + 1,
                format_time(info.length),
                info.markdown_link(),
                requester
            )
        })
        .collect();

    embed = embed.field("Próximas canciones", description, false);

    let total: std::time::Duration = queue
        .iter()
        .filter_map(|queued| queued.track().info().length)
        .sum();
    embed = embed.field(
        "Información",
        format!(
            "**Total:** {} canciones • **Duración:** {} • {} **{}**",
            queue.len(),
            format_time(Some(total)),
            repeat.emoji(),
            repeat.user_friendly_name()
        ),
        false,
    );

    embed.footer(CreateEmbedFooter::new(format!(
        "Página {} de {} • FairPlay",
        page, total_pages
    )))
}

/// Crea un embed con las ganancias del ecualizador
pub fn create_equalizer_embed(gains: &[f32; BAND_COUNT]) -> CreateEmbed {
    let bands: String = gains
        .iter()
        .enumerate()
        .map(|(band, gain)| format!("`{:>2}` {:+.2}\n", band, gain))
        .collect();

    CreateEmbed::default()
        .title("🎛️ Ecualizador")
        .description(bands)
        .color(colors::MUSIC_PURPLE)
        .footer(CreateEmbedFooter::new(
            "Presets: reset | normal | outside | bass",
        ))
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de éxito
pub fn create_success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}
