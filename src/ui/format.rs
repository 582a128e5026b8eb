use std::time::Duration;

pub const PLAY_EMOJI: &str = "\u{25B6}"; // ▶
pub const PAUSE_EMOJI: &str = "\u{23F8}"; // ⏸
pub const STOP_EMOJI: &str = "\u{23F9}"; // ⏹

const PROGRESS_LENGTH: usize = 12;

/// Formatea una duración como `[h:]mm:ss`; `None` es una transmisión en vivo
pub fn format_time(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "LIVE".to_string();
    };

    let total_seconds = (duration.as_millis() as f64 / 1000.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Barra de progreso de 12 segmentos con un marcador
pub fn progress_bar(progress: f64) -> String {
    let marker = (progress.clamp(0.0, 1.0) * PROGRESS_LENGTH as f64) as usize;

    (0..PROGRESS_LENGTH)
        .map(|i| if i == marker { "🔘" } else { "▬" })
        .collect()
}

pub fn volume_icon(volume: u32) -> &'static str {
    match volume {
        0 => "🔇",
        1..=29 => "🔈",
        30..=69 => "🔉",
        _ => "🔊",
    }
}
