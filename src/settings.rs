use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::str::FromStr;
use tracing::info;

use crate::error::MusicError;

/// Política de re-inserción al terminar un track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    Single,
}

impl RepeatMode {
    pub fn emoji(self) -> &'static str {
        match self {
            RepeatMode::Off => "➡️",
            RepeatMode::All => "🔁",
            RepeatMode::Single => "🔂",
        }
    }

    pub fn user_friendly_name(self) -> &'static str {
        match self {
            RepeatMode::Off => "Off",
            RepeatMode::All => "All",
            RepeatMode::Single => "Single",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "false" => Ok(RepeatMode::Off),
            "all" | "on" | "true" | "queue" => Ok(RepeatMode::All),
            "single" | "one" | "track" => Ok(RepeatMode::Single),
            other => Err(MusicError::UnknownRepeatMode(other.to_string())),
        }
    }
}

/// Configuración por servidor (solo en memoria)
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSettings {
    pub repeat_mode: RepeatMode,
    pub default_playlist: Option<String>,
    pub volume: u32,
    pub skip_ratio: f64,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            repeat_mode: RepeatMode::Off,
            default_playlist: None,
            volume: 100,
            skip_ratio: 0.55,
        }
    }
}

/// Registro de configuraciones por servidor
#[derive(Debug)]
pub struct SettingsManager {
    guilds: DashMap<GuildId, GuildSettings>,
    template: GuildSettings,
}

impl SettingsManager {
    /// `template` se usa para servidores que aún no tienen configuración
    pub fn new(template: GuildSettings) -> Self {
        Self {
            guilds: DashMap::new(),
            template,
        }
    }

    pub fn settings(&self, guild_id: GuildId) -> GuildSettings {
        self.guilds
            .get(&guild_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| self.template.clone())
    }

    /// Modifica la configuración y devuelve el resultado
    pub fn update<F>(&self, guild_id: GuildId, change: F) -> GuildSettings
    where
        F: FnOnce(&mut GuildSettings),
    {
        let mut entry = self
            .guilds
            .entry(guild_id)
            .or_insert_with(|| self.template.clone());
        change(entry.value_mut());
        info!("💾 Configuración actualizada para guild {}", guild_id);
        entry.value().clone()
    }

    pub fn set_repeat_mode(&self, guild_id: GuildId, mode: RepeatMode) {
        self.update(guild_id, |s| s.repeat_mode = mode);
    }

    pub fn set_volume(&self, guild_id: GuildId, volume: u32) {
        self.update(guild_id, |s| s.volume = volume.min(150));
    }

    pub fn set_default_playlist(&self, guild_id: GuildId, playlist: Option<String>) {
        self.update(guild_id, |s| s.default_playlist = playlist);
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new(GuildSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_guild_uses_template() {
        let template = GuildSettings {
            default_playlist: Some("chill".to_string()),
            ..GuildSettings::default()
        };
        let manager = SettingsManager::new(template.clone());

        assert_eq!(manager.settings(GuildId::new(1)), template);
    }

    #[test]
    fn test_updates_are_per_guild() {
        let manager = SettingsManager::default();
        manager.set_repeat_mode(GuildId::new(1), RepeatMode::Single);
        manager.set_volume(GuildId::new(1), 500);

        let first = manager.settings(GuildId::new(1));
        assert_eq!(first.repeat_mode, RepeatMode::Single);
        assert_eq!(first.volume, 150);
        assert_eq!(manager.settings(GuildId::new(2)).repeat_mode, RepeatMode::Off);
    }

    #[test]
    fn test_repeat_mode_parsing() {
        assert_eq!("ALL".parse::<RepeatMode>().unwrap(), RepeatMode::All);
        assert_eq!("single".parse::<RepeatMode>().unwrap(), RepeatMode::Single);
        assert_eq!("off".parse::<RepeatMode>().unwrap(), RepeatMode::Off);
        assert!("sometimes".parse::<RepeatMode>().is_err());
    }
}
