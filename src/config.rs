use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::{playlist::Playlist, settings::GuildSettings};

const PLAYLIST_PREFIX: &str = "PLAYLIST_";

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: u32,
    pub stay_in_channel: bool,
    pub skip_ratio: f64,
    pub now_playing_refresh_secs: u64,

    // Playlists
    pub default_playlist: Option<String>,
    pub playlists: Vec<Playlist>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(std::env::vars())?;

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Construye la configuración a partir de pares clave/valor
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let mut playlists: Vec<Playlist> = vars
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(PLAYLIST_PREFIX)?;
                (!name.is_empty()).then(|| Playlist::parse(name.to_lowercase(), value))
            })
            .collect();
        playlists.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            // Discord
            discord_token: get("DISCORD_TOKEN")
                .context("DISCORD_TOKEN no está definido")?
                .to_string(),
            application_id: get("APPLICATION_ID")
                .context("APPLICATION_ID no está definido")?
                .parse()
                .context("APPLICATION_ID inválido")?,
            guild_id: get("GUILD_ID").and_then(|s| s.parse().ok()),

            // Audio
            default_volume: get("DEFAULT_VOLUME")
                .unwrap_or("100")
                .parse()
                .context("DEFAULT_VOLUME inválido")?,
            stay_in_channel: get("STAY_IN_CHANNEL")
                .unwrap_or("false")
                .parse()
                .context("STAY_IN_CHANNEL debe ser true o false")?,
            skip_ratio: get("SKIP_RATIO")
                .unwrap_or("0.55")
                .parse()
                .context("SKIP_RATIO inválido")?,
            now_playing_refresh_secs: get("NOW_PLAYING_REFRESH_SECS")
                .unwrap_or("5")
                .parse()
                .context("NOW_PLAYING_REFRESH_SECS inválido")?,

            // Playlists
            default_playlist: get("DEFAULT_PLAYLIST").map(str::to_string),
            playlists,
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// - Volume must be between 0 and 150
    /// - Skip ratio must be between 0.0 and 1.0
    /// - The refresh interval must be at least one second
    /// - The default playlist, when set, must be one of the configured ones
    pub fn validate(&self) -> Result<()> {
        if self.default_volume > 150 {
            anyhow::bail!("Default volume must be between 0 and 150, got: {}", self.default_volume);
        }

        if !(0.0..=1.0).contains(&self.skip_ratio) {
            anyhow::bail!("Skip ratio must be between 0.0 and 1.0, got: {}", self.skip_ratio);
        }

        if self.now_playing_refresh_secs == 0 {
            anyhow::bail!("Now playing refresh interval must be greater than 0");
        }

        if let Some(name) = &self.default_playlist {
            let known = self.playlists.iter().any(|p| p.name.eq_ignore_ascii_case(name));
            if !known {
                anyhow::bail!("Default playlist '{}' is not configured", name);
            }
        }

        Ok(())
    }

    /// Configuración inicial de cada servidor
    pub fn guild_defaults(&self) -> GuildSettings {
        GuildSettings {
            default_playlist: self.default_playlist.clone(),
            volume: self.default_volume,
            skip_ratio: self.skip_ratio,
            ..GuildSettings::default()
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol, skip ratio {:.2}, stay={}\n  \
            Now playing: refresh every {}s\n  \
            Playlists: {} (default: {})",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.default_volume,
            self.skip_ratio,
            self.stay_in_channel,
            self.now_playing_refresh_secs,
            self.playlists.len(),
            self.default_playlist.as_deref().unwrap_or("none"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const REQUIRED: [(&str, &str); 2] = [("DISCORD_TOKEN", "secret"), ("APPLICATION_ID", "1234")];

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&REQUIRED)).unwrap();

        assert_eq!(config.default_volume, 100);
        assert!(!config.stay_in_channel);
        assert_eq!(config.skip_ratio, 0.55);
        assert_eq!(config.now_playing_refresh_secs, 5);
        assert_eq!(config.guild_id, None);
        assert!(config.playlists.is_empty());
        assert!(config.validate().is_ok());
        assert!(!config.summary().contains("secret"));
    }

    #[test]
    fn test_playlists_from_prefixed_vars() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PLAYLIST_CHILL", "https://a.b/1, lofi"),
            ("PLAYLIST_ROCK", "https://a.b/2"),
            ("DEFAULT_PLAYLIST", "Chill"),
            ("STAY_IN_CHANNEL", "true"),
        ]);
        let config = Config::from_vars(vars(&pairs)).unwrap();

        let names: Vec<&str> = config.playlists.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["chill", "rock"]);
        assert_eq!(config.playlists[0].items.len(), 2);
        assert!(config.validate().is_ok());

        let defaults = config.guild_defaults();
        assert_eq!(defaults.default_playlist.as_deref(), Some("Chill"));
        assert!(config.stay_in_channel);
    }

    #[test]
    fn test_validation_errors() {
        assert!(Config::from_vars(vars(&[("APPLICATION_ID", "1")])).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_VOLUME", "200"));
        assert!(Config::from_vars(vars(&pairs)).unwrap().validate().is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SKIP_RATIO", "1.5"));
        assert!(Config::from_vars(vars(&pairs)).unwrap().validate().is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_PLAYLIST", "missing"));
        assert!(Config::from_vars(vars(&pairs)).unwrap().validate().is_err());
    }
}
