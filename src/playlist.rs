use std::collections::HashMap;
use tracing::info;

/// Playlist con nombre: identificadores (URLs o búsquedas) en orden
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub name: String,
    pub items: Vec<String>,
}

impl Playlist {
    pub fn new(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Parsea una lista separada por comas, ignorando entradas vacías
    pub fn parse(name: impl Into<String>, raw: &str) -> Self {
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(name, items)
    }
}

/// Playlists conocidas, indexadas por nombre sin distinguir mayúsculas
#[derive(Debug, Default)]
pub struct PlaylistRegistry {
    playlists: HashMap<String, Playlist>,
}

impl PlaylistRegistry {
    pub fn new(playlists: impl IntoIterator<Item = Playlist>) -> Self {
        let playlists: HashMap<String, Playlist> = playlists
            .into_iter()
            .map(|p| (p.name.to_lowercase(), p))
            .collect();
        let registry = Self { playlists };
        info!("📋 Playlists registradas: {:?}", registry.names());
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.get(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.playlists.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_skips_blank_items() {
        let playlist = Playlist::parse("chill", " https://a.b/1 ,, lofi beats ,");
        assert_eq!(
            playlist.items,
            vec!["https://a.b/1".to_string(), "lofi beats".to_string()]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = PlaylistRegistry::new([
            Playlist::new("Chill", vec!["a".to_string()]),
            Playlist::new("rock", vec![]),
        ]);

        assert_eq!(registry.get("chill").map(|p| p.items.len()), Some(1));
        assert_eq!(registry.get("ROCK").map(|p| p.name.as_str()), Some("rock"));
        assert!(registry.get("jazz").is_none());
        assert_eq!(registry.names(), vec!["Chill", "rock"]);
    }
}
