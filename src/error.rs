use thiserror::Error;

/// Errores del núcleo de reproducción
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("no se pudo cargar '{identifier}': {reason}")]
    Load { identifier: String, reason: String },

    #[error("no hay resultados para '{0}'")]
    NoMatches(String),

    #[error("banda de ecualizador fuera de rango: {0}")]
    InvalidBand(usize),

    #[error("preset de ecualizador desconocido: {0}")]
    UnknownPreset(String),

    #[error("modo de repetición desconocido: {0}")]
    UnknownRepeatMode(String),
}

pub type MusicResult<T> = Result<T, MusicError>;
