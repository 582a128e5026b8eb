//! Presentación en Discord: embeds, botones y formato de texto.

pub mod buttons;
pub mod embeds;
pub mod format;
