//! # Audio Module
//!
//! Playback coordination for the bot.
//!
//! ## Architecture
//!
//! ### [`handler`] - Playback coordinator
//! - One [`handler::AudioHandler`] per guild
//! - Fair queue first, then the guild's default playlist
//! - Repeat modes applied when a track finishes
//!
//! ### [`player`] - Player contract
//! - [`player::AudioPlayer`] is implemented by [`songbird_player::SongbirdPlayer`]
//! - Start and end events come back through [`player::AudioEventListener`]
//!
//! ### [`now_playing`] - Status message
//! - Cached render, rebuilt only when something visible changed
//!
//! ### [`equalizer`] - 15-band equalizer
//! - Gains shared live between the factory and every filter it built

pub mod equalizer;
pub mod fair_queue;
pub mod handler;
pub mod loader;
pub mod manager;
pub mod now_playing;
pub mod player;
pub mod songbird_player;
pub mod track;
