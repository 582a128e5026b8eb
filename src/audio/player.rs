use async_trait::async_trait;
use bytes::Bytes;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use crate::audio::{
    equalizer::EqualizerFactory,
    track::{AudioTrack, TrackEndReason},
};

/// Un frame de 20ms ya codificado en Opus
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub data: Bytes,
    pub timecode: Duration,
}

/// Contrato del reproductor externo.
///
/// El reproductor decodifica y mezcla; el coordinador solo decide qué suena.
/// Los eventos de inicio y fin se entregan al `AudioEventListener` registrado.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Track que está sonando, si hay alguno
    fn playing_track(&self) -> Option<AudioTrack>;

    /// Empieza a reproducir, reemplazando lo que sonara
    async fn play_track(&self, track: AudioTrack);

    async fn stop_track(&self);

    fn is_paused(&self) -> bool;

    fn set_paused(&self, paused: bool);

    /// Volumen en porcentaje (0..=150)
    fn volume(&self) -> u32;

    fn set_volume(&self, volume: u32);

    /// Posición de reproducción del track actual
    async fn position(&self) -> Duration;

    fn set_filter_factory(&self, factory: Option<Arc<EqualizerFactory>>);

    /// Extrae el siguiente frame disponible, si lo hay
    fn provide(&self) -> Option<AudioFrame>;

    fn add_listener(&self, listener: Weak<dyn AudioEventListener>);
}

/// Receptor de eventos del reproductor
#[async_trait]
pub trait AudioEventListener: Send + Sync {
    async fn on_track_start(&self, track: AudioTrack);

    async fn on_track_end(&self, track: AudioTrack, reason: TrackEndReason);
}

/// Lo que consume la capa de transporte de voz cada 20ms
pub trait AudioSendHandler: Send + Sync {
    fn can_provide(&self) -> bool;

    fn provide_20ms_audio(&self) -> Option<Bytes>;

    fn is_opus(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Reproductor en memoria para probar el coordinador

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct FakePlayer {
        pub current: Mutex<Option<AudioTrack>>,
        pub played: Mutex<Vec<String>>,
        pub stops: Mutex<usize>,
        pub paused: Mutex<bool>,
        pub volume: Mutex<u32>,
        pub position: Mutex<Duration>,
        pub frames: Mutex<VecDeque<AudioFrame>>,
        pub filter_resets: Mutex<Vec<bool>>,
    }

    impl FakePlayer {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                volume: Mutex::new(100),
                ..Default::default()
            })
        }

        pub fn played_titles(&self) -> Vec<String> {
            self.played.lock().clone()
        }

        /// Simula el fin natural del track actual
        pub fn finish_current(&self) -> Option<AudioTrack> {
            self.current.lock().take()
        }
    }

    #[async_trait]
    impl AudioPlayer for FakePlayer {
        fn playing_track(&self) -> Option<AudioTrack> {
            self.current.lock().clone()
        }

        async fn play_track(&self, track: AudioTrack) {
            self.played.lock().push(track.info().title.clone());
            *self.current.lock() = Some(track);
        }

        async fn stop_track(&self) {
            *self.stops.lock() += 1;
            *self.current.lock() = None;
        }

        fn is_paused(&self) -> bool {
            *self.paused.lock()
        }

        fn set_paused(&self, paused: bool) {
            *self.paused.lock() = paused;
        }

        fn volume(&self) -> u32 {
            *self.volume.lock()
        }

        fn set_volume(&self, volume: u32) {
            *self.volume.lock() = volume;
        }

        async fn position(&self) -> Duration {
            *self.position.lock()
        }

        fn set_filter_factory(&self, factory: Option<Arc<EqualizerFactory>>) {
            self.filter_resets.lock().push(factory.is_some());
        }

        fn provide(&self) -> Option<AudioFrame> {
            self.frames.lock().pop_front()
        }

        fn add_listener(&self, _listener: Weak<dyn AudioEventListener>) {}
    }
}
